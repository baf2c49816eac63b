use chrono::Local;
use nearport_core::{NearestAirport, ResolutionState, WeatherSnapshot};

/// Text for one state; empty when there is nothing to show.
pub fn render(state: &ResolutionState) -> String {
    match state {
        ResolutionState::Idle => String::new(),
        ResolutionState::Locating => "Locating you...".to_string(),
        ResolutionState::Fetching => "Loading weather and airports...".to_string(),
        ResolutionState::ManualCityRequired { reason, validation_error } => match validation_error {
            Some(problem) => format!("{reason}\n{problem}"),
            None => reason.clone(),
        },
        ResolutionState::Ready { weather, airport, resolved_at } => {
            let at = resolved_at.with_timezone(&Local).format("%H:%M:%S");
            format!(
                "{}\n\n{}\n\nUpdated at {at}",
                render_weather(weather),
                render_airport(airport)
            )
        }
        ResolutionState::Failed { error } => format!("Error: {error}"),
    }
}

fn render_weather(w: &WeatherSnapshot) -> String {
    let rows = [
        ("Temperature", format!("{} °C", w.temp)),
        ("Feels Like", format!("{} °C", w.feels_like)),
        ("Humidity", format!("{} %", w.humidity)),
        ("Wind Speed", format!("{} m/s", w.wind_speed)),
        ("Wind Direction", format!("{}°", w.wind_degrees)),
        ("Cloud Coverage", format!("{} %", w.cloud_pct)),
        ("Max Temp", format!("{} °C", w.max_temp)),
        ("Min Temp", format!("{} °C", w.min_temp)),
    ];

    let mut out = String::from("Current Weather");
    for (label, value) in rows {
        out.push_str(&format!("\n  {label:<16}{value}"));
    }
    out
}

fn render_airport(airport: &NearestAirport) -> String {
    let a = airport.airport();
    let place = [a.city.as_str(), a.country.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = format!("Nearest Airport\n  {}", a.label());
    if !place.is_empty() {
        out.push_str(&format!("\n  {place}"));
    }
    if let Some(km) = airport.distance_km() {
        out.push_str(&format!("\n  {km:.1} km away"));
    }
    out
}
