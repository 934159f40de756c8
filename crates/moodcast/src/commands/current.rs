//! One-shot current conditions over REST.

use moodcast_api::{CurrentWeather, WeatherClient};

use crate::cli::{GlobalOpts, PlaceArgs};
use crate::config::Config;
use crate::error::CliError;
use crate::output::{self, Painter};

use super::Place;

fn or_na(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "N/A".into(), |v| format!("{v:.1}{unit}"))
}

fn detail(w: &CurrentWeather, paint: Painter) -> String {
    let c = &w.weather;
    let mut lines = vec![
        format!("{} {} ({:.4}, {:.4})", paint.label("City:"), w.city, w.lat, w.lon),
        format!("{} {}", paint.label("Temp:"), or_na(c.temp, "°C")),
        format!("{} {}", paint.label("Humidity:"), or_na(c.humidity, "%")),
        format!("{} {}", paint.label("Pressure:"), or_na(c.pressure, " hPa")),
        format!("{} {}", paint.label("Wind:"), or_na(c.wind_speed, " m/s")),
        format!("{} {}", paint.label("Clouds:"), or_na(c.clouds, "%")),
        format!("{} {}", paint.label("Rain:"), or_na(c.rain, " mm")),
    ];
    if let Some(score) = w.mood_score {
        lines.push(format!("{} {score:.0}", paint.label("Mood score:")));
    }
    if let Some(ts) = &w.timestamp {
        lines.push(paint.muted(&format!(
            "observed {ts} via {}",
            w.source.as_deref().unwrap_or("unknown source")
        )));
    }
    if let Some(q) = &w.quality {
        if !q.missing_fields.is_empty() {
            lines.push(paint.warn(&format!("missing: {}", q.missing_fields.join(", "))));
        }
        if let Some(err) = &q.error {
            lines.push(paint.warn(err));
        }
    }
    lines.join("\n")
}

pub async fn handle(args: &PlaceArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let coords = match args.place()? {
        Some(Place::City(city)) => city.coords,
        Some(Place::Coordinates(coords)) => coords,
        None => {
            return Err(CliError::Validation {
                field: "place".into(),
                reason: "pass --city or both --lat and --lon".into(),
            });
        }
    };

    let client = WeatherClient::new(config.api_url()?, &config.transport())?;
    let weather = client.current(coords.lat, coords.lon).await?;

    let paint = Painter::new(global.color);
    let out = output::render_single(
        global.output,
        &weather,
        |w| detail(w, paint),
        |w| w.city.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
