//! Score a hypothetical reading with the configured weights.

use chrono::Utc;

use moodcast_core::{MoodScorer, WeatherReading};

use crate::cli::{GlobalOpts, MoodArgs};
use crate::config::Config;
use crate::error::CliError;
use crate::output::{self, Painter};

pub fn handle(args: &MoodArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    if !(0.0..=100.0).contains(&args.clouds) {
        return Err(CliError::Validation {
            field: "clouds".into(),
            reason: "cloud cover is a percentage between 0 and 100".into(),
        });
    }

    let now = Utc::now();
    let reading = WeatherReading {
        city: "Hypothetical".into(),
        temperature: args.temperature,
        feels_like: None,
        pressure: args.pressure,
        humidity: 0.0,
        clouds: args.clouds,
        rain_1h: args.rain,
        wind_speed: args.wind,
        description: None,
        icon: None,
        sunrise: None,
        sunset: args.after_sunset.then(|| now.timestamp() - 1),
        timestamp: None,
        received_at: now,
    };

    let mood = MoodScorer::new(config.mood.clone()).score(&reading, now);
    let paint = Painter::new(global.color);
    let out = output::render_single(
        global.output,
        &mood,
        |m| output::mood_detail(m, paint),
        |m| format!("{}\t{}", m.score, m.band),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
