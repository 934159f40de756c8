//! Output formatting: table, JSON, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use moodcast_core::{ConnectionState, MoodBand, MoodResult, Snapshot, forecast_comfort};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Palette applied to human-readable output; a no-op when color is off.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn new(mode: ColorMode) -> Self {
        Self {
            enabled: should_color(mode),
        }
    }

    pub fn label(self, text: &str) -> String {
        if self.enabled {
            text.bold().to_string()
        } else {
            text.to_owned()
        }
    }

    pub fn muted(self, text: &str) -> String {
        if self.enabled {
            text.dimmed().to_string()
        } else {
            text.to_owned()
        }
    }

    pub fn warn(self, text: &str) -> String {
        if self.enabled {
            text.yellow().to_string()
        } else {
            text.to_owned()
        }
    }

    pub fn connection(self, state: ConnectionState) -> String {
        let text = state.to_string();
        if !self.enabled {
            return text;
        }
        match state {
            ConnectionState::Connected => text.green().to_string(),
            ConnectionState::Connecting => text.yellow().to_string(),
            ConnectionState::Failed => text.red().to_string(),
            ConnectionState::Disconnected => text.dimmed().to_string(),
        }
    }

    pub fn band(self, band: MoodBand) -> String {
        let text = band.to_string();
        if !self.enabled {
            return text;
        }
        match band {
            MoodBand::ZenMaster => text.magenta().to_string(),
            MoodBand::CozyReader => text.blue().to_string(),
            MoodBand::SunshineExplorer => text.yellow().to_string(),
            MoodBand::EnergyStar => text.bright_green().to_string(),
        }
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted string,
/// since single-item detail views don't use `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(rendered)
}

// ── Domain views ─────────────────────────────────────────────────────

fn or_na(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "N/A".into(), |v| format!("{v:.1}{unit}"))
}

/// Multi-line mood summary.
pub fn mood_detail(mood: &MoodResult, paint: Painter) -> String {
    format!(
        "{} {}  (score {})\n{}",
        mood.badge,
        paint.band(mood.band),
        mood.score,
        paint.muted(&mood.message)
    )
}

#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Temp")]
    temperature: String,
    #[tabled(rename = "Clouds")]
    clouds: String,
    #[tabled(rename = "Pressure")]
    pressure: String,
    #[tabled(rename = "Comfort")]
    comfort: String,
}

/// Human-readable view of a controller snapshot.
pub fn snapshot_detail(snapshot: &Snapshot, paint: Painter) -> String {
    let mut lines = vec![format!(
        "{} {}  {}",
        paint.label("Location:"),
        snapshot.location,
        paint.connection(snapshot.connection)
    )];
    if snapshot.reconnect_attempt > 0 {
        lines.push(paint.muted(&format!(
            "reconnect attempt {}",
            snapshot.reconnect_attempt
        )));
    }

    match &snapshot.reading {
        Some(r) => {
            lines.push(format!(
                "{} {}  {:.1}°C (feels {})  {}",
                paint.label("Weather:"),
                r.city,
                r.temperature,
                or_na(r.feels_like, "°C"),
                r.description.as_deref().unwrap_or("")
            ));
            lines.push(format!(
                "          pressure {:.0} hPa  humidity {:.0}%  clouds {:.0}%  rain {}  wind {}",
                r.pressure,
                r.humidity,
                r.clouds,
                or_na(r.rain_1h, " mm"),
                or_na(r.wind_speed, " m/s"),
            ));
        }
        None => lines.push(format!("{} waiting for data", paint.label("Weather:"))),
    }

    if let Some(mood) = &snapshot.mood {
        lines.push(format!("{} {}", paint.label("Mood:"), mood_detail(mood, paint)));
    }

    if !snapshot.forecast.is_empty() {
        let rows: Vec<ForecastRow> = snapshot
            .forecast
            .iter()
            .map(|p| ForecastRow {
                time: chrono::DateTime::from_timestamp(p.timestamp, 0)
                    .map_or_else(|| p.timestamp.to_string(), |t| t.format("%a %H:%M").to_string()),
                temperature: format!("{:.1}°C", p.temperature),
                clouds: format!("{:.0}%", p.clouds),
                pressure: format!("{:.0}", p.pressure),
                comfort: format!("{:.1}", forecast_comfort(p)),
            })
            .collect();
        lines.push(paint.label("Forecast:"));
        lines.push(render_table(&rows));
    }

    if !snapshot.alerts.is_empty() {
        lines.push(paint.label("Alerts:"));
        for alert in &snapshot.alerts {
            let severity = alert.severity.as_deref().unwrap_or("info");
            lines.push(format!(
                "  [{}] {} {}",
                paint.warn(severity),
                alert.message,
                paint.muted(&alert.timestamp)
            ));
        }
    }

    if let Some(notice) = &snapshot.notice {
        lines.push(format!("{} {}", paint.label("Notice:"), paint.warn(&notice.to_string())));
    }
    if snapshot.stale {
        lines.push(paint.warn("Data is stale"));
    }

    lines.join("\n")
}
