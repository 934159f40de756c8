//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod cities;
pub mod config_cmd;
pub mod current;
pub mod locate;
pub mod mood;
pub mod watch;

use crate::cli::{Command, GlobalOpts, PlaceArgs};
use crate::config::Config;
use crate::error::CliError;

use moodcast_core::{Coordinates, catalog};

/// Dispatch a command to the appropriate handler.
pub async fn dispatch(cmd: Command, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(&args, config, global).await,
        Command::Cities => cities::handle(global),
        Command::Mood(args) => mood::handle(&args, config, global),
        Command::Locate(args) => locate::handle(&args, config, global).await,
        Command::Current(args) => current::handle(&args, config, global).await,
        Command::Config(args) => config_cmd::handle(&args, config, global),
        // Completions are handled before dispatch
        Command::Completions(_) => Ok(()),
    }
}

// ── Place selection ──────────────────────────────────────────────────

/// Where the user asked to look.
#[derive(Debug, Clone, Copy)]
pub enum Place {
    City(&'static catalog::City),
    Coordinates(Coordinates),
}

impl PlaceArgs {
    /// `Ok(None)` when neither a city nor coordinates were given.
    pub fn place(&self) -> Result<Option<Place>, CliError> {
        if let Some(name) = &self.city {
            let city = catalog::find(name).ok_or_else(|| CliError::NotFound {
                resource_type: "City".into(),
                identifier: name.clone(),
                list_command: "cities".into(),
            })?;
            return Ok(Some(Place::City(city)));
        }
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok(Some(Place::Coordinates(Coordinates { lat, lon }))),
            _ => Ok(None),
        }
    }
}
