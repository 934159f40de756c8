//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            // Validate before printing so a broken file is reported, not echoed.
            cfg.controller_config()?;
            let out = match global.output {
                crate::cli::OutputFormat::Json => serde_json::to_string_pretty(cfg)?,
                crate::cli::OutputFormat::JsonCompact => serde_json::to_string(cfg)?,
                _ => toml::to_string_pretty(cfg)?,
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }
        ConfigCommand::Path => {
            let path = config::config_path(global);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
    }
}
