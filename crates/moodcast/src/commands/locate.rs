//! Reverse-geocode a coordinate pair.

use moodcast_api::GeocodeClient;
use moodcast_core::{Coordinates, Resolution, resolve};

use crate::cli::{GlobalOpts, LocateArgs};
use crate::config::Config;
use crate::error::CliError;
use crate::output::{self, Painter};

pub async fn handle(args: &LocateArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let geocoder = GeocodeClient::new(config.geocoder_url()?, &config.transport())?;
    let coords = Coordinates {
        lat: args.lat,
        lon: args.lon,
    };

    let Resolution { location, notice } =
        resolve(&geocoder, Some(coords), &config.default_location()).await;

    let paint = Painter::new(global.color);
    let out = output::render_single(
        global.output,
        &location,
        |l| match &notice {
            Some(n) => format!("{l}\n{}", paint.warn(&n.to_string())),
            None => l.to_string(),
        },
        |l| l.name().to_owned(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
