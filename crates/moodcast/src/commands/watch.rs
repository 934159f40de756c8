//! Follow the live feed until interrupted.

use std::sync::Arc;
use std::time::Duration;

use moodcast_api::GeocodeClient;
use moodcast_core::{Controller, Snapshot, WebSocketConnector};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::Config;
use crate::error::CliError;
use crate::output::{self, Painter};

use super::Place;

fn render(snapshot: &Snapshot, global: &GlobalOpts, paint: Painter) -> Result<String, CliError> {
    output::render_single(
        global.output,
        snapshot,
        |s| output::snapshot_detail(s, paint),
        |s| {
            let score = s
                .mood
                .as_ref()
                .map_or_else(|| "-".into(), |m| m.score.to_string());
            format!("{}\t{}\t{score}", s.location.name(), s.connection)
        },
    )
}

pub async fn handle(args: &WatchArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let controller_config = config.controller_config()?;
    let connector = WebSocketConnector::new(controller_config.broker_url()?);
    let controller = Controller::new(controller_config, Arc::new(connector))?;

    match args.place.place()? {
        Some(Place::City(city)) => controller.set_location(city.location()).await?,
        Some(Place::Coordinates(coords)) => {
            let geocoder = GeocodeClient::new(config.geocoder_url()?, &config.transport())?;
            let location = controller.resolve_location(&geocoder, Some(coords)).await?;
            tracing::info!(%location, "watching resolved location");
        }
        None => {}
    }

    controller.start().await?;
    let mut stream = controller.stream();
    let paint = Painter::new(global.color);
    let separator = matches!(global.output, OutputFormat::Table | OutputFormat::Json);

    output::print_output(&render(stream.current(), global, paint)?, global.quiet);

    let deadline = async {
        match args.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break Ok(());
            }
            () = &mut deadline => break Ok(()),
            changed = stream.changed() => {
                let Some(snapshot) = changed else {
                    break Err(CliError::Internal("controller has stopped".into()));
                };
                if separator && !global.quiet {
                    println!();
                }
                match render(&snapshot, global, paint) {
                    Ok(out) => output::print_output(&out, global.quiet),
                    Err(e) => break Err(e),
                }
            }
        }
    };

    controller.stop().await;
    result
}
