//! Built-in city catalog listing.

use tabled::Tabled;

use moodcast_core::catalog::{CITIES, City};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct CityRow {
    #[tabled(rename = "City")]
    name: &'static str,
    #[tabled(rename = "Lat")]
    lat: String,
    #[tabled(rename = "Lon")]
    lon: String,
}

impl From<&City> for CityRow {
    fn from(c: &City) -> Self {
        Self {
            name: c.name,
            lat: format!("{:.4}", c.coords.lat),
            lon: format!("{:.4}", c.coords.lon),
        }
    }
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_list(
        global.output,
        &CITIES,
        |c| CityRow::from(c),
        |c| c.name.to_owned(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
