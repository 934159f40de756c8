// ── Domain model ──
//
// Canonical representations of everything the feed carries. Consumers
// (CLI, tests) depend on these rather than on wire shapes.

pub mod alert;
pub mod location;
pub mod weather;

pub use alert::AlertMessage;
pub use location::{Coordinates, Location};
pub use weather::{ForecastPoint, WeatherReading};
