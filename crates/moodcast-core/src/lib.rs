// moodcast-core: Synchronization and derivation controller between moodcast-api and consumers (CLI).

pub mod alerts;
pub mod catalog;
pub mod channels;
pub mod config;
pub mod controller;
pub mod error;
pub mod locate;
pub mod model;
pub mod mood;
pub mod snapshot;
pub mod state;

mod event;
mod publisher;
mod router;
mod timer;
mod watchdog;

// ── Primary re-exports ──────────────────────────────────────────────
pub use alerts::AlertBuffer;
pub use catalog::City;
pub use channels::{Channel, Topics};
pub use config::ControllerConfig;
pub use controller::Controller;
pub use error::{CoreError, Notice, NoticeKind};
pub use locate::{Resolution, ReverseGeocoder, resolve};
pub use mood::{MoodBand, MoodResult, MoodScorer, MoodWeights, forecast_comfort};
pub use publisher::Announcement;
pub use router::Routed;
pub use snapshot::{Snapshot, SnapshotStream, SnapshotWatchStream};
pub use state::{ConnEvent, ConnectionState};
pub use timer::{TimerId, TimerKind};

pub use model::{AlertMessage, Coordinates, ForecastPoint, Location, WeatherReading};

// Transport types consumers need to build a controller.
pub use moodcast_api::{Backoff, Connector, ReconnectConfig, WebSocketConnector};
