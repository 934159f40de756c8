// moodcast-api: Async transport clients for MoodCast (pub/sub feed + REST collaborators)

pub mod error;
pub mod geocode;
pub mod pubsub;
pub mod transport;
pub mod weather;

pub use error::Error;
pub use geocode::GeocodeClient;
pub use pubsub::{
    Backoff, ClientFrame, Connector, Link, ReconnectConfig, SessionEvent, SessionId,
    TransportEvent, WebSocketConnector,
};
pub use transport::{TlsMode, TransportConfig};
pub use weather::{Conditions, CurrentWeather, Quality, WeatherClient};
