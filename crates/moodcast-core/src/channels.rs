// ── Logical pub/sub channels ──
//
// Maps the four logical channels onto broker topic strings
// (`{prefix}/{channel}`) and back.

use strum::{Display, EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
    /// Outbound location announcements.
    City,
    Weather,
    Forecast,
    Alerts,
}

impl Channel {
    /// Channels the controller subscribes to.
    pub const INBOUND: [Channel; 3] = [Channel::Weather, Channel::Forecast, Channel::Alerts];
}

/// Topic names for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
}

impl Topics {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into().trim_end_matches('/').to_owned();
        Self { prefix }
    }

    pub fn topic(&self, channel: Channel) -> String {
        if self.prefix.is_empty() {
            channel.to_string()
        } else {
            format!("{}/{channel}", self.prefix)
        }
    }

    /// Which channel a broker topic belongs to, if any.
    pub fn classify(&self, topic: &str) -> Option<Channel> {
        Channel::iter().find(|ch| self.topic(*ch) == topic)
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::new("moodcast")
    }
}
