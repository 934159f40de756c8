// ── Inbound message router ──
//
// Classifies broker messages by topic, parses them into domain types and
// applies them to the typed feed state. A payload that fails to parse
// leaves every slice of state untouched and comes back as a notice.

use chrono::{DateTime, Utc};

use crate::alerts::AlertBuffer;
use crate::channels::{Channel, Topics};
use crate::error::Notice;
use crate::model::{AlertMessage, ForecastPoint, WeatherReading};
use crate::mood::{MoodResult, MoodScorer};

/// What a message did to the feed state.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// A new reading replaced the old one and the mood was recomputed.
    Reading,
    /// The forecast sequence was replaced.
    Forecast,
    /// An alert was appended.
    Alert,
    /// Not a channel we consume.
    Ignored,
    /// The payload did not parse; state is unchanged.
    Rejected(Notice),
}

/// Typed state derived from inbound messages.
#[derive(Debug)]
pub(crate) struct MessageRouter {
    topics: Topics,
    scorer: MoodScorer,
    reading: Option<WeatherReading>,
    mood: Option<MoodResult>,
    forecast: Vec<ForecastPoint>,
    alerts: AlertBuffer,
}

impl MessageRouter {
    pub(crate) fn new(topics: Topics, scorer: MoodScorer, alert_capacity: usize) -> Self {
        Self {
            topics,
            scorer,
            reading: None,
            mood: None,
            forecast: Vec::new(),
            alerts: AlertBuffer::new(alert_capacity),
        }
    }

    pub(crate) fn on_message(&mut self, topic: &str, payload: &str, now: DateTime<Utc>) -> Routed {
        let Some(channel) = self.topics.classify(topic) else {
            tracing::trace!(topic, "ignoring message on unknown topic");
            return Routed::Ignored;
        };

        let result = match channel {
            Channel::Weather => self.apply_reading(payload, now).map(|()| Routed::Reading),
            Channel::Forecast => self.apply_forecast(payload).map(|()| Routed::Forecast),
            Channel::Alerts => self.apply_alert(payload, now).map(|()| Routed::Alert),
            Channel::City => return Routed::Ignored,
        };

        result.unwrap_or_else(|e| {
            tracing::warn!(%channel, error = %e, "rejecting malformed payload");
            Routed::Rejected(Notice::ParseFailure {
                channel,
                reason: e.to_string(),
            })
        })
    }

    fn apply_reading(&mut self, payload: &str, now: DateTime<Utc>) -> serde_json::Result<()> {
        let mut reading: WeatherReading = serde_json::from_str(payload)?;
        reading.received_at = now;

        let mood = self.scorer.score(&reading, now);
        tracing::debug!(
            city = %reading.city,
            temperature = reading.temperature,
            score = mood.score,
            badge = %mood.badge,
            "reading accepted"
        );
        self.reading = Some(reading);
        self.mood = Some(mood);
        Ok(())
    }

    fn apply_forecast(&mut self, payload: &str) -> serde_json::Result<()> {
        let points: Vec<ForecastPoint> = serde_json::from_str(payload)?;
        tracing::debug!(points = points.len(), "forecast replaced");
        self.forecast = points;
        Ok(())
    }

    fn apply_alert(&mut self, payload: &str, now: DateTime<Utc>) -> serde_json::Result<()> {
        let mut alert: AlertMessage = serde_json::from_str(payload)?;
        if alert.timestamp.is_empty() {
            alert.timestamp = now.to_rfc3339();
        }
        tracing::info!(message = %alert.message, "weather alert");
        self.alerts.append(alert);
        Ok(())
    }

    pub(crate) fn reading(&self) -> Option<&WeatherReading> {
        self.reading.as_ref()
    }

    pub(crate) fn mood(&self) -> Option<&MoodResult> {
        self.mood.as_ref()
    }

    pub(crate) fn forecast(&self) -> &[ForecastPoint] {
        &self.forecast
    }

    pub(crate) fn alerts(&self) -> &AlertBuffer {
        &self.alerts
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mood::MoodBand;
    use pretty_assertions::assert_eq;

    const READING: &str = r#"{"city":"London","temperature":12.5,"pressure":995,
        "humidity":81,"clouds":85,"rain_1h":0.6,"wind_speed":12.0,"sunset":1}"#;

    fn router() -> MessageRouter {
        MessageRouter::new(Topics::default(), MoodScorer::default(), 3)
    }

    #[test]
    fn weather_replaces_reading_and_scores_mood() {
        let mut r = router();
        let now = Utc::now();
        assert_eq!(r.on_message("moodcast/weather", READING, now), Routed::Reading);

        let reading = r.reading().unwrap();
        assert_eq!(reading.city, "London");
        assert_eq!(reading.received_at, now);
        let mood = r.mood().unwrap();
        assert_eq!(mood.score, -65);
        assert_eq!(mood.band, MoodBand::ZenMaster);
    }

    #[test]
    fn malformed_weather_keeps_previous_state() {
        let mut r = router();
        let now = Utc::now();
        r.on_message("moodcast/weather", READING, now);
        let before = (r.reading().cloned(), r.mood().cloned());

        let routed = r.on_message("moodcast/weather", "{\"city\": ", now);
        assert!(matches!(
            routed,
            Routed::Rejected(Notice::ParseFailure {
                channel: Channel::Weather,
                ..
            })
        ));
        assert_eq!((r.reading().cloned(), r.mood().cloned()), before);
    }

    #[test]
    fn forecast_is_replaced_in_provider_order() {
        let mut r = router();
        let now = Utc::now();
        r.on_message(
            "moodcast/forecast",
            r#"[{"timestamp":3,"temperature":9,"pressure":1001,"clouds":90},
                {"timestamp":1,"temperature":11,"pressure":1003,"clouds":40}]"#,
            now,
        );
        r.on_message(
            "moodcast/forecast",
            r#"[{"timestamp":7,"temperature":15,"pressure":1012,"clouds":20,"icon":"01d"}]"#,
            now,
        );
        let stamps: Vec<i64> = r.forecast().iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![7]);

        // Not an array.
        assert!(matches!(
            r.on_message("moodcast/forecast", r#"{"timestamp":1}"#, now),
            Routed::Rejected(_)
        ));
        assert_eq!(r.forecast().len(), 1);
    }

    #[test]
    fn alerts_are_appended_and_stamped() {
        let mut r = router();
        let now = Utc::now();
        for i in 1..=4 {
            let payload = format!(r#"{{"message":"a{i}"}}"#);
            assert_eq!(r.on_message("moodcast/alerts", &payload, now), Routed::Alert);
        }
        let alerts = r.alerts().snapshot();
        let messages: Vec<&str> = alerts.iter().map(|a| a.message.as_str()).collect();
        assert_eq!(messages, vec!["a2", "a3", "a4"]);
        assert_eq!(alerts[0].timestamp, now.to_rfc3339());
    }

    #[test]
    fn unknown_and_outbound_topics_are_ignored() {
        let mut r = router();
        let now = Utc::now();
        assert_eq!(r.on_message("other/weather", READING, now), Routed::Ignored);
        assert_eq!(
            r.on_message("moodcast/city", r#"{"city":"Tokyo"}"#, now),
            Routed::Ignored
        );
        assert!(r.reading().is_none());
    }
}
