//! Configuration types for thumbnail-dl

use serde::{Deserialize, Serialize};

/// Main configuration for [`ThumbnailDownloader`](crate::ThumbnailDownloader)
///
/// Works out of the box with zero configuration: every field has a sensible
/// default and may be omitted from serialized form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// User-Agent header sent with every thumbnail request
    /// (default: `thumbnail-dl/<crate version>`)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Buffer size of the event broadcast channel (default: 256)
    ///
    /// A subscriber that falls more than this many events behind receives a
    /// `RecvError::Lagged` from its broadcast receiver.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_user_agent() -> String {
    concat!("thumbnail-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_event_capacity() -> usize {
    256
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_user_agent_carries_crate_version() {
        let config = Config::default();
        assert!(config.user_agent.starts_with("thumbnail-dl/"));
        assert!(config.user_agent.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.user_agent, Config::default().user_agent);
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"user_agent": "gallery/2.1", "event_capacity": 8}"#).unwrap();
        assert_eq!(config.user_agent, "gallery/2.1");
        assert_eq!(config.event_capacity, 8);
    }
}
