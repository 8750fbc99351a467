//! Agent health reporting types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message the agent sends while everything works
pub const HEALTHY_MESSAGE: &str = "All good";

/// Payload of a status report sent to Codefresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub message: String,
}

impl AgentStatus {
    pub fn healthy() -> Self {
        Self {
            message: HEALTHY_MESSAGE.to_string(),
        }
    }
}

/// Last known status of the agent, replaced on every reporting cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub message: String,
    pub time: Option<DateTime<Utc>>,
}

impl Status {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            time: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_status_serializes_message_only() {
        let body = serde_json::to_string(&AgentStatus::healthy()).unwrap();
        assert_eq!(body, r#"{"message":"All good"}"#);
    }

    #[test]
    fn default_status_has_no_time() {
        let status = Status::default();
        assert!(status.message.is_empty());
        assert!(status.time.is_none());
        assert!(Status::now("x").time.is_some());
    }
}
