//! Outbound notifications. Fire-and-forget data the hosting layer may
//! render as toasts; the engine never depends on delivery.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
    Achievement,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub message: String,
    pub severity: Severity,
}

impl GameEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Info,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Success,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn achievement(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Achievement,
        }
    }
}
