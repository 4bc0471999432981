//! # Teleop Executable Parameters
//!
//! This module provide parameters for the teleop executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeleopExecParams {
    /// Maximum time a cycle waits for a key in standard mode
    pub key_poll_timeout_ms: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TeleopExecParams {
    pub fn key_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.key_poll_timeout_ms)
    }
}

impl Default for TeleopExecParams {
    fn default() -> Self {
        Self {
            key_poll_timeout_ms: 100,
        }
    }
}
