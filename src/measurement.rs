// src/measurement.rs
use serde::{Deserialize, Serialize};

/// Class that marks an element as a flag button.
pub const FLAG_BUTTON_CLASS: &str = "flag-btn";

/// Attribute holding the measurement id on a flag button.
pub const ID_ATTRIBUTE: &str = "data-id";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub success: bool,
    #[serde(default)]
    pub flagged: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ToggleResponse {
    /// New flag state reported by the server, if any.
    pub fn is_flagged(&self) -> Option<bool> {
        self.flagged.map(|f| f != 0)
    }
}

/// Path segments of the toggle endpoint for a measurement.
pub(crate) fn flag_path(id: &str) -> [&str; 4] {
    ["api", "measurements", id, "flag"]
}
