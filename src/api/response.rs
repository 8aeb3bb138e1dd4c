//! API response types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response envelope wrapping every API result
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

/// API error
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
}

/// Per-attribute detail of an API error
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ApiError {
    /// Message with any attribute details appended
    pub fn describe(&self) -> String {
        let mut msg = if self.code.is_empty() {
            self.message.clone()
        } else {
            format!("{} ({})", self.message, self.code)
        };

        if !self.details.is_empty() {
            let details: Vec<String> = self
                .details
                .iter()
                .map(|d| format!("{}: {}", d.name, d.description))
                .collect();
            msg.push_str(&format!(": {}", details.join(", ")));
        }

        msg
    }
}
