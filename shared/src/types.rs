//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Non-fatal problem attached to an otherwise successful response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Warning {
    pub code: String,
    pub message: String,
}

impl Warning {
    /// A downstream system could not be notified after commit
    pub fn external_sync(system: &str, message: impl Into<String>) -> Self {
        Self {
            code: format!("{}_SYNC_FAILED", system.to_ascii_uppercase()),
            message: message.into(),
        }
    }
}

/// Export format for reports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}
