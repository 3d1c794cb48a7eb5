//! Wire contract of the remote watermarking service.

use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5000";

pub const EMBED_PATH: &str = "/embed";
pub const EXTRACT_PATH: &str = "/extract";

pub const FIELD_IMAGE: &str = "image";
pub const FIELD_WATERMARK: &str = "watermark";
pub const FIELD_ORIGINAL_WATERMARK: &str = "original_watermark";

/// Body of a successful match-variant extract call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReportResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub is_match: bool,
    /// Bit error rate in percent.
    pub ber: f64,
    pub bit_errors: u64,
    pub total_bits: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MatchReportResponse {
    /// Returns why the report cannot be trusted, if it is inconsistent.
    pub fn inconsistency(&self) -> Option<String> {
        if self.total_bits == 0 {
            return Some("report has zero total bits".to_string());
        }
        if self.bit_errors > self.total_bits {
            return Some(format!(
                "report has more bit errors ({}) than total bits ({})",
                self.bit_errors, self.total_bits
            ));
        }
        if !self.ber.is_finite() || self.ber < 0.0 {
            return Some(format!("report has invalid bit error rate {}", self.ber));
        }
        None
    }
}

/// Error body the service attaches to non-success statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    pub error: String,
}
