//! Presentation-agnostic views of the workflow's labels and results.

use shared::domain::{ExtractVariant, FileRole, OperationMode};

use crate::{
    preview::PreviewHandle,
    service::MatchReport,
    workflow::OperationResult,
};

pub fn input_label(mode: OperationMode, role: FileRole) -> &'static str {
    match (mode, role) {
        (OperationMode::Embed, FileRole::Host) => "Host image",
        (OperationMode::Embed, FileRole::Watermark) => "Watermark image",
        (OperationMode::Extract, FileRole::Host) => "Image to verify",
        (OperationMode::Extract, FileRole::Watermark) => "Original watermark",
    }
}

pub fn submit_label(mode: OperationMode, variant: ExtractVariant) -> &'static str {
    match (mode, variant) {
        (OperationMode::Embed, _) => "Embed watermark",
        (OperationMode::Extract, ExtractVariant::Match) => "Verify watermark",
        (OperationMode::Extract, ExtractVariant::SelfRecover) => "Recover watermark",
    }
}

pub fn format_ber(ber_percent: f64) -> String {
    format!("{ber_percent}%")
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerdictView {
    pub is_match: bool,
    pub headline: &'static str,
    pub ber_text: String,
    pub bits_text: String,
}

impl From<&MatchReport> for VerdictView {
    fn from(report: &MatchReport) -> Self {
        Self {
            is_match: report.is_match,
            headline: if report.is_match {
                "Watermark matches"
            } else {
                "Watermark does not match"
            },
            ber_text: format_ber(report.ber_percent),
            bits_text: format!("{} / {}", report.bit_errors, report.total_bits),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    Image {
        title: &'static str,
        preview: PreviewHandle,
        download_name: String,
    },
    Verdict(VerdictView),
    Failure {
        title: &'static str,
        message: String,
    },
}

impl ResultView {
    pub fn from_result(result: &OperationResult) -> Self {
        match result {
            OperationResult::Embed(image) | OperationResult::Recovered(image) => {
                let title = if matches!(result, OperationResult::Embed(_)) {
                    "Watermark embedded"
                } else {
                    "Watermark recovered"
                };
                Self::Image {
                    title,
                    preview: image.preview,
                    download_name: result.download_name().unwrap_or_default(),
                }
            }
            OperationResult::Extract(report) => Self::Verdict(report.into()),
            OperationResult::Error(err) => Self::Failure {
                title: err.code.summary(),
                message: err.message.clone(),
            },
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Image { title, .. } | Self::Failure { title, .. } => *title,
            Self::Verdict(_) => "Verification result",
        }
    }

    pub fn render_text(&self) -> String {
        match self {
            Self::Image {
                title,
                download_name,
                ..
            } => format!("{title}\nDownload as: {download_name}"),
            Self::Verdict(verdict) => format!(
                "{}\nBit Error Rate (BER): {}\nBit errors: {} bits",
                verdict.headline, verdict.ber_text, verdict.bits_text
            ),
            Self::Failure { title, message } => format!("{title}\n{message}"),
        }
    }
}

#[cfg(test)]
#[path = "tests/presenter_tests.rs"]
mod tests;
