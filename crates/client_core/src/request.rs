//! Outbound payload construction from the current selections.

use shared::{
    domain::{ExtractVariant, FileRole, OperationMode},
    error::ErrorCode,
    protocol::{EMBED_PATH, EXTRACT_PATH, FIELD_IMAGE, FIELD_ORIGINAL_WATERMARK, FIELD_WATERMARK},
};
use thiserror::Error;

use crate::types::{FileSlots, SelectedFile};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{mode} requires a {role} image")]
    MissingInput { mode: OperationMode, role: FileRole },
}

impl ValidationError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::MissingInput
    }
}

/// What the service answers with for a given request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Image,
    MatchReport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationRequest {
    Embed {
        host: SelectedFile,
        watermark: SelectedFile,
    },
    VerifyMatch {
        host: SelectedFile,
        original_watermark: SelectedFile,
    },
    Recover {
        host: SelectedFile,
    },
}

const BOTH_ROLES: &[FileRole] = &[FileRole::Host, FileRole::Watermark];
const HOST_ONLY: &[FileRole] = &[FileRole::Host];

pub fn required_roles(mode: OperationMode, variant: ExtractVariant) -> &'static [FileRole] {
    match (mode, variant.requires_original()) {
        (OperationMode::Embed, _) | (OperationMode::Extract, true) => BOTH_ROLES,
        (OperationMode::Extract, false) => HOST_ONLY,
    }
}

impl OperationRequest {
    pub fn build(
        mode: OperationMode,
        variant: ExtractVariant,
        files: &FileSlots,
    ) -> Result<Self, ValidationError> {
        let require = |role: FileRole| {
            files
                .get(role)
                .cloned()
                .ok_or(ValidationError::MissingInput { mode, role })
        };

        let host = require(FileRole::Host)?;
        match mode {
            OperationMode::Embed => Ok(Self::Embed {
                host,
                watermark: require(FileRole::Watermark)?,
            }),
            OperationMode::Extract => match variant {
                ExtractVariant::Match => Ok(Self::VerifyMatch {
                    host,
                    original_watermark: require(FileRole::Watermark)?,
                }),
                ExtractVariant::SelfRecover => Ok(Self::Recover { host }),
            },
        }
    }

    pub fn mode(&self) -> OperationMode {
        match self {
            Self::Embed { .. } => OperationMode::Embed,
            Self::VerifyMatch { .. } | Self::Recover { .. } => OperationMode::Extract,
        }
    }

    pub fn endpoint_path(&self) -> &'static str {
        match self {
            Self::Embed { .. } => EMBED_PATH,
            Self::VerifyMatch { .. } | Self::Recover { .. } => EXTRACT_PATH,
        }
    }

    pub fn expected_response(&self) -> ResponseShape {
        match self {
            Self::VerifyMatch { .. } => ResponseShape::MatchReport,
            Self::Embed { .. } | Self::Recover { .. } => ResponseShape::Image,
        }
    }

    /// Multipart fields in wire order.
    pub fn parts(&self) -> Vec<(&'static str, &SelectedFile)> {
        match self {
            Self::Embed { host, watermark } => {
                vec![(FIELD_IMAGE, host), (FIELD_WATERMARK, watermark)]
            }
            Self::VerifyMatch {
                host,
                original_watermark,
            } => vec![
                (FIELD_IMAGE, host),
                (FIELD_ORIGINAL_WATERMARK, original_watermark),
            ],
            Self::Recover { host } => vec![(FIELD_IMAGE, host)],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Embed { .. } => "embed",
            Self::VerifyMatch { .. } => "verify_match",
            Self::Recover { .. } => "recover",
        }
    }
}

#[cfg(test)]
#[path = "tests/request_tests.rs"]
mod tests;
