use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    #[default]
    Embed,
    Extract,
}

impl OperationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Embed => "embed",
            Self::Extract => "extract",
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which slot a selected file occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    Host,
    Watermark,
}

impl FileRole {
    pub const ALL: [FileRole; 2] = [FileRole::Host, FileRole::Watermark];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Watermark => "watermark",
        }
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two extract contracts the service exposes on the same endpoint.
///
/// `Match` compares the recovered bits against a supplied original and
/// answers with a BER report. `SelfRecover` needs only the host image and
/// answers with the recovered watermark as an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractVariant {
    #[default]
    Match,
    #[serde(rename = "self")]
    SelfRecover,
}

impl ExtractVariant {
    pub fn requires_original(self) -> bool {
        matches!(self, Self::Match)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::SelfRecover => "self",
        }
    }
}

impl fmt::Display for ExtractVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown extract variant '{}' (expected match or self)", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for ExtractVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "match" | "verify" => Ok(Self::Match),
            "self" | "recover" | "self_recover" => Ok(Self::SelfRecover),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}
