use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use shared::domain::FileRole;

const FALLBACK_MIME: &str = "application/octet-stream";

/// A user-chosen file held in memory for the duration of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub role: FileRole,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn from_bytes(role: FileRole, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_guess::from_path(&file_name)
            .first_raw()
            .unwrap_or(FALLBACK_MIME)
            .to_string();
        Self {
            role,
            file_name,
            mime_type,
            bytes: bytes.into(),
        }
    }

    pub fn from_path(role: FileRole, path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read {} image '{}'", role, path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{role}.bin"));
        Ok(Self::from_bytes(role, file_name, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The two role-tagged selection slots.
#[derive(Debug, Clone, Default)]
pub struct FileSlots {
    host: Option<SelectedFile>,
    watermark: Option<SelectedFile>,
}

impl FileSlots {
    pub fn get(&self, role: FileRole) -> Option<&SelectedFile> {
        match role {
            FileRole::Host => self.host.as_ref(),
            FileRole::Watermark => self.watermark.as_ref(),
        }
    }

    /// Stores `file` in the slot named by its role, returning the file it replaced.
    pub fn set(&mut self, file: SelectedFile) -> Option<SelectedFile> {
        match file.role {
            FileRole::Host => self.host.replace(file),
            FileRole::Watermark => self.watermark.replace(file),
        }
    }

    pub fn take(&mut self, role: FileRole) -> Option<SelectedFile> {
        match role {
            FileRole::Host => self.host.take(),
            FileRole::Watermark => self.watermark.take(),
        }
    }

    pub fn clear(&mut self) {
        self.host = None;
        self.watermark = None;
    }

    pub fn is_empty(&self) -> bool {
        self.host.is_none() && self.watermark.is_none()
    }
}
