//! Revocable on-screen previews for selected files and result images.

use std::collections::HashMap;

use shared::domain::FileRole;
use tracing::debug;

use crate::types::SelectedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PreviewHandle(u64);

impl PreviewHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewSlot {
    Input(FileRole),
    Result,
}

/// Display backend that turns image bytes into something drawable.
///
/// Every handle passed to `publish` is later passed to `revoke` exactly once.
pub trait PreviewSurface {
    fn publish(&mut self, handle: PreviewHandle, slot: PreviewSlot, bytes: &[u8]);
    fn revoke(&mut self, handle: PreviewHandle);
}

/// Surface for headless front ends that never draw previews.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPreviewSurface;

impl PreviewSurface for NullPreviewSurface {
    fn publish(&mut self, _handle: PreviewHandle, _slot: PreviewSlot, _bytes: &[u8]) {}

    fn revoke(&mut self, _handle: PreviewHandle) {}
}

/// Owns at most one live preview per slot and releases superseded ones.
pub struct PreviewManager<S: PreviewSurface> {
    surface: S,
    next_id: u64,
    live: HashMap<PreviewSlot, PreviewHandle>,
}

impl<S: PreviewSurface> PreviewManager<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            next_id: 1,
            live: HashMap::new(),
        }
    }

    pub fn set_preview(&mut self, role: FileRole, file: &SelectedFile) -> PreviewHandle {
        self.replace(PreviewSlot::Input(role), &file.bytes)
    }

    pub fn set_result_preview(&mut self, bytes: &[u8]) -> PreviewHandle {
        self.replace(PreviewSlot::Result, bytes)
    }

    pub fn clear(&mut self, role: FileRole) {
        self.release(PreviewSlot::Input(role));
    }

    /// Releases both input previews.
    pub fn clear_all(&mut self) {
        for role in FileRole::ALL {
            self.clear(role);
        }
    }

    pub fn clear_result(&mut self) {
        self.release(PreviewSlot::Result);
    }

    pub fn handle(&self, slot: PreviewSlot) -> Option<PreviewHandle> {
        self.live.get(&slot).copied()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn replace(&mut self, slot: PreviewSlot, bytes: &[u8]) -> PreviewHandle {
        self.release(slot);
        let handle = PreviewHandle(self.next_id);
        self.next_id += 1;
        self.surface.publish(handle, slot, bytes);
        self.live.insert(slot, handle);
        debug!(handle = handle.0, ?slot, size = bytes.len(), "published preview");
        handle
    }

    fn release(&mut self, slot: PreviewSlot) {
        if let Some(handle) = self.live.remove(&slot) {
            self.surface.revoke(handle);
            debug!(handle = handle.0, ?slot, "revoked preview");
        }
    }
}

impl<S: PreviewSurface> Drop for PreviewManager<S> {
    fn drop(&mut self) {
        let handles: Vec<PreviewHandle> = self.live.drain().map(|(_, handle)| handle).collect();
        for handle in handles {
            self.surface.revoke(handle);
        }
    }
}

#[cfg(test)]
#[path = "tests/preview_tests.rs"]
mod tests;
