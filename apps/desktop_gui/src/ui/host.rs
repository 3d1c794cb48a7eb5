//! GUI implementations of the workflow's host capabilities.

use std::{
    fs, io,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use client_core::{FileInputReset, SaveAs};
use shared::domain::FileRole;

/// Path text typed or picked for each role, shared with the workflow so a
/// reset also clears what the user sees in the input boxes.
#[derive(Clone, Default)]
pub struct PathInputs(Arc<Mutex<[String; 2]>>);

impl PathInputs {
    fn lock(&self) -> MutexGuard<'_, [String; 2]> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn index(role: FileRole) -> usize {
        match role {
            FileRole::Host => 0,
            FileRole::Watermark => 1,
        }
    }

    pub fn get(&self, role: FileRole) -> String {
        self.lock()[Self::index(role)].clone()
    }

    pub fn set(&self, role: FileRole, value: String) {
        self.lock()[Self::index(role)] = value;
    }
}

impl FileInputReset for PathInputs {
    fn reset_file_inputs(&mut self) {
        let mut inputs = self.lock();
        for input in inputs.iter_mut() {
            input.clear();
        }
    }
}

/// Save-as backed by the native file dialog.
pub struct DialogSaveAs {
    pub start_dir: Option<PathBuf>,
}

impl SaveAs for DialogSaveAs {
    fn save_as(&mut self, bytes: &[u8], filename: &str) -> io::Result<Option<PathBuf>> {
        let mut dialog = rfd::FileDialog::new().set_file_name(filename);
        if let Some(dir) = &self.start_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else {
            return Ok(None);
        };
        fs::write(&path, bytes)?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_both_inputs_across_clones() {
        let inputs = PathInputs::default();
        inputs.set(FileRole::Host, "/tmp/host.png".into());
        inputs.set(FileRole::Watermark, "/tmp/mark.png".into());

        let mut handle = inputs.clone();
        handle.reset_file_inputs();

        assert!(inputs.get(FileRole::Host).is_empty());
        assert!(inputs.get(FileRole::Watermark).is_empty());
    }
}
