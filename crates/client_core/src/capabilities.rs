//! Host-side effects the workflow decides on but does not perform itself.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Clears whatever input widgets the front end uses to pick files.
pub trait FileInputReset: Send {
    fn reset_file_inputs(&mut self);
}

pub struct NoopInputReset;

impl FileInputReset for NoopInputReset {
    fn reset_file_inputs(&mut self) {}
}

/// Persists a downloaded artifact. `Ok(None)` means the user declined to save.
pub trait SaveAs {
    fn save_as(&mut self, bytes: &[u8], filename: &str) -> io::Result<Option<PathBuf>>;
}

/// Writes artifacts into a fixed directory under their suggested name.
pub struct DirectorySaveAs {
    dir: PathBuf,
}

impl DirectorySaveAs {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SaveAs for DirectorySaveAs {
    fn save_as(&mut self, bytes: &[u8], filename: &str) -> io::Result<Option<PathBuf>> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        fs::write(&path, bytes)?;
        Ok(Some(path))
    }
}
