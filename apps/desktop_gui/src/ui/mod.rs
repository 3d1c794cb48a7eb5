//! UI layer for the desktop GUI: app shell, preview textures, and host capabilities.

pub mod app;
pub mod host;
pub mod textures;

pub use app::{StartupConfig, WatermarkApp};
