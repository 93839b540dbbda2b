//! PNG preview surface.

use std::path::{Path, PathBuf};

use antimirror_core::{Frame, MirrorError, PreviewSurface};

/// Writes every presented frame to a PNG file, replacing the previous one.
pub struct PngPreview {
    path: PathBuf,
}

impl PngPreview {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreviewSurface for PngPreview {
    /// Available while the target directory exists.
    fn is_available(&self) -> bool {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.is_dir(),
            _ => true,
        }
    }

    fn present(&mut self, frame: &Frame) -> Result<(), MirrorError> {
        if !self.is_available() {
            return Err(MirrorError::SurfaceUnavailable);
        }
        frame
            .clone()
            .into_image()
            .save_with_format(&self.path, image::ImageFormat::Png)?;
        Ok(())
    }
}
