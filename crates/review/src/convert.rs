// Pre-conversion of sources ffmpeg cannot read directly

use std::path::{Path, PathBuf};
use tempfile::{Builder as TempDirBuilder, TempDir};

use crate::error::Result;

pub const TRANSCODE_DIR_PREFIX: &str = "review_transcode_";

pub trait PreConverter {
    /// `Some(true)` when `path` must be converted first, `None` when it
    /// cannot be decided.
    fn needs_conversion(&self, path: &Path) -> Option<bool>;

    /// Converts `inputs` into `dest_dir` over the given frame range, keeping
    /// file names.
    fn convert(
        &self,
        inputs: &[PathBuf],
        dest_dir: &Path,
        frame_start: i64,
        frame_end: i64,
    ) -> Result<()>;
}

/// Every source is used as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreConversion;

impl PreConverter for NoPreConversion {
    fn needs_conversion(&self, _path: &Path) -> Option<bool> {
        Some(false)
    }

    fn convert(&self, _inputs: &[PathBuf], _dest_dir: &Path, _start: i64, _end: i64) -> Result<()> {
        Ok(())
    }
}

/// Creates the staging directory for converted sources. Auto-cleaned when dropped.
pub fn create_transcode_dir(base_dir: Option<&Path>) -> Result<TempDir> {
    let mut builder = TempDirBuilder::new();
    builder.prefix(TRANSCODE_DIR_PREFIX);

    let dir = match base_dir {
        Some(base) => {
            std::fs::create_dir_all(base)?;
            builder.tempdir_in(base)?
        }
        None => builder.tempdir()?,
    };
    Ok(dir)
}
