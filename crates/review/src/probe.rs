use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Result, ReviewError};

// Public API types
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeStream {
    pub index: usize,
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Source of stream metadata for a media file.
pub trait StreamProbe {
    fn streams(&self, path: &Path) -> Result<Vec<ProbeStream>>;
}

/// Probe backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    pub ffprobe_path: PathBuf,
}

impl FfprobeProbe {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

// Internal FFprobe JSON structures
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    streams: Option<Vec<FfprobeStream>>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: usize,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

impl StreamProbe for FfprobeProbe {
    fn streams(&self, path: &Path) -> Result<Vec<ProbeStream>> {
        let probe_error = |message: String| ReviewError::Probe {
            path: path.to_path_buf(),
            message,
        };

        let output = Command::new(&self.ffprobe_path)
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg("-show_streams")
            .arg(path)
            .output()
            .map_err(|e| probe_error(format!("Failed to execute ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(probe_error(format!("ffprobe failed: {}", stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_ffprobe_output(&stdout).map_err(|e| probe_error(e.to_string()))
    }
}

/// Parse ffprobe `-show_streams` JSON into stream descriptions.
pub fn parse_ffprobe_output(json: &str) -> Result<Vec<ProbeStream>> {
    let output: FfprobeOutput = serde_json::from_str(json)?;

    Ok(output
        .streams
        .unwrap_or_default()
        .into_iter()
        .map(|stream| ProbeStream {
            index: stream.index,
            codec_type: stream.codec_type,
            codec_name: stream.codec_name,
            width: stream.width,
            height: stream.height,
        })
        .collect())
}

/// Resolution of the first stream reporting both width and height.
/// Audio streams may come first, so order alone is not enough.
pub fn first_resolution(streams: &[ProbeStream]) -> Option<(u32, u32)> {
    streams
        .iter()
        .find_map(|stream| match (stream.width, stream.height) {
            (Some(width), Some(height)) => Some((width, height)),
            _ => None,
        })
}
