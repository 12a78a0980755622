use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::tags::TagSet;

/// Publishable unit produced by an upstream collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default)]
    pub families: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,

    // Frame range
    pub frame_start: i64,
    pub frame_end: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_end: Option<i64>,
    pub fps: f64,

    // Image format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_height: Option<u32>,
    #[serde(default = "default_pixel_aspect")]
    pub pixel_aspect: f64,

    #[serde(default)]
    pub representations: Vec<Representation>,
    #[serde(default)]
    pub audio: Vec<AudioInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lut_path: Option<String>,
    /// Timeline start used for audio offsets. Kept under its collector name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_start_ftrack: Option<i64>,

    #[serde(default = "default_true")]
    pub review: bool,
    #[serde(default)]
    pub multipart_exr: bool,
    /// Template fill data for output arguments.
    #[serde(default)]
    pub anatomy_data: BTreeMap<String, String>,
}

fn default_pixel_aspect() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Instance {
    /// Primary family: `family`, or the first of `families` when unset.
    pub fn main_family(&self) -> Option<&str> {
        match self.family.as_deref() {
            Some(family) if !family.is_empty() => Some(family),
            _ => self.families.first().map(String::as_str),
        }
    }

    /// `family` followed by `families`, without duplicates.
    pub fn all_families(&self) -> Vec<String> {
        let mut families: Vec<String> = Vec::new();
        if let Some(family) = self.family.as_deref().filter(|f| !f.is_empty()) {
            families.push(family.to_string());
        }
        for family in &self.families {
            if !families.contains(family) {
                families.push(family.clone());
            }
        }
        families
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// One file or an ordered list of files forming a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepresentationFiles {
    Single(String),
    Sequence(Vec<String>),
}

impl RepresentationFiles {
    pub fn is_sequence(&self) -> bool {
        matches!(self, RepresentationFiles::Sequence(_))
    }

    pub fn first(&self) -> Option<&str> {
        match self {
            RepresentationFiles::Single(file) => Some(file.as_str()),
            RepresentationFiles::Sequence(files) => files.first().map(String::as_str),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RepresentationFiles::Single(_) => 1,
            RepresentationFiles::Sequence(files) => files.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn paths_in(&self, staging_dir: &Path) -> Vec<PathBuf> {
        match self {
            RepresentationFiles::Single(file) => vec![staging_dir.join(file)],
            RepresentationFiles::Sequence(files) => {
                files.iter().map(|f| staging_dir.join(f)).collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Representation {
    pub name: String,
    pub ext: String,
    pub files: RepresentationFiles,
    pub staging_dir: PathBuf,
    #[serde(default)]
    pub tags: TagSet,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_end: Option<i64>,

    // Set on produced representations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_def: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg_cmd: Option<String>,
}

impl Representation {
    /// Extension without a leading dot.
    pub fn ext_clean(&self) -> &str {
        self.ext.trim_start_matches('.')
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioInput {
    pub filename: String,
    /// Frame at which the audio starts on the timeline.
    #[serde(default)]
    pub offset: i64,
}

/// Values that come from the publish session rather than the instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishContext {
    pub host_name: String,
    pub task_name: String,
    #[serde(default)]
    pub handle_start: i64,
    #[serde(default)]
    pub handle_end: i64,
}
