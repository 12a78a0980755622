use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::overscan::OverscanCrop;
use crate::tags::{ReviewTag, TagSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub fill_missing_frames: bool,
    pub default_handle_start: i64,
    pub default_handle_end: i64,
    pub profiles: Vec<Profile>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            fill_missing_frames: true,
            default_handle_start: 0,
            default_handle_end: 0,
            profiles: Vec::new(),
        }
    }
}

/// Output definitions that apply to a host/task/family combination.
/// Every filter is a list of regexes; an empty list matches anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub hosts: Vec<String>,
    pub tasks: Vec<String>,
    pub families: Vec<String>,
    pub outputs: Vec<OutputDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputDefinition {
    /// Used as filename suffix and as the new representation name.
    pub name: String,
    pub ext: Option<String>,
    pub tags: TagSet,
    pub burnins: Vec<String>,
    pub ffmpeg_args: FfmpegArgs,
    pub filter: OutputFilter,
    pub overscan_crop: String,
    pub overscan_color: Option<Rgba>,
    pub width: u32,
    pub height: u32,
    pub scale_pixel_aspect: bool,
    pub bg_color: Option<Rgba>,
    pub letter_box: LetterBox,
}

impl Default for OutputDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            ext: None,
            tags: TagSet::new(),
            burnins: Vec::new(),
            ffmpeg_args: FfmpegArgs::default(),
            filter: OutputFilter::default(),
            overscan_crop: String::new(),
            overscan_color: None,
            width: 0,
            height: 0,
            scale_pixel_aspect: true,
            bg_color: None,
            letter_box: LetterBox::default(),
        }
    }
}

impl OutputDefinition {
    pub fn has_tag(&self, tag: &ReviewTag) -> bool {
        self.tags.contains(tag)
    }

    /// Explicit output size; both sides must be set.
    pub fn explicit_size(&self) -> Option<(u32, u32)> {
        if self.width > 0 && self.height > 0 {
            Some((self.width, self.height))
        } else {
            None
        }
    }
}

/// Raw arguments as written in settings. Each entry may hold several flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegArgs {
    pub input: Vec<String>,
    pub output: Vec<String>,
    pub video_filters: Vec<String>,
    pub audio_filters: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFilter {
    pub families: Vec<FamilyFilter>,
    pub product_names: Vec<String>,
    pub tags: Vec<String>,
    pub single_frame_filter: SingleFrameFilter,
}

/// A single family, or a list of families that must all be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FamilyFilter {
    Single(String),
    All(Vec<String>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingleFrameFilter {
    #[default]
    Everytime,
    SingleFrame,
    MultiFrame,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LetterBox {
    pub enabled: bool,
    pub ratio: f64,
    pub fill_color: Rgba,
    pub line_thickness: u32,
    pub line_color: Rgba,
}

impl Default for LetterBox {
    fn default() -> Self {
        Self {
            enabled: false,
            ratio: 0.0,
            fill_color: Rgba(0, 0, 0, 1.0),
            line_thickness: 0,
            line_color: Rgba(255, 0, 0, 1.0),
        }
    }
}

/// `[red, green, blue, alpha]` with 0-255 channels and alpha in 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba(pub u8, pub u8, pub u8, pub f64);

impl Rgba {
    /// `RRGGBB` without prefix.
    pub fn hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    pub fn alpha(&self) -> f64 {
        self.3
    }
}

pub fn load_config(path: Option<&std::path::Path>) -> Result<ReviewConfig> {
    let config = if let Some(config_path) = path {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

            toml::from_str::<ReviewConfig>(&contents)
                .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", config_path);
            ReviewConfig::default()
        }
    } else {
        tracing::info!("No config path provided, using defaults");
        ReviewConfig::default()
    };

    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &ReviewConfig) -> Result<()> {
    if config.ffmpeg_path.trim().is_empty() {
        anyhow::bail!("ffmpeg_path cannot be empty");
    }

    if config.ffprobe_path.trim().is_empty() {
        anyhow::bail!("ffprobe_path cannot be empty");
    }

    for (idx, profile) in config.profiles.iter().enumerate() {
        for pattern in profile
            .hosts
            .iter()
            .chain(&profile.tasks)
            .chain(&profile.families)
        {
            if let Err(e) = Regex::new(pattern) {
                anyhow::bail!("profiles[{}] has invalid filter \"{}\": {}", idx, pattern, e);
            }
        }

        for output in &profile.outputs {
            if output.name.trim().is_empty() {
                anyhow::bail!("profiles[{}] has an output definition without name", idx);
            }

            for pattern in &output.filter.product_names {
                if let Err(e) = Regex::new(pattern) {
                    anyhow::bail!(
                        "output \"{}\" has invalid product name filter \"{}\": {}",
                        output.name,
                        pattern,
                        e
                    );
                }
            }

            if output.letter_box.ratio < 0.0 {
                anyhow::bail!("output \"{}\" letter_box ratio must not be negative", output.name);
            }

            if let Err(e) = OverscanCrop::parse(&output.overscan_crop) {
                anyhow::bail!("output \"{}\": {}", output.name, e);
            }
        }
    }

    Ok(())
}
