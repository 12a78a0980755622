// Frame sequence collections and gap filling

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::error::{ReviewError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub head: String,
    pub tail: String,
    /// Digit count of zero padded frames, 0 when frames are not padded.
    pub padding: usize,
    pub indexes: BTreeSet<i64>,
}

impl Collection {
    /// `head%0Nd tail` pattern usable by ffmpeg.
    pub fn pattern(&self) -> String {
        format!("{}{}{}", self.head, padding_token(self.padding), self.tail)
    }

    pub fn file_name(&self, frame: i64) -> String {
        format!(
            "{}{:0width$}{}",
            self.head,
            frame,
            self.tail,
            width = self.padding
        )
    }

    pub fn first(&self) -> Option<i64> {
        self.indexes.iter().next().copied()
    }

    pub fn last(&self) -> Option<i64> {
        self.indexes.iter().next_back().copied()
    }

    /// Frames of `[start, end]` with no file in the collection.
    pub fn holes_in(&self, start: i64, end: i64) -> Vec<i64> {
        (start..=end)
            .filter(|frame| !self.indexes.contains(frame))
            .collect()
    }
}

/// printf style frame token for a padding width.
pub fn padding_token(padding: usize) -> String {
    if padding == 0 {
        "%d".to_string()
    } else {
        format!("%0{}d", padding)
    }
}

fn frame_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)(\D*)$").unwrap())
}

/// Groups file names into collections. Names without digits are returned as
/// remainder.
pub fn assemble<S: AsRef<str>>(files: &[S]) -> (Vec<Collection>, Vec<String>) {
    let mut groups: BTreeMap<(String, String, usize), BTreeSet<i64>> = BTreeMap::new();
    // Unpadded frames by (head, tail) -> digit length
    let mut unpadded: BTreeMap<(String, String), Vec<(usize, i64)>> = BTreeMap::new();
    let mut remainder = Vec::new();

    for file in files {
        let file = file.as_ref();
        let Some(caps) = frame_regex().captures(file) else {
            remainder.push(file.to_string());
            continue;
        };
        let (Some(digits), Some(tail)) = (caps.get(1), caps.get(2)) else {
            remainder.push(file.to_string());
            continue;
        };
        let Ok(frame) = digits.as_str().parse::<i64>() else {
            remainder.push(file.to_string());
            continue;
        };

        let head = file[..digits.start()].to_string();
        let tail = tail.as_str().to_string();
        let digits = digits.as_str();

        if digits.len() > 1 && digits.starts_with('0') {
            groups
                .entry((head, tail, digits.len()))
                .or_default()
                .insert(frame);
        } else {
            unpadded
                .entry((head, tail))
                .or_default()
                .push((digits.len(), frame));
        }
    }

    // Frames like 1000 belong to a padded collection of the same width
    for ((head, tail), frames) in unpadded {
        for (len, frame) in frames {
            let padded_key = (head.clone(), tail.clone(), len);
            if let Some(indexes) = groups.get_mut(&padded_key) {
                indexes.insert(frame);
            } else {
                groups
                    .entry((head.clone(), tail.clone(), 0))
                    .or_default()
                    .insert(frame);
            }
        }
    }

    let collections = groups
        .into_iter()
        .map(|((head, tail, padding), indexes)| Collection {
            head,
            tail,
            padding,
            indexes,
        })
        .collect();

    (collections, remainder)
}

/// Frames copied into sequence holes. The copies are removed on drop.
#[derive(Debug, Default)]
pub struct FilledFrames(Vec<PathBuf>);

impl FilledFrames {
    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }
}

impl Drop for FilledFrames {
    fn drop(&mut self) {
        for path in &self.0 {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to remove filled frame {}: {}", path.display(), e);
            }
        }
    }
}

/// Copies the nearest earlier frame into every hole of `[start, end]`.
///
/// Holes before the first existing frame take the first frame of the
/// collection. The returned guard removes the copies once the sequence has
/// been consumed; on error the copies made so far are removed before
/// returning.
pub fn fill_sequence_gaps<S: AsRef<str>>(
    files: &[S],
    staging_dir: &Path,
    start: i64,
    end: i64,
) -> Result<FilledFrames> {
    let (collections, _) = assemble(files);
    if collections.len() != 1 {
        return Err(ReviewError::AmbiguousSequence(collections.len()));
    }
    let collection = &collections[0];

    let Some(first) = collection.first() else {
        return Ok(FilledFrames::default());
    };

    let holes = collection.holes_in(start, end);
    let mut filled = FilledFrames(Vec::with_capacity(holes.len()));
    for hole in holes {
        let source = collection
            .indexes
            .range(..hole)
            .next_back()
            .copied()
            .unwrap_or(first);
        let source_path = staging_dir.join(collection.file_name(source));
        let hole_path = staging_dir.join(collection.file_name(hole));
        if !source_path.is_file() {
            return Err(ReviewError::MissingFrame(source_path));
        }

        debug!("Filling frame {} with {}", hole, source_path.display());
        fs::copy(&source_path, &hole_path)?;
        filled.0.push(hole_path);
    }

    Ok(filled)
}
