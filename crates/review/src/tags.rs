// Representation and output tags

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tags that drive extraction behaviour. Anything else is carried through as
/// `Custom` for downstream plugins (burnins, review uploads, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReviewTag {
    Review,
    Thumbnail,
    Passing,
    Delete,
    NoHandles,
    NoAudio,
    Sequence,
    BakeLut,
    Reformated,
    CleanName,
    Custom(String),
}

impl ReviewTag {
    pub fn as_str(&self) -> &str {
        match self {
            ReviewTag::Review => "review",
            ReviewTag::Thumbnail => "thumbnail",
            ReviewTag::Passing => "passing",
            ReviewTag::Delete => "delete",
            ReviewTag::NoHandles => "no-handles",
            ReviewTag::NoAudio => "no-audio",
            ReviewTag::Sequence => "sequence",
            ReviewTag::BakeLut => "bake-lut",
            ReviewTag::Reformated => "reformated",
            ReviewTag::CleanName => "clean_name",
            ReviewTag::Custom(value) => value,
        }
    }
}

impl From<&str> for ReviewTag {
    fn from(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "review" => ReviewTag::Review,
            "thumbnail" => ReviewTag::Thumbnail,
            "passing" => ReviewTag::Passing,
            "delete" => ReviewTag::Delete,
            "no-handles" => ReviewTag::NoHandles,
            "no-audio" => ReviewTag::NoAudio,
            "sequence" => ReviewTag::Sequence,
            "bake-lut" => ReviewTag::BakeLut,
            "reformated" => ReviewTag::Reformated,
            "clean_name" => ReviewTag::CleanName,
            _ => ReviewTag::Custom(value.to_string()),
        }
    }
}

impl From<String> for ReviewTag {
    fn from(value: String) -> Self {
        ReviewTag::from(value.as_str())
    }
}

impl From<ReviewTag> for String {
    fn from(tag: ReviewTag) -> Self {
        match tag {
            ReviewTag::Custom(value) => value,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ReviewTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of tags; insertion order is kept for serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(Vec<ReviewTag>);

impl TagSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn contains(&self, tag: &ReviewTag) -> bool {
        self.0.contains(tag)
    }

    /// Adds the tag unless it is already present. Returns whether it was added.
    pub fn insert(&mut self, tag: ReviewTag) -> bool {
        if self.contains(&tag) {
            return false;
        }
        self.0.push(tag);
        true
    }

    pub fn remove(&mut self, tag: &ReviewTag) -> bool {
        let before = self.0.len();
        self.0.retain(|t| t != tag);
        before != self.0.len()
    }

    pub fn extend<I: IntoIterator<Item = ReviewTag>>(&mut self, tags: I) {
        for tag in tags {
            self.insert(tag);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReviewTag> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive intersection test against raw filter strings.
    pub fn intersects_any(&self, filters: &[String]) -> bool {
        let lowered: Vec<String> = filters.iter().map(|f| f.to_lowercase()).collect();
        self.0
            .iter()
            .any(|tag| lowered.contains(&tag.as_str().to_lowercase()))
    }
}

impl<T: Into<ReviewTag>> FromIterator<T> for TagSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = TagSet::new();
        set.extend(iter.into_iter().map(Into::into));
        set
    }
}
