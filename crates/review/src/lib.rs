// Core review extraction library modules

pub mod config;
pub mod convert;
pub mod encode;
pub mod error;
pub mod extract;
pub mod instance;
pub mod overscan;
pub mod probe;
pub mod profiles;
pub mod report;
pub mod runner;
pub mod sequence;
pub mod tags;
pub mod temp_data;

// Re-export commonly used types
pub use config::{OutputDefinition, Profile, ReviewConfig};
pub use error::{Result, ReviewError};
pub use extract::{ExtractReview, ExtractionSummary};
pub use instance::{Instance, PublishContext, Representation, RepresentationFiles};
pub use tags::{ReviewTag, TagSet};
