use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::extract::ExtractionSummary;
use crate::instance::{Instance, PublishContext};

/// Record of one extraction pass over an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub id: String,
    pub instance_name: String,
    pub host_name: String,
    pub task_name: String,

    // Timestamps
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub summary: ExtractionSummary,
}

impl ExtractionReport {
    pub fn start(instance: &Instance, context: &PublishContext) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            instance_name: instance.name.clone(),
            host_name: context.host_name.clone(),
            task_name: context.task_name.clone(),
            started_at: Utc::now(),
            finished_at: None,
            error: None,
            summary: ExtractionSummary::default(),
        }
    }

    pub fn finish(&mut self, result: std::result::Result<ExtractionSummary, String>) {
        match result {
            Ok(summary) => self.summary = summary,
            Err(error) => self.error = Some(error),
        }
        self.finished_at = Some(Utc::now());
    }
}

/// Writes `<id>.json` into `report_dir` and returns its path.
pub fn save_report(report: &ExtractionReport, report_dir: &Path) -> Result<PathBuf> {
    use std::fs;
    use std::io::Write;

    fs::create_dir_all(report_dir)?;

    let json = serde_json::to_string_pretty(report)?;

    // Write atomically using a temporary file
    let report_file = report_dir.join(format!("{}.json", report.id));
    let temp_file = report_dir.join(format!("{}.json.tmp", report.id));

    let mut file = fs::File::create(&temp_file)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_file, &report_file)?;

    Ok(report_file)
}

pub fn load_report(path: &Path) -> Result<ExtractionReport> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
