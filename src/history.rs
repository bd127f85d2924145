use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::{
    fs::{OpenOptions, create_dir_all},
    io::Write,
    path::Path,
};

use crate::cli::Args;
use crate::errors::Result;

/// One line of the notification history file.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub timestamp: String,
    pub pid: u32,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_bundle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Task duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl NotificationRecord {
    /// Records the request as given on the command line, before any content decoration.
    pub fn new(args: &Args) -> Self {
        let present = |value: &Option<String>| value.clone().filter(|value| !value.is_empty());
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            pid: std::process::id(),
            title: args.title.clone(),
            message: args.message.clone(),
            project_path: present(&args.project_path),
            project_name: present(&args.project_name),
            host_bundle_id: present(&args.host_bundle_id),
            status: args.status().map(|status| status.to_string()),
            subtitle: present(&args.subtitle),
            duration: args.duration().map(|duration| duration.as_secs()),
        }
    }
}

/// Appends `record` as one JSON line to `path`, creating the file and its directory.
pub fn append(path: &Path, record: &NotificationRecord) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}
