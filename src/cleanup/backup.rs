use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use tracing::info;

/// `<file>.backup_<timestamp>`, next to the original
pub fn backup_path(project_file: &Path, timestamp: &str) -> PathBuf {
    let mut name = project_file
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".backup_{}", timestamp));
    project_file.with_file_name(name)
}

/// Copy `project_file` to a fresh timestamped backup; never overwrites an existing one
pub fn create_backup<Tz>(project_file: &Path, now: &DateTime<Tz>, timestamp_format: &str) -> io::Result<PathBuf>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let timestamp = now.format(timestamp_format).to_string();
    let mut candidate = backup_path(project_file, &timestamp);
    let mut attempt = 1;
    while candidate.exists() {
        candidate = backup_path(project_file, &format!("{}_{}", timestamp, attempt));
        attempt += 1;
    }

    fs::copy(project_file, &candidate)?;
    info!("✅ Created backup: {}", candidate.display());
    Ok(candidate)
}
