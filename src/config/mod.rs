use std::fs;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use toml_edit::{Array, DocumentMut, Item as TomlItem};
use tracing::{debug, info};

use crate::error::{CleanupError, Result};
use crate::pbxproj::MatchMode;

pub const DEFAULT_EXTENSIONS: [&str; 5] = ["swift", "m", "h", "storyboard", "xib"];

pub const DEFAULT_TRACKED_SECTIONS: [&str; 5] = [
    "PBXBuildFile",
    "PBXFileReference",
    "PBXGroup",
    "PBXSourcesBuildPhase",
    "PBXResourcesBuildPhase",
];

pub const DEFAULT_REQUIRED_SECTIONS: [&str; 4] = ["PBXBuildFile", "PBXFileReference", "PBXGroup", "PBXProject"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub extensions: Vec<String>,
    pub tracked_sections: Vec<String>,
    pub required_sections: Vec<String>,
    pub match_mode: MatchMode,
    pub cascade_dependents: bool,
    pub backup_enabled: bool,
    pub timestamp_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            tracked_sections: DEFAULT_TRACKED_SECTIONS.iter().map(|s| s.to_string()).collect(),
            required_sections: DEFAULT_REQUIRED_SECTIONS.iter().map(|s| s.to_string()).collect(),
            match_mode: MatchMode::Substring,
            cascade_dependents: false,
            backup_enabled: true,
            timestamp_format: "%Y%m%d_%H%M%S".to_string(),
        }
    }
}

impl Config {
    /// `$HOME/.config/pbxclean/config.toml`
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".config/pbxclean/config.toml")
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)?;
        let config = Self::parse(&contents).map_err(|e| match e {
            CleanupError::Config { details } => CleanupError::config(format!("{}: {}", path.display(), details)),
            other => other,
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let doc = contents
            .parse::<DocumentMut>()
            .map_err(|e| CleanupError::config(e.to_string()))?;
        let mut config = Config::default();

        if let Some(extensions) = string_list(&doc, "scan", "extensions")? {
            config.extensions = extensions;
        }
        if let Some(tracked) = string_list(&doc, "sections", "tracked")? {
            config.tracked_sections = tracked;
        }
        if let Some(required) = string_list(&doc, "sections", "required")? {
            config.required_sections = required;
        }
        if let Some(mode) = entry(&doc, "removal", "match_mode") {
            let mode = mode
                .as_str()
                .ok_or_else(|| CleanupError::config("removal.match_mode must be a string"))?;
            config.match_mode = mode.parse().map_err(CleanupError::config)?;
        }
        if let Some(cascade) = entry(&doc, "removal", "cascade_dependents") {
            config.cascade_dependents = cascade
                .as_bool()
                .ok_or_else(|| CleanupError::config("removal.cascade_dependents must be a boolean"))?;
        }
        if let Some(enabled) = entry(&doc, "backup", "enabled") {
            config.backup_enabled = enabled
                .as_bool()
                .ok_or_else(|| CleanupError::config("backup.enabled must be a boolean"))?;
        }
        if let Some(format) = entry(&doc, "backup", "timestamp_format") {
            config.timestamp_format = format
                .as_str()
                .ok_or_else(|| CleanupError::config("backup.timestamp_format must be a string"))?
                .to_string();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.extensions.iter().all(|e| e.trim().trim_start_matches('.').is_empty()) {
            return Err(CleanupError::config("scan.extensions must list at least one extension"));
        }
        if self.timestamp_format.is_empty()
            || self.timestamp_format.contains('/')
            || StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error))
        {
            return Err(CleanupError::config(format!(
                "backup.timestamp_format '{}' is not a usable strftime pattern",
                self.timestamp_format
            )));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> String {
        let mut doc = DocumentMut::new();

        doc["scan"] = toml_edit::table();
        doc["scan"]["extensions"] = toml_edit::value(string_array(&self.extensions));

        doc["sections"] = toml_edit::table();
        doc["sections"]["tracked"] = toml_edit::value(string_array(&self.tracked_sections));
        doc["sections"]["required"] = toml_edit::value(string_array(&self.required_sections));

        doc["removal"] = toml_edit::table();
        doc["removal"]["match_mode"] = toml_edit::value(self.match_mode.as_str());
        doc["removal"]["cascade_dependents"] = toml_edit::value(self.cascade_dependents);

        doc["backup"] = toml_edit::table();
        doc["backup"]["enabled"] = toml_edit::value(self.backup_enabled);
        doc["backup"]["timestamp_format"] = toml_edit::value(self.timestamp_format.as_str());

        format!("# pbxclean configuration file.\n{}", doc)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml())?;
        Ok(())
    }
}

fn entry<'a>(doc: &'a DocumentMut, table: &str, key: &str) -> Option<&'a TomlItem> {
    doc.get(table).and_then(|t| t.get(key))
}

fn string_list(doc: &DocumentMut, table: &str, key: &str) -> Result<Option<Vec<String>>> {
    let Some(item) = entry(doc, table, key) else {
        return Ok(None);
    };
    let invalid = || CleanupError::config(format!("{}.{} must be an array of strings", table, key));

    let array = item.as_array().ok_or_else(invalid)?;
    array
        .iter()
        .map(|value| value.as_str().map(str::to_string).ok_or_else(invalid))
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn string_array(values: &[String]) -> Array {
    values.iter().map(String::as_str).collect()
}
