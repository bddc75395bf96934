use regex::Regex;
use tracing::debug;

use crate::error::{CleanupError, Result};

/// A `<identifier> /* <name> */` occurrence found in the project text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub identifier: String,
    pub logical_name: String,
    /// 1-based line of the match start
    pub line_number: usize,
    /// 1-based line of the match end; differs from `line_number` when the comment wraps
    pub end_line: usize,
    pub raw_text: String,
    /// Tracked section owning `line_number`, filled in by the pipeline
    pub section: Option<String>,
}

/// Extracts file references whose names end in one of the allowed extensions
#[derive(Debug, Clone)]
pub struct ReferenceScanner {
    pattern: Regex,
}

impl ReferenceScanner {
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Result<Self> {
        let alternatives: Vec<String> = extensions
            .iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .map(regex::escape)
            .collect();

        if alternatives.is_empty() {
            return Err(CleanupError::config("at least one file extension is required"));
        }

        let pattern = format!(
            r"([A-F0-9]{{24}})\s*/\*\s*([^*]+\.(?:{}))\s*\*/",
            alternatives.join("|")
        );
        debug!("Reference pattern: {}", pattern);

        Ok(Self {
            pattern: Regex::new(&pattern)?,
        })
    }

    /// Scan the whole document; references come back in text order
    pub fn scan(&self, text: &str) -> Vec<Reference> {
        let mut references = Vec::new();
        let mut counted_to = 0;
        let mut line_number = 1;

        for caps in self.pattern.captures_iter(text) {
            let (Some(whole), Some(identifier), Some(name)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };

            line_number += text[counted_to..whole.start()].matches('\n').count();
            counted_to = whole.start();

            references.push(Reference {
                identifier: identifier.as_str().to_string(),
                logical_name: name.as_str().trim().to_string(),
                line_number,
                end_line: line_number + whole.as_str().matches('\n').count(),
                raw_text: whole.as_str().to_string(),
                section: None,
            });
        }

        debug!("Scanned {} file references", references.len());
        references
    }
}
