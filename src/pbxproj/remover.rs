use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use super::sections::SectionIndex;

/// `<ID> [/* comment */] =` at the start of a line: the line declares `<ID>`
static DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-F0-9]{24})\s*(?:/\*[^*]*\*/)?\s*=").expect("valid declaration regex"));

/// How strictly an identifier has to appear in a line for the line to be removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Anywhere in the line, even inside a longer token
    #[default]
    Substring,
    /// Not adjacent to another ASCII letter or digit
    Token,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Substring => "substring",
            MatchMode::Token => "token",
        }
    }

    pub fn matches(&self, line: &str, identifier: &str) -> bool {
        match self {
            MatchMode::Substring => line.contains(identifier),
            MatchMode::Token => line.match_indices(identifier).any(|(start, found)| {
                let before = line[..start].chars().next_back();
                let after = line[start + found.len()..].chars().next();
                !before.is_some_and(|c| c.is_ascii_alphanumeric())
                    && !after.is_some_and(|c| c.is_ascii_alphanumeric())
            }),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substring" => Ok(MatchMode::Substring),
            "token" => Ok(MatchMode::Token),
            other => Err(format!("unknown match mode '{}' (expected 'substring' or 'token')", other)),
        }
    }
}

/// One line dropped from the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedLine {
    pub line_number: usize,
    pub section: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Removal {
    pub text: String,
    pub removed: Vec<RemovedLine>,
    /// Identifiers picked up through declarations on removed lines
    pub cascaded: BTreeSet<String>,
}

/// Rebuilds a document without every line mentioning a doomed identifier
#[derive(Debug, Clone, Default)]
pub struct ReferenceRemover {
    mode: MatchMode,
    cascade_dependents: bool,
}

impl ReferenceRemover {
    pub fn new(mode: MatchMode, cascade_dependents: bool) -> Self {
        Self { mode, cascade_dependents }
    }

    /// Drop every line that mentions one of `identifiers`.
    ///
    /// With cascading enabled, identifiers declared on dropped lines are added to the
    /// set until nothing new turns up. Identifiers in `protected` never join the set.
    /// A dropped line that leaves a `/*` comment open takes the lines up to its `*/` along.
    pub fn remove(
        &self,
        text: &str,
        identifiers: &BTreeSet<String>,
        protected: &BTreeSet<String>,
        sections: &SectionIndex,
    ) -> Removal {
        let lines: Vec<&str> = text.split('\n').collect();
        let mut targets = identifiers.clone();
        let mut cascaded = BTreeSet::new();
        let mut doomed = vec![false; lines.len()];

        loop {
            let mut discovered = BTreeSet::new();
            for (i, line) in lines.iter().enumerate() {
                if doomed[i] || !targets.iter().any(|id| self.mode.matches(line, id)) {
                    continue;
                }
                doomed[i] = true;

                if self.cascade_dependents {
                    if let Some(declared) = DECLARATION.captures(line).and_then(|c| c.get(1)) {
                        let declared = declared.as_str();
                        if !targets.contains(declared) && !protected.contains(declared) {
                            discovered.insert(declared.to_string());
                        }
                    }
                }
            }

            if discovered.is_empty() {
                break;
            }
            debug!("Cascading removal to {} dependent identifier(s)", discovered.len());
            targets.extend(discovered.iter().cloned());
            cascaded.extend(discovered);
        }

        for i in 0..lines.len() {
            if !doomed[i] {
                continue;
            }
            if let Some(end) = comment_tail(&lines, i) {
                debug!("Line {} continues a comment through line {}", i + 1, end + 1);
                doomed[i + 1..=end].iter_mut().for_each(|d| *d = true);
            }
        }

        let mut kept = Vec::with_capacity(lines.len());
        let mut removed = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if doomed[i] {
                let line_number = i + 1;
                let section = sections.section_at(line_number).map(str::to_string);
                info!(
                    "  Removing line {} ({}): {}",
                    line_number,
                    section.as_deref().unwrap_or("outside tracked sections"),
                    line.trim()
                );
                removed.push(RemovedLine {
                    line_number,
                    section,
                    text: line.trim().to_string(),
                });
            } else {
                kept.push(*line);
            }
        }

        Removal {
            text: kept.join("\n"),
            removed,
            cascaded,
        }
    }
}

/// Index of the line closing a comment left open at the end of `lines[start]`
fn comment_tail(lines: &[&str], start: usize) -> Option<usize> {
    let line = lines[start];
    let open = line.rfind("/*")?;
    if line.rfind("*/").is_some_and(|close| close > open) {
        return None;
    }

    let end = lines
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, l)| l.contains("*/"))
        .map(|(i, _)| i);
    if end.is_none() {
        warn!("Comment opened on line {} is never closed", start + 1);
    }
    end
}
