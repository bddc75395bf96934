use std::collections::BTreeMap;
use std::fmt;

use tracing::warn;

/// A marker-delimited range of lines, inclusive of both marker lines (1-based)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl Section {
    pub fn contains(&self, line_number: usize) -> bool {
        (self.start_line..=self.end_line).contains(&line_number)
    }
}

/// Problems found while matching begin/end markers. Indexing always continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerWarning {
    DuplicateBegin { section: String, line: usize, open_since: usize },
    UnmatchedEnd { section: String, line: usize },
    Interrupted { section: String, open_since: usize, by: String, line: usize },
    Unterminated { section: String, open_since: usize },
}

impl fmt::Display for MarkerWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerWarning::DuplicateBegin { section, line, open_since } => write!(
                f,
                "line {}: second begin marker for {} (already open since line {})",
                line, section, open_since
            ),
            MarkerWarning::UnmatchedEnd { section, line } => {
                write!(f, "line {}: end marker for {} without an open section", line, section)
            }
            MarkerWarning::Interrupted { section, open_since, by, line } => write!(
                f,
                "line {}: {} begins while {} (opened at line {}) is still open",
                line, by, section, open_since
            ),
            MarkerWarning::Unterminated { section, open_since } => write!(
                f,
                "{} opened at line {} is never closed",
                section, open_since
            ),
        }
    }
}

/// Section layout of a document, for the tracked section names only
#[derive(Debug, Clone, Default)]
pub struct SectionIndex {
    sections: Vec<Section>,
    warnings: Vec<MarkerWarning>,
}

impl SectionIndex {
    /// Index `lines` for the given section names.
    ///
    /// Sections do not nest: a begin marker while another section is open closes
    /// the open one on the previous line. Malformed markers produce a warning and
    /// the most recent marker wins.
    pub fn build<S: AsRef<str>>(lines: &[&str], names: &[S]) -> Self {
        let markers: Vec<(String, String, String)> = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                (
                    name.to_string(),
                    format!("Begin {} section", name),
                    format!("End {} section", name),
                )
            })
            .collect();

        let mut index = SectionIndex::default();
        let mut open: Option<(String, usize)> = None;

        for (i, line) in lines.iter().enumerate() {
            let line_number = i + 1;

            for (name, begin, end) in &markers {
                if line.contains(begin.as_str()) {
                    match open.take() {
                        Some((current, since)) if current == *name => {
                            index.warn(MarkerWarning::DuplicateBegin {
                                section: name.clone(),
                                line: line_number,
                                open_since: since,
                            });
                            index.close(current, since, line_number - 1);
                        }
                        Some((current, since)) => {
                            index.warn(MarkerWarning::Interrupted {
                                section: current.clone(),
                                open_since: since,
                                by: name.clone(),
                                line: line_number,
                            });
                            index.close(current, since, line_number - 1);
                        }
                        None => {}
                    }
                    open = Some((name.clone(), line_number));
                } else if line.contains(end.as_str()) {
                    match open.take() {
                        Some((current, since)) if current == *name => {
                            index.close(current, since, line_number);
                        }
                        other => {
                            index.warn(MarkerWarning::UnmatchedEnd {
                                section: name.clone(),
                                line: line_number,
                            });
                            open = other;
                        }
                    }
                }
            }
        }

        if let Some((current, since)) = open {
            index.warn(MarkerWarning::Unterminated {
                section: current.clone(),
                open_since: since,
            });
            index.close(current, since, lines.len().max(since));
        }

        index
    }

    fn close(&mut self, name: String, start_line: usize, end_line: usize) {
        self.sections.push(Section { name, start_line, end_line });
    }

    fn warn(&mut self, warning: MarkerWarning) {
        warn!("⚠️ Malformed section markers: {}", warning);
        self.warnings.push(warning);
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn warnings(&self) -> &[MarkerWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<MarkerWarning> {
        self.warnings
    }

    /// Name of the tracked section owning a 1-based line, if any
    pub fn section_at(&self, line_number: usize) -> Option<&str> {
        self.sections
            .iter()
            .find(|section| section.contains(line_number))
            .map(|section| section.name.as_str())
    }

    /// Every owned line number per section name, ascending
    pub fn line_map(&self) -> BTreeMap<&str, Vec<usize>> {
        let mut map: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for section in &self.sections {
            map.entry(section.name.as_str())
                .or_default()
                .extend(section.start_line..=section.end_line);
        }
        map
    }
}
