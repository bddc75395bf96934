use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, error, info};

use super::duplicates::{self, DuplicateGroup, DuplicateSummary};
use super::remover::{ReferenceRemover, RemovedLine};
use super::scanner::ReferenceScanner;
use super::sections::{MarkerWarning, SectionIndex};
use super::validator::StructureValidator;
use crate::config::Config;
use crate::error::{CleanupError, Result};

/// Decode raw project bytes; anything but UTF-8 is rejected before processing
pub fn decode_document(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|source| CleanupError::Decode {
        valid_up_to: source.valid_up_to(),
        source,
    })
}

/// A validated rewrite, ready for the caller to commit
#[derive(Debug, Clone)]
pub struct CleanupResult {
    pub text: String,
    pub removed_line_count: usize,
    pub duplicates: BTreeMap<String, DuplicateGroup>,
    pub removed_lines: Vec<RemovedLine>,
    /// Identifiers removed because a removed line declared them
    pub cascaded: BTreeSet<String>,
    pub warnings: Vec<MarkerWarning>,
    pub reference_count: usize,
}

impl CleanupResult {
    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }

    /// Number of redundant references across all names
    pub fn redundant_count(&self) -> usize {
        self.duplicates.values().map(|g| g.remove.len()).sum()
    }

    pub fn report(&self) -> BTreeMap<String, DuplicateSummary> {
        self.duplicates
            .iter()
            .map(|(name, group)| (name.clone(), group.summary()))
            .collect()
    }
}

/// Scan → index → analyze → remove → validate, as a pure text transform
#[derive(Debug, Clone)]
pub struct CleanupPipeline {
    scanner: ReferenceScanner,
    tracked_sections: Vec<String>,
    remover: ReferenceRemover,
    validator: StructureValidator,
}

impl CleanupPipeline {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            scanner: ReferenceScanner::new(&config.extensions)?,
            tracked_sections: config.tracked_sections.clone(),
            remover: ReferenceRemover::new(config.match_mode, config.cascade_dependents),
            validator: StructureValidator::new(&config.required_sections),
        })
    }

    pub fn run(&self, text: &str) -> Result<CleanupResult> {
        let lines: Vec<&str> = text.split('\n').collect();
        let index = SectionIndex::build(&lines, &self.tracked_sections);
        info!(
            "Indexed {} tracked sections ({} marker warnings)",
            index.sections().len(),
            index.warnings().len()
        );
        for (name, owned) in index.line_map() {
            debug!("  {}: {} lines", name, owned.len());
        }

        let mut references = self.scanner.scan(text);
        for reference in &mut references {
            reference.section = index.section_at(reference.line_number).map(str::to_string);
        }
        info!("🔎 Found {} total file references", references.len());

        let duplicates = duplicates::find_duplicates(&references);
        let (rewritten, removed_lines, cascaded) = if duplicates.is_empty() {
            info!("No duplicate file references");
            (text.to_string(), Vec::new(), BTreeSet::new())
        } else {
            let removal = self.remover.remove(
                text,
                &duplicates::identifiers_to_remove(&duplicates),
                &duplicates::identifiers_to_keep(&duplicates),
                &index,
            );
            info!("🧹 Removed {} lines", removal.removed.len());
            (removal.text, removal.removed, removal.cascaded)
        };

        if let Err(failure) = self.validator.validate_rewrite(text, &rewritten) {
            error!("❌ Validation failed: {}", failure);
            return Err(CleanupError::ValidationFailed {
                reason: failure.to_string(),
                warnings: index.into_warnings(),
            });
        }

        Ok(CleanupResult {
            text: rewritten,
            removed_line_count: removed_lines.len(),
            duplicates,
            removed_lines,
            cascaded,
            warnings: index.into_warnings(),
            reference_count: references.len(),
        })
    }
}
