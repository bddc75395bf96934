use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use super::scanner::Reference;

/// All references sharing one logical name: the earliest is kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub keep: Reference,
    /// Ascending by line number, one entry per distinct identifier
    pub remove: Vec<Reference>,
}

/// Serializable per-name summary handed back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateSummary {
    pub kept_identifier: String,
    pub removed_identifiers: Vec<String>,
}

impl DuplicateGroup {
    pub fn summary(&self) -> DuplicateSummary {
        DuplicateSummary {
            kept_identifier: self.keep.identifier.clone(),
            removed_identifiers: self.remove.iter().map(|r| r.identifier.clone()).collect(),
        }
    }
}

/// Group references by logical name and split each multi-entry group into keep/remove.
///
/// Repeated occurrences of the same identifier count once; a name is only a duplicate
/// when two or more distinct identifiers carry it. Every removed reference lies on a
/// later line than its group's kept one.
pub fn find_duplicates(references: &[Reference]) -> BTreeMap<String, DuplicateGroup> {
    let mut by_name: HashMap<&str, Vec<&Reference>> = HashMap::new();
    for reference in references {
        by_name.entry(reference.logical_name.as_str()).or_default().push(reference);
    }

    let mut groups = BTreeMap::new();
    for (name, mut members) in by_name {
        // stable: equal line numbers keep scan order
        members.sort_by_key(|r| r.line_number);

        let mut seen = HashSet::new();
        let mut distinct = members.into_iter().filter(|r| seen.insert(r.identifier.clone()));

        let Some(keep) = distinct.next() else { continue };
        let remove: Vec<Reference> = distinct.cloned().collect();
        if remove.is_empty() {
            continue;
        }

        debug!("{}: keeping {} and removing {} other(s)", name, keep.identifier, remove.len());
        groups.insert(name.to_string(), DuplicateGroup { keep: keep.clone(), remove });
    }

    reconcile(groups, references)
}

/// Keep identifiers out of removal when another group keeps them or when one of their
/// lines also carries a kept identifier, and remove each one once.
///
/// Removal drops whole lines, so a redundant identifier sharing a line with a kept one
/// cannot go without taking the kept one along.
fn reconcile(
    mut groups: BTreeMap<String, DuplicateGroup>,
    references: &[Reference],
) -> BTreeMap<String, DuplicateGroup> {
    let kept: HashSet<String> = groups.values().map(|g| g.keep.identifier.clone()).collect();

    let mut kept_lines: HashMap<usize, &str> = HashMap::new();
    let mut spans: HashMap<&str, Vec<(usize, usize)>> = HashMap::new();
    for r in references {
        if kept.contains(&r.identifier) {
            for line in r.line_number..=r.end_line {
                kept_lines.entry(line).or_insert(r.identifier.as_str());
            }
        }
        spans.entry(r.identifier.as_str()).or_default().push((r.line_number, r.end_line));
    }

    let mut claimed = HashSet::new();
    for (name, group) in groups.iter_mut() {
        group.remove.retain(|r| {
            if kept.contains(&r.identifier) {
                warn!(
                    "⚠️ {} (line {}) is kept for another file name; not removing it for {}",
                    r.identifier, r.line_number, name
                );
                return false;
            }

            let shared = spans
                .get(r.identifier.as_str())
                .into_iter()
                .flatten()
                .flat_map(|&(start, end)| start..=end)
                .find_map(|line| kept_lines.get(&line).map(|keep| (line, *keep)));
            if let Some((line, keep)) = shared {
                warn!(
                    "⚠️ {} shares line {} with kept {}; not removing it for {}",
                    r.identifier, line, keep, name
                );
                return false;
            }

            claimed.insert(r.identifier.clone())
        });
    }

    groups.retain(|_, group| !group.remove.is_empty());
    groups
}

/// Union of every identifier scheduled for removal
pub fn identifiers_to_remove(groups: &BTreeMap<String, DuplicateGroup>) -> BTreeSet<String> {
    groups
        .values()
        .flat_map(|g| g.remove.iter().map(|r| r.identifier.clone()))
        .collect()
}

/// Identifiers that must survive the cleanup
pub fn identifiers_to_keep(groups: &BTreeMap<String, DuplicateGroup>) -> BTreeSet<String> {
    groups.values().map(|g| g.keep.identifier.clone()).collect()
}
