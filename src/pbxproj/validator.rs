use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static ANY_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\* (?:Begin|End) \w+ section \*/").expect("valid marker regex"));

/// Why a rewritten document must not be written back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    MissingMarker { marker: String },
    MarkerLost { marker: String },
    UnbalancedBraces { open: usize, close: usize },
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::MissingMarker { marker } => {
                write!(f, "Missing required section: {}", marker)
            }
            ValidationFailure::MarkerLost { marker } => {
                write!(f, "Section marker removed during cleanup: {}", marker)
            }
            ValidationFailure::UnbalancedBraces { open, close } => {
                write!(f, "Unbalanced braces: {} open, {} close", open, close)
            }
        }
    }
}

/// Coarse structural check: required markers present, braces balanced
#[derive(Debug, Clone)]
pub struct StructureValidator {
    markers: Vec<String>,
}

impl StructureValidator {
    pub fn new<S: AsRef<str>>(required_sections: &[S]) -> Self {
        let markers = required_sections
            .iter()
            .flat_map(|name| {
                let name = name.as_ref();
                [
                    format!("/* Begin {} section */", name),
                    format!("/* End {} section */", name),
                ]
            })
            .collect();
        Self { markers }
    }

    /// Check the rewritten text on its own
    pub fn validate(&self, text: &str) -> Result<(), ValidationFailure> {
        if let Some(marker) = self.markers.iter().find(|m| !text.contains(m.as_str())) {
            return Err(ValidationFailure::MissingMarker { marker: marker.clone() });
        }

        let open = text.matches('{').count();
        let close = text.matches('}').count();
        if open != close {
            return Err(ValidationFailure::UnbalancedBraces { open, close });
        }

        debug!("Structure OK: {} markers, {} brace pairs", self.markers.len(), open);
        Ok(())
    }

    /// Check the rewritten text, and that every section marker of `original` survived
    pub fn validate_rewrite(&self, original: &str, rewritten: &str) -> Result<(), ValidationFailure> {
        if let Some(marker) = self.markers.iter().find(|m| !rewritten.contains(m.as_str())) {
            return Err(ValidationFailure::MissingMarker { marker: marker.clone() });
        }

        if let Some(marker) = ANY_MARKER
            .find_iter(original)
            .map(|m| m.as_str())
            .find(|m| !rewritten.contains(m))
        {
            return Err(ValidationFailure::MarkerLost { marker: marker.to_string() });
        }

        self.validate(rewritten)
    }
}
