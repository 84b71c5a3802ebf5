//! Verified reference sources supplied with a draft request.
//!
//! A source only counts as usable when its summary carries enough real
//! prose to cite from. Citation gating in the synthesizer consumes only
//! usable sources.

use serde::{Deserialize, Serialize};

use crate::draft::measure::{measure, LengthUnit};
use crate::guard;

/// Minimum summary length, in the request language's unit, for a source
/// to be citable.
const MIN_SUMMARY_UNITS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedSource {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub summary_text: String,
    #[serde(default)]
    pub verified: bool,
}

impl VerifiedSource {
    /// A source is usable when it is marked verified and its summary is
    /// non-empty, long enough to cite from, and not ciphertext-shaped.
    pub fn is_usable(&self, unit: LengthUnit) -> bool {
        let summary = self.summary_text.trim();
        self.verified
            && !summary.is_empty()
            && measure(summary, unit) >= MIN_SUMMARY_UNITS
            && !guard::is_ciphertext_token(summary)
    }
}

/// True if at least one source can actually back a citation.
pub fn any_usable(sources: &[VerifiedSource], unit: LengthUnit) -> bool {
    sources.iter().any(|s| s.is_usable(unit))
}
