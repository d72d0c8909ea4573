use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Pages scored by the baseline variant.
pub const BASELINE_PAGE_LIMIT: usize = 3;

/// Which extraction behavior to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// First three pages, penalties applied during scoring, empty outline.
    #[default]
    Baseline,
    /// All pages, header/footer and page-number spans dropped before scoring,
    /// heuristic heading outline.
    Extended,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Baseline => write!(f, "baseline"),
            Variant::Extended => write!(f, "extended"),
        }
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baseline" => Ok(Variant::Baseline),
            "extended" => Ok(Variant::Extended),
            other => Err(format!(
                "unknown variant '{other}' (expected 'baseline' or 'extended')"
            )),
        }
    }
}

/// Knobs for a single document run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub variant: Variant,
    /// Maximum number of pages to normalize and score. `None` means all pages.
    pub page_limit: Option<usize>,
    /// Drop header/footer band and page-number spans during normalization.
    pub early_filter: bool,
    /// Populate the outline from heading candidates.
    pub build_outline: bool,
}

impl ExtractionConfig {
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Baseline => Self {
                variant,
                page_limit: Some(BASELINE_PAGE_LIMIT),
                early_filter: false,
                build_outline: false,
            },
            Variant::Extended => Self {
                variant,
                page_limit: None,
                early_filter: true,
                build_outline: true,
            },
        }
    }

    /// Override the variant's page limit.
    pub fn with_page_limit(mut self, page_limit: Option<usize>) -> Self {
        self.page_limit = page_limit;
        self
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::for_variant(Variant::default())
    }
}
