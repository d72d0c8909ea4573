use pdftitle_core::{ExtractionConfig, Variant};

/// Extraction flags shared by `run` and `inspect`.
#[derive(Debug, Clone, clap::Args)]
pub struct ExtractionArgs {
    /// baseline: first 3 pages, empty outline. extended: all pages, heading outline
    #[arg(long, env = "PDFTITLE_VARIANT", default_value = "baseline")]
    pub variant: Variant,

    /// Override the variant's page limit
    #[arg(long, env = "PDFTITLE_MAX_PAGES")]
    pub max_pages: Option<usize>,
}

impl ExtractionArgs {
    pub fn config(&self) -> ExtractionConfig {
        let config = ExtractionConfig::for_variant(self.variant);
        match self.max_pages {
            Some(limit) => config.with_page_limit(Some(limit)),
            None => config,
        }
    }
}
