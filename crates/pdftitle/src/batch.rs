use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use pdftitle_core::{analyze, DocumentAnalysis, ExtractionConfig, OutputRecord};

use crate::options::ExtractionArgs;
use crate::prelude::{println, *};

/// Candidates logged per document.
const LOGGED_CANDIDATES: usize = 5;

/// Page-one elements logged per document.
const LOGGED_ELEMENTS: usize = 10;

#[derive(Debug, clap::Args, Clone)]
pub struct RunOptions {
    /// Directory scanned (non-recursively) for *.pdf files
    #[arg(short, long, env = "PDFTITLE_INPUT_DIR", default_value = "/app/input")]
    pub input_dir: PathBuf,

    /// Directory receiving one <stem>.json per input PDF
    #[arg(short, long, env = "PDFTITLE_OUTPUT_DIR", default_value = "/app/output")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub extraction: ExtractionArgs,
}

/// What happened to a single input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    /// A candidate scored above zero.
    Titled,
    /// Processed, but nothing scored above zero.
    Untitled,
    /// Extraction failed and the fallback record was written.
    Failed(String),
    /// No output file could be written.
    WriteError(String),
}

#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub record: OutputRecord,
    pub status: DocumentStatus,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<DocumentReport>,
}

impl BatchSummary {
    fn count(&self, predicate: impl Fn(&DocumentStatus) -> bool) -> usize {
        self.reports.iter().filter(|r| predicate(&r.status)).count()
    }

    pub fn titled(&self) -> usize {
        self.count(|s| *s == DocumentStatus::Titled)
    }

    pub fn untitled(&self) -> usize {
        self.count(|s| *s == DocumentStatus::Untitled)
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Failed(_)))
    }

    pub fn write_failures(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::WriteError(_)))
    }
}

pub fn run(options: RunOptions, global: crate::Global) -> Result<()> {
    let config = options.extraction.config();
    log::info!(
        "Processing {} with the {} variant",
        options.input_dir.display(),
        config.variant
    );

    let summary = process_directory(
        &options.input_dir,
        &options.output_dir,
        &config,
        !global.verbose,
    )?;
    print_summary(&summary);

    match summary.write_failures() {
        0 => Ok(()),
        n => Err(Error::WriteFailures(n).into()),
    }
}

/// Process every PDF in `input_dir`, writing one record per file into
/// `output_dir`. Only failing to create `output_dir` aborts the batch.
pub fn process_directory(
    input_dir: &Path,
    output_dir: &Path,
    config: &ExtractionConfig,
    show_progress: bool,
) -> Result<BatchSummary> {
    fs::create_dir_all(output_dir).map_err(|e| Error::OutputDir {
        path: output_dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let pdfs = list_pdfs(input_dir);
    if pdfs.is_empty() {
        log::warn!("No PDF files found in {}", input_dir.display());
        return Ok(BatchSummary::default());
    }
    log::info!("Found {} PDF file(s)", pdfs.len());

    let progress = if show_progress {
        progress_bar(pdfs.len() as u64)?
    } else {
        ProgressBar::hidden()
    };

    let mut summary = BatchSummary::default();
    for path in pdfs {
        progress.set_message(display_name(&path));

        let report = process_one(&path, output_dir, config);
        match &report.status {
            DocumentStatus::Failed(reason) => progress.suspend(|| {
                log::warn!("Error processing {}: {reason}", display_name(&path));
            }),
            DocumentStatus::WriteError(reason) => progress.suspend(|| {
                log::error!("Cannot write {}: {reason}", report.output.display());
            }),
            _ => {}
        }

        progress.inc(1);
        summary.reports.push(report);
    }
    progress.finish_and_clear();

    Ok(summary)
}

/// `*.pdf` files directly inside `dir`, sorted by file name. An unreadable
/// directory yields no files.
pub fn list_pdfs(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot read {}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut pdfs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "pdf"))
        .collect();
    pdfs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    pdfs
}

/// `<output_dir>/<stem>.json`
pub fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    output_dir.join(format!("{stem}.json"))
}

/// Extract and analyze one PDF. Panics inside the parser are reported as
/// errors so they only affect this document.
pub fn process_document(path: &Path, config: &ExtractionConfig) -> Result<DocumentAnalysis> {
    let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf::extract_file(path, config.page_limit)
    }))
    .map_err(|_| eyre!("PDF parser panicked"))?;

    let raw_pages = extracted.map_err(|e| eyre!(e))?;
    Ok(analyze(raw_pages, config))
}

fn process_one(path: &Path, output_dir: &Path, config: &ExtractionConfig) -> DocumentReport {
    log::debug!("Processing {}", path.display());
    let output = output_path(output_dir, path);

    let (record, status) = match process_document(path, config) {
        Ok(analysis) => {
            log_analysis(&analysis);
            let status = if analysis.selection.winner().is_some() {
                DocumentStatus::Titled
            } else {
                DocumentStatus::Untitled
            };
            (analysis.record, status)
        }
        Err(e) => (OutputRecord::fallback(), DocumentStatus::Failed(f!("{e:#}"))),
    };

    let status = match write_record(&output, &record) {
        Ok(()) => status,
        Err(e) => DocumentStatus::WriteError(f!("{e:#}")),
    };

    DocumentReport {
        input: path.to_path_buf(),
        output,
        record,
        status,
    }
}

/// Validate and write a record as two-space indented JSON. An invalid
/// record is replaced by the fallback before writing.
pub fn write_record(path: &Path, record: &OutputRecord) -> Result<()> {
    let fallback;
    let record = match record.validate() {
        Ok(()) => record,
        Err(e) => {
            log::warn!("Discarding invalid record for {}: {e}", path.display());
            fallback = OutputRecord::fallback();
            &fallback
        }
    };

    let json = serde_json::to_string_pretty(record)?;
    fs::write(path, json).wrap_err_with(|| f!("writing {}", path.display()))?;
    Ok(())
}

fn log_analysis(analysis: &DocumentAnalysis) {
    log::debug!("Extracted title: '{}'", analysis.record.title);

    log::debug!("Top {LOGGED_CANDIDATES} title candidates:");
    for (i, candidate) in analysis
        .selection
        .candidates
        .iter()
        .take(LOGGED_CANDIDATES)
        .enumerate()
    {
        log::debug!(
            "  {}. '{}' (score {}, page {}, font {:.1}, bold {})",
            i + 1,
            truncate_text(&candidate.text, 60),
            candidate.score,
            candidate.page,
            candidate.font_size,
            candidate.is_bold
        );
    }

    if let Some(first) = analysis.pages.first() {
        log::debug!("First {LOGGED_ELEMENTS} elements (page {}):", first.number());
        for (i, element) in first.elements.iter().take(LOGGED_ELEMENTS).enumerate() {
            log::debug!(
                "  {}. '{}' (font {:.1}, bold {}, y {:.2})",
                i + 1,
                truncate_text(&element.text, 40),
                element.font_size,
                element.is_bold,
                element.y_position
            );
        }
    }
}

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let progress = ProgressBar::new(len);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    progress.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(progress)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_summary(summary: &BatchSummary) {
    for report in &summary.reports {
        let name = display_name(&report.input);
        match &report.status {
            DocumentStatus::Titled => println!(
                "{} {} {}",
                "✓".green().bold(),
                name,
                f!("'{}'", truncate_text(&report.record.title, 60)).dimmed()
            ),
            DocumentStatus::Untitled => println!(
                "{} {} {}",
                "✓".yellow().bold(),
                name,
                "no title candidate".dimmed()
            ),
            DocumentStatus::Failed(reason) => println!(
                "{} {} {}",
                "✓".yellow().bold(),
                name,
                f!("fallback record ({reason})").dimmed()
            ),
            DocumentStatus::WriteError(reason) => {
                println!("{} {} {}", "✗".red().bold(), name, reason.red())
            }
        }
    }

    println!(
        "\n{} {} titled, {} untitled, {} fallback, {} not written",
        "Summary:".bold(),
        summary.titled(),
        summary.untitled(),
        summary.failed(),
        summary.write_failures()
    );
}
