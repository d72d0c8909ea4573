use std::path::PathBuf;

use colored::Colorize;
use pdftitle_core::score::breakdown;
use pdftitle_core::{DocumentAnalysis, ScoredCandidate, TextElement};

use crate::batch::process_document;
use crate::options::ExtractionArgs;
use crate::prelude::{println, *};

/// Elements of the first page shown below the candidate table.
const SAMPLE_ELEMENTS: usize = 10;

#[derive(Debug, clap::Args, Clone)]
pub struct InspectOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Number of candidates to show
    #[arg(short, long, default_value = "5")]
    pub top: usize,

    /// Show which signals produced each candidate's score
    #[arg(long)]
    pub explain: bool,

    /// Output the full analysis as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub extraction: ExtractionArgs,
}

pub fn run(options: InspectOptions, global: crate::Global) -> Result<()> {
    let config = options.extraction.config();
    if global.verbose {
        println!(
            "Inspecting {} ({} variant, page limit {:?})",
            options.path.display(),
            config.variant,
            config.page_limit
        );
    }

    let analysis = process_document(&options.path, &config)
        .wrap_err_with(|| f!("Failed to inspect {}", options.path.display()))?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!("{}", format_analysis(&analysis, &options));
    Ok(())
}

/// The element a candidate was scored from.
fn candidate_element<'a>(
    analysis: &'a DocumentAnalysis,
    candidate: &ScoredCandidate,
) -> Option<&'a TextElement> {
    analysis
        .pages
        .get(candidate.page.checked_sub(1)?)?
        .elements
        .get(candidate.index)
}

fn yes_or_blank(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        ""
    }
}

fn format_analysis(analysis: &DocumentAnalysis, options: &InspectOptions) -> String {
    let mut result = String::new();

    result.push_str(&f!(
        "{} {}\n",
        "Title:".bold(),
        analysis.record.title.bright_white().bold()
    ));
    result.push_str(&f!(
        "{} {} page(s), {} element(s), {} candidate(s)\n",
        "Scanned:".bold(),
        analysis.pages.len(),
        analysis.element_count(),
        analysis.selection.candidates.len()
    ));

    let candidates: Vec<&ScoredCandidate> = analysis
        .selection
        .candidates
        .iter()
        .take(options.top)
        .collect();

    if candidates.is_empty() {
        result.push_str(&f!("\n{}\n", "No element scored above zero.".yellow()));
    } else {
        result.push_str(&f!("\n{}\n", "Candidates".cyan().bold()));
        let mut table = new_table();
        table.add_row(prettytable::row![
            "#", "Score", "Page", "Font", "Bold", "Position", "Text"
        ]);
        for (i, candidate) in candidates.iter().enumerate() {
            let bold = yes_or_blank(candidate.is_bold);
            table.add_row(prettytable::row![
                i + 1,
                candidate.score.to_string().green(),
                candidate.page,
                f!("{:.1}", candidate.font_size),
                bold,
                f!("({:.2}, {:.2})", candidate.position.x, candidate.position.y),
                truncate_text(&candidate.text, 60)
            ]);
        }
        result.push_str(&table.to_string());
    }

    if options.explain {
        for (i, candidate) in candidates.iter().enumerate() {
            let Some(element) = candidate_element(analysis, candidate) else {
                continue;
            };
            result.push_str(&f!(
                "\n{} {}\n",
                f!("#{}", i + 1).yellow().bold(),
                truncate_text(&candidate.text, 60)
            ));
            let mut table = new_table();
            for (signal, points) in breakdown(element, candidate.page - 1) {
                table.add_row(prettytable::row![signal, f!("{points:+}")]);
            }
            table.add_row(prettytable::row!["total".bold(), candidate.score]);
            result.push_str(&table.to_string());
        }
    }

    if let Some(first) = analysis.pages.first() {
        result.push_str(&f!(
            "\n{}\n",
            f!("First {SAMPLE_ELEMENTS} elements (page {})", first.number())
                .cyan()
                .bold()
        ));
        let mut table = new_table();
        table.add_row(prettytable::row!["#", "Font", "Bold", "Italic", "x", "y", "Text"]);
        for (i, element) in first.elements.iter().take(SAMPLE_ELEMENTS).enumerate() {
            let bold = yes_or_blank(element.is_bold);
            let italic = yes_or_blank(element.is_italic);
            table.add_row(prettytable::row![
                i + 1,
                f!("{:.1}", element.font_size),
                bold,
                italic,
                f!("{:.2}", element.x_position),
                f!("{:.2}", element.y_position),
                truncate_text(&element.text, 40)
            ]);
        }
        result.push_str(&table.to_string());
    }

    if !analysis.record.outline.is_empty() {
        result.push_str(&f!("\n{}\n", "Outline".cyan().bold()));
        let mut table = new_table();
        for entry in &analysis.record.outline {
            table.add_row(prettytable::row![entry.level, entry.page, entry.text]);
        }
        result.push_str(&table.to_string());
    }

    result
}
