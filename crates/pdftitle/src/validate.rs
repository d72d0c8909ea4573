use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;
use pdftitle_core::OutputRecord;

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct ValidateOptions {
    /// JSON output files to check against the record schema
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

pub fn run(options: ValidateOptions, global: crate::Global) -> Result<()> {
    let mut invalid = 0;

    for path in &options.files {
        match validate_file(path) {
            Ok(record) => {
                println!(
                    "{} {} {}",
                    "✓".green().bold(),
                    path.display(),
                    f!("({} outline entries)", record.outline.len()).dimmed()
                );
                if global.verbose {
                    println!("    title: {}", record.title);
                }
            }
            Err(e) => {
                invalid += 1;
                println!("{} {}", "✗".red().bold(), e);
            }
        }
    }

    if invalid > 0 {
        return Err(eyre!(
            "{invalid} of {} file(s) failed validation",
            options.files.len()
        ));
    }

    Ok(())
}

/// Read and strictly parse one output file.
pub fn validate_file(path: &Path) -> Result<OutputRecord, Error> {
    let invalid = |reason: String| Error::InvalidRecord {
        path: path.display().to_string(),
        reason,
    };

    let json = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    OutputRecord::parse(&json).map_err(|e| invalid(e.to_string()))
}
