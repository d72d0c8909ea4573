//! Core library for pdftitle
//!
//! This crate implements the **Functional Core** of the pdftitle application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! The pdftitle project uses a three-crate architecture to enforce separation of concerns:
//!
//! - **`pdftitle_core`** (this crate): Pure transformation functions with zero I/O
//! - **`pdf`**: Text-span extraction from PDF bytes (the external collaborator)
//! - **`pdftitle`**: I/O operations and orchestration (the Imperative Shell)
//!
//! ## Functional Core Principles
//!
//! All functions in this crate adhere to these principles:
//!
//! - **Pure functions**: Same input always produces the same output
//! - **No side effects**: No I/O operations, no external state mutations
//! - **Deterministic**: Scores and candidate ordering are reproducible
//! - **Testable**: Can be tested with synthetic spans, no PDF required
//!
//! # Pipeline
//!
//! ```text
//! RawPage[]  ->  Page[]       ->  ScoredCandidate[]  ->  TitleSelection  ->  OutputRecord
//!   (span)       normalize         score + rank           select              outline
//! ```
//!
//! # Module Organization
//!
//! - [`span`]: The raw span contract produced by the extraction layer
//! - [`element`]: The Span Normalizer (page-relative [`element::TextElement`]s)
//! - [`score`]: The Title/Heading Scorer and its named signals
//! - [`rank`]: Candidate collection, ranking, and title selection
//! - [`outline`]: Output record, schema validation, and the heuristic outline
//! - [`config`]: Variant selection and extraction limits
//! - [`document`]: The end-to-end per-document analysis
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use pdftitle_core::{config::ExtractionConfig, document::analyze};
//!
//! let pages = pdf::extract_file(path, Some(3))?;
//! let analysis = analyze(pages, &ExtractionConfig::default());
//!
//! println!("{}", analysis.record.title);
//! ```

pub mod config;
pub mod document;
pub mod element;
pub mod outline;
pub mod rank;
pub mod score;
pub mod span;

pub use config::{ExtractionConfig, Variant};
pub use document::{analyze, DocumentAnalysis};
pub use element::{Page, TextElement};
pub use outline::{HeadingLevel, OutlineEntry, OutputRecord, RecordError};
pub use rank::{ScoredCandidate, TitleSelection, FALLBACK_TITLE};
pub use span::{BBox, RawPage, RawSpan};
