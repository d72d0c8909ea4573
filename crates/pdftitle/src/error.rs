#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("Cannot create output directory {path}: {reason}")]
    OutputDir { path: String, reason: String },

    #[error("{path} does not satisfy the output schema: {reason}")]
    InvalidRecord { path: String, reason: String },

    #[error("{0} output file(s) could not be written")]
    WriteFailures(usize),
}
