//! Converter error types

use crate::state_machine::Direction;
use std::path::PathBuf;
use thiserror::Error;

/// Failure inside a conversion engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Word document error: {0}")]
    Docx(#[from] docx_rs::ReaderError),
    #[error("failed to write Word package: {0}")]
    Package(String),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error("unsupported document: {0}")]
    Unsupported(String),
}

/// The three ways a conversion can fail
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Precondition: the input was gone before the engine started
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Postcondition: the engine returned normally but wrote nothing
    #[error("conversion finished but output is missing: {}", .0.display())]
    OutputMissing(PathBuf),

    #[error("{direction} conversion failed: {source}")]
    ConversionFailed {
        direction: Direction,
        source: EngineError,
    },
}
