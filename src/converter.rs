//! Document conversion between Word and PDF
//!
//! `FileConverter` owns the working directory and enforces the pre- and
//! postconditions of a conversion; the engine behind it does the actual
//! format work and is not trusted to report its own success.

pub(crate) mod docx;
mod error;
pub(crate) mod pdf;

pub use error::{ConversionError, EngineError};

use crate::state_machine::Direction;
use std::path::{Path, PathBuf};

/// Converts a file at a path into a file at a new path
pub trait DocumentConverter: Send + Sync {
    /// Directory where outputs (and request inputs) live
    fn work_dir(&self) -> &Path;

    /// Where the output for `input` will be written: the input stem with the
    /// direction's extension, inside the working directory
    fn output_path(&self, direction: Direction, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map_or_else(|| "converted".into(), |s| s.to_string_lossy());
        self.work_dir()
            .join(format!("{stem}.{}", direction.output_extension()))
    }

    /// Run a conversion. Blocks the calling thread.
    fn convert(&self, direction: Direction, input: &Path) -> Result<PathBuf, ConversionError>;
}

/// The format work behind a converter
pub trait ConversionEngine: Send + Sync {
    fn word_to_pdf(&self, input: &Path, output: &Path) -> Result<(), EngineError>;
    fn pdf_to_word(&self, input: &Path, output: &Path) -> Result<(), EngineError>;
}

/// Engine built on the in-crate OOXML reader/writer and PDF renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

impl ConversionEngine for NativeEngine {
    fn word_to_pdf(&self, input: &Path, output: &Path) -> Result<(), EngineError> {
        tracing::debug!(input = %input.display(), "Opening Word document");
        let paragraphs = docx::read_paragraphs(input)?;
        let pages = pdf::render_paragraphs(&paragraphs, output)?;
        tracing::debug!(paragraphs = paragraphs.len(), pages, "Rendered PDF");
        Ok(())
    }

    fn pdf_to_word(&self, input: &Path, output: &Path) -> Result<(), EngineError> {
        tracing::debug!(input = %input.display(), "Opening PDF document");
        let paragraphs = pdf::recover_paragraphs(input)?;
        docx::write_document(output, &paragraphs)?;
        tracing::debug!(paragraphs = paragraphs.len(), "Wrote Word document");
        Ok(())
    }
}

/// Production converter
#[derive(Debug)]
pub struct FileConverter<E = NativeEngine> {
    work_dir: PathBuf,
    engine: E,
}

impl FileConverter<NativeEngine> {
    /// Create a converter over `work_dir`, creating the directory if absent
    pub fn new(work_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        Self::with_engine(work_dir, NativeEngine)
    }
}

impl<E: ConversionEngine> FileConverter<E> {
    pub fn with_engine(work_dir: impl Into<PathBuf>, engine: E) -> std::io::Result<Self> {
        let work_dir = work_dir.into();
        create_work_dir(&work_dir).inspect_err(|e| {
            tracing::error!(
                path = %work_dir.display(),
                error = %e,
                "Failed to create working directory"
            );
        })?;
        tracing::info!(path = %work_dir.display(), "Working directory ready");
        Ok(Self { work_dir, engine })
    }
}

#[cfg(unix)]
fn create_work_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(path)
}

#[cfg(not(unix))]
fn create_work_dir(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}

impl<E: ConversionEngine> DocumentConverter for FileConverter<E> {
    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn convert(&self, direction: Direction, input: &Path) -> Result<PathBuf, ConversionError> {
        tracing::info!(%direction, input = %input.display(), "Starting conversion");

        if !input.exists() {
            tracing::error!(%direction, input = %input.display(), "Input file not found");
            return Err(ConversionError::InputNotFound(input.to_path_buf()));
        }

        let output = self.output_path(direction, input);
        let result = match direction {
            Direction::WordToPdf => self.engine.word_to_pdf(input, &output),
            Direction::PdfToWord => self.engine.pdf_to_word(input, &output),
        };

        if let Err(source) = result {
            let input_size = std::fs::metadata(input).ok().map(|m| m.len());
            tracing::error!(
                %direction,
                input = %input.display(),
                input_size,
                error = %source,
                "Conversion engine failed"
            );
            return Err(ConversionError::ConversionFailed { direction, source });
        }

        if !output.exists() {
            tracing::error!(
                %direction,
                output = %output.display(),
                "Conversion completed but output file not found"
            );
            return Err(ConversionError::OutputMissing(output));
        }

        tracing::info!(%direction, output = %output.display(), "Conversion complete");
        Ok(output)
    }
}
