//! Word (OOXML) reading and writing
//!
//! Only body-level paragraph text is read. Tables, text boxes and
//! formatting are not carried over.

use super::EngineError;
use docx_rs::{
    read_docx, BreakType, DocumentChild, Docx, Paragraph, ParagraphChild, Run, RunChild,
};
use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

/// Compound file signature of legacy binary `.doc` files
const OLE_SIGNATURE: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];

/// Read the paragraphs of a `.docx` file in document order.
///
/// Empty paragraphs are kept; callers decide what to skip.
pub fn read_paragraphs(path: &Path) -> Result<Vec<String>, EngineError> {
    let bytes = std::fs::read(path)?;
    if bytes.starts_with(&OLE_SIGNATURE) {
        return Err(EngineError::Unsupported(
            "legacy binary .doc format".to_string(),
        ));
    }

    let docx = read_docx(&bytes)?;
    Ok(docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(paragraph) => Some(paragraph_text(paragraph)),
            _ => None,
        })
        .collect())
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        let ParagraphChild::Run(run) = child else {
            continue;
        };
        for item in &run.children {
            match item {
                RunChild::Text(t) => text.push_str(&unescape(&t.text)),
                RunChild::Tab(_) => text.push('\t'),
                RunChild::Break(_) => text.push('\n'),
                _ => {}
            }
        }
    }
    text
}

/// Run text may come back entity-escaped; a bare `&` means it was not
fn unescape(text: &str) -> String {
    quick_xml::escape::unescape(text).map_or_else(|_| text.to_string(), Cow::into_owned)
}

/// Write a `.docx` with one plain paragraph per entry
pub fn write_document(path: &Path, paragraphs: &[String]) -> Result<(), EngineError> {
    let docx = paragraphs
        .iter()
        .fold(Docx::new(), |docx, text| docx.add_paragraph(paragraph(text)));

    docx.build()
        .pack(File::create(path)?)
        .map_err(|e| EngineError::Package(e.to_string()))
}

/// Tabs and line breaks become their own run elements
fn paragraph(text: &str) -> Paragraph {
    if text.is_empty() {
        return Paragraph::new();
    }
    let mut run = Run::new();
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        for (column, cell) in line.split('\t').enumerate() {
            if column > 0 {
                run = run.add_tab();
            }
            if !cell.is_empty() {
                run = run.add_text(cell);
            }
        }
    }
    Paragraph::new().add_run(run)
}
