//! PDF text rendering and text recovery
//!
//! Rendering lays paragraphs out as left-aligned Helvetica text on A4 pages
//! with automatic page breaks. Each paragraph is one text object (`BT`/`ET`)
//! per page it touches; wrapped lines keep the space they were broken at, so
//! a text object whose text ends in whitespace continues into the next one.
//! Recovery relies on that to rebuild paragraphs.

use super::EngineError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;

const MM: f32 = 72.0 / 25.4;
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const LEFT_MARGIN: f32 = 10.0 * MM;
const TOP_MARGIN: f32 = 10.0 * MM;
/// Distance from the bottom edge that triggers a page break
const BREAK_MARGIN: f32 = 15.0 * MM;
const TEXT_WIDTH: f32 = 190.0 * MM;
const LINE_HEIGHT: f32 = 10.0 * MM;
const FONT_SIZE: f32 = 12.0;
const FONT_NAME: &str = "F1";

/// Kerning adjustment in a `TJ` array treated as a word gap
const TJ_SPACE_THRESHOLD: i64 = -200;

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

/// Width used for characters outside printable ASCII
const FALLBACK_WIDTH: u16 = 667;

// ============================================================================
// Rendering
// ============================================================================

/// Render paragraphs into a PDF at `output`, skipping blank ones.
///
/// Returns the number of pages written.
pub fn render_paragraphs(paragraphs: &[String], output: &Path) -> Result<usize, EngineError> {
    let pages = layout(paragraphs);
    let count = pages.len();
    write_pdf(pages, output)?;
    Ok(count)
}

/// Lay paragraphs out into per-page content operations
fn layout(paragraphs: &[String]) -> Vec<Vec<Operation>> {
    let mut pages = Vec::new();
    let mut ops = Vec::new();
    // Distance from the top edge to the top of the next line
    let mut cursor = TOP_MARGIN;

    for paragraph in paragraphs.iter().filter(|p| !p.trim().is_empty()) {
        let mut in_block = false;
        for line in wrap_paragraph(paragraph.trim_end(), TEXT_WIDTH) {
            if cursor + LINE_HEIGHT > PAGE_HEIGHT - BREAK_MARGIN {
                if in_block {
                    ops.push(Operation::new("ET", vec![]));
                    in_block = false;
                }
                pages.push(std::mem::take(&mut ops));
                cursor = TOP_MARGIN;
            }
            if !in_block {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![Object::Name(FONT_NAME.into()), Object::from(FONT_SIZE)],
                ));
                in_block = true;
            }
            // Baseline sits vertically centred in the line cell
            let baseline = PAGE_HEIGHT - (cursor + LINE_HEIGHT / 2.0 + 0.3 * FONT_SIZE);
            ops.push(Operation::new(
                "Tm",
                vec![
                    Object::from(1.0_f32),
                    Object::from(0.0_f32),
                    Object::from(0.0_f32),
                    Object::from(1.0_f32),
                    Object::from(LEFT_MARGIN),
                    Object::from(baseline),
                ],
            ));
            ops.push(Operation::new(
                "Tj",
                vec![Object::string_literal(encode_win_ansi(&line))],
            ));
            cursor += LINE_HEIGHT;
        }
        if in_block {
            ops.push(Operation::new("ET", vec![]));
        }
    }

    if !ops.is_empty() || pages.is_empty() {
        pages.push(ops);
    }
    pages
}

fn write_pdf(pages: Vec<Vec<Operation>>, output: &Path) -> Result<(), EngineError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_NAME => font_id,
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = i64::try_from(kids.len())
        .map_err(|_| EngineError::Malformed("too many pages".to_string()))?;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::from(0.0_f32),
                Object::from(0.0_f32),
                Object::from(PAGE_WIDTH),
                Object::from(PAGE_HEIGHT),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save(output)?;
    Ok(())
}

/// Encode to WinAnsi. Characters outside Latin-1 (and the C1 range, which
/// WinAnsi repurposes) become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            code @ (0x20..=0x7E | 0xA0..=0xFF) => u8::try_from(code).unwrap_or(b'?'),
            _ => b'?',
        })
        .collect()
}

fn char_width(c: char) -> f32 {
    let units = match c {
        ' '..='~' => HELVETICA_WIDTHS[c as usize - 0x20],
        _ => FALLBACK_WIDTH,
    };
    f32::from(units) * FONT_SIZE / 1000.0
}

fn text_width(text: &str) -> f32 {
    text.chars().map(char_width).sum()
}

/// Break a paragraph into lines no wider than `max_width` points.
///
/// Explicit line breaks start a new line; every line but the last ends in
/// whitespace.
fn wrap_paragraph(text: &str, max_width: f32) -> Vec<String> {
    let segments: Vec<String> = text
        .split('\n')
        .map(|s| s.replace('\r', "").replace('\t', "    "))
        .collect();
    let last = segments.len().saturating_sub(1);
    let mut lines = Vec::new();

    for (index, segment) in segments.iter().enumerate() {
        let mut segment_lines = wrap_segment(segment, max_width);
        if index != last {
            if let Some(line) = segment_lines.last_mut() {
                if !line.ends_with(' ') {
                    line.push(' ');
                }
            }
        }
        lines.extend(segment_lines);
    }
    lines
}

fn wrap_segment(text: &str, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut width = 0.0;

    for token in text.split_inclusive(' ') {
        let word_width = text_width(token.trim_end_matches(' '));
        if !line.is_empty() && width + word_width > max_width {
            lines.push(std::mem::take(&mut line));
            width = 0.0;
        }

        if word_width > max_width {
            // Over-long word: split at character boundaries. Each piece but
            // the last ends in a space so the word stays one paragraph.
            for c in token.chars() {
                let w = char_width(c);
                if !line.is_empty() && c != ' ' && width + w > max_width {
                    if !line.ends_with(' ') {
                        line.push(' ');
                    }
                    lines.push(std::mem::take(&mut line));
                    width = 0.0;
                }
                line.push(c);
                width += w;
            }
            continue;
        }

        line.push_str(token);
        width += text_width(token);
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

// ============================================================================
// Recovery
// ============================================================================

/// Recover paragraph text from every page of the PDF at `input`
pub fn recover_paragraphs(input: &Path) -> Result<Vec<String>, EngineError> {
    let doc = Document::load(input)?;
    let pages = doc.get_pages();
    tracing::debug!(
        first_page = pages.keys().next().copied(),
        last_page = pages.keys().next_back().copied(),
        "Recovering text over full page range"
    );

    let mut collector = ParagraphCollector::default();
    for page_id in pages.into_values() {
        let content = Content::decode(&doc.get_page_content(page_id)?)?;
        collector.feed(&content.operations);
    }
    Ok(collector.finish())
}

/// Rebuilds paragraphs from text-showing operators
#[derive(Debug, Default)]
struct ParagraphCollector {
    paragraphs: Vec<String>,
    /// Paragraph continued from earlier text objects
    pending: String,
    /// Text of the open `BT`/`ET` object
    block: Option<String>,
}

impl ParagraphCollector {
    fn feed(&mut self, operations: &[Operation]) {
        for op in operations {
            match op.operator.as_str() {
                "BT" => self.block = Some(String::new()),
                "ET" => {
                    if let Some(block) = self.block.take() {
                        self.end_block(&block);
                    }
                }
                "Td" | "TD" | "T*" | "Tm" => self.line_break(),
                "Tj" => self.show(op.operands.first()),
                "'" => {
                    self.line_break();
                    self.show(op.operands.first());
                }
                "\"" => {
                    self.line_break();
                    self.show(op.operands.get(2));
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = op.operands.first() {
                        for item in items {
                            match item {
                                Object::String(..) => self.show(Some(item)),
                                Object::Integer(n) if *n < TJ_SPACE_THRESHOLD => {
                                    self.push_space();
                                }
                                Object::Real(r) if f64::from(*r) < -200.0 => {
                                    self.push_space();
                                }
                                _ => {}
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn show(&mut self, operand: Option<&Object>) {
        if let (Some(block), Some(Object::String(bytes, _))) = (self.block.as_mut(), operand) {
            // Latin-1 view of the single-byte encoding written by the renderer
            block.extend(bytes.iter().map(|&b| char::from(b)));
        }
    }

    fn push_space(&mut self) {
        if let Some(block) = self.block.as_mut() {
            if !block.is_empty() && !block.ends_with(char::is_whitespace) {
                block.push(' ');
            }
        }
    }

    fn line_break(&mut self) {
        if let Some(block) = self.block.as_mut() {
            if !block.is_empty() && !block.ends_with(char::is_whitespace) && !block.ends_with('-') {
                block.push(' ');
            }
        }
    }

    fn end_block(&mut self, block: &str) {
        self.pending.push_str(block);
        if !self.pending.ends_with(char::is_whitespace) {
            self.flush();
        }
    }

    fn flush(&mut self) {
        let text = self.pending.trim();
        if !text.is_empty() {
            self.paragraphs.push(text.to_string());
        }
        self.pending.clear();
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.paragraphs
    }
}
