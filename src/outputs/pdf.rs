//! PDF rendering of a [`ReportDocument`].
//!
//! Rendering happens in two steps. [`paginate`] typesets the document onto
//! A4 pages as a list of positioned [`DrawOp`]s (greedy word wrap, widths
//! estimated from an average glyph width). [`render_pdf`] then replays the
//! operations with `printpdf` using the built-in Helvetica faces.
//!
//! Coordinates are millimetres from the bottom-left corner of the page.

use super::report::{Block, ReportDocument, Span, Style};
use crate::error::ReportError;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rgb,
};
use tracing::{info, instrument};

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_X: f32 = 20.0;
const TOP: f32 = PAGE_HEIGHT - 20.0;
const BOTTOM: f32 = 20.0;
const FOOTER_Y: f32 = 10.0;
const PT_TO_MM: f32 = 0.3528;
const LINE_SPACING: f32 = 1.45;

const BODY_SIZE: f32 = 10.5;
const SOURCE_SIZE: f32 = 9.0;

const PURPLE: Colour = Colour::new(0.302, 0.149, 0.549);
const ORANGE: Colour = Colour::new(0.988, 0.651, 0.161);
const TEXT: Colour = Colour::new(0.15, 0.15, 0.15);
const MUTED: Colour = Colour::new(0.42, 0.42, 0.42);
const LINK: Colour = Colour::new(0.10, 0.30, 0.65);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl Face {
    fn for_style(style: &Style) -> Face {
        match (style.bold || style.highlight, style.italic) {
            (false, false) => Face::Regular,
            (true, false) => Face::Bold,
            (false, true) => Face::Italic,
            (true, true) => Face::BoldItalic,
        }
    }

    fn glyph_factor(&self) -> f32 {
        match self {
            Face::Regular | Face::Italic => 0.52,
            Face::Bold | Face::BoldItalic => 0.57,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Colour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Colour {
    const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    fn to_pdf(self) -> Color {
        Color::Rgb(Rgb::new(self.r, self.g, self.b, None))
    }
}

/// One positioned drawing instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        face: Face,
        colour: Colour,
        text: String,
    },
    Line {
        x1: f32,
        x2: f32,
        y: f32,
        thickness: f32,
        colour: Colour,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub ops: Vec<DrawOp>,
}

/// Estimated width in millimetres of `text` set in `face` at `size` points.
pub fn text_width(text: &str, size: f32, face: Face) -> f32 {
    text.chars().count() as f32 * size * face.glyph_factor() * PT_TO_MM
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * LINE_SPACING
}

struct Word<'a> {
    text: &'a str,
    style: Style,
    space_before: bool,
}

struct Typesetter {
    pages: Vec<PageLayout>,
    y: f32,
}

impl Typesetter {
    fn new() -> Self {
        Self {
            pages: vec![PageLayout::default()],
            y: TOP,
        }
    }

    fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    /// Baseline of the next line, breaking the page when it would not fit.
    fn next_line(&mut self, height: f32) -> f32 {
        if self.y - height < BOTTOM {
            self.pages.push(PageLayout::default());
            self.y = TOP;
        }
        self.y -= height;
        self.y
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn text_line(&mut self, text: &str, size: f32, face: Face, colour: Colour) {
        let y = self.next_line(line_height(size));
        self.push(DrawOp::Text {
            x: MARGIN_X,
            y,
            size,
            face,
            colour,
            text: text.to_string(),
        });
    }

    fn heading(&mut self, title: &str) {
        self.gap(4.0);
        // keep the heading together with its first line of body text
        if self.y - line_height(14.0) - line_height(BODY_SIZE) < BOTTOM {
            self.pages.push(PageLayout::default());
            self.y = TOP;
        }
        self.text_line(title, 14.0, Face::Bold, PURPLE);
        let y = self.y - 1.5;
        self.push(DrawOp::Line {
            x1: MARGIN_X,
            x2: PAGE_WIDTH - MARGIN_X,
            y,
            thickness: 0.8,
            colour: ORANGE,
        });
        self.gap(2.5);
    }

    fn rule(&mut self) {
        let y = self.next_line(line_height(BODY_SIZE)) + 1.2;
        self.push(DrawOp::Line {
            x1: MARGIN_X,
            x2: PAGE_WIDTH - MARGIN_X,
            y,
            thickness: 0.4,
            colour: MUTED,
        });
    }

    /// Greedy word wrap of styled spans.
    fn spans(&mut self, spans: &[Span], size: f32, base_colour: Colour, indent: f32) {
        let left = MARGIN_X + indent;
        let right = PAGE_WIDTH - MARGIN_X;
        let height = line_height(size);
        let space = size * 0.28 * PT_TO_MM;

        let mut y = self.next_line(height);
        let mut x = left;
        for word in split_words(spans) {
            let face = Face::for_style(&word.style);
            for (n, piece) in break_long_word(word.text, size, face, right - left).into_iter().enumerate() {
                let width = text_width(piece, size, face);
                let mut gap = if n == 0 && word.space_before && x > left { space } else { 0.0 };
                if x + gap + width > right && x > left {
                    y = self.next_line(height);
                    x = left;
                    gap = 0.0;
                }
                let start = x + gap;
                let colour = if word.style.highlight { ORANGE } else { base_colour };
                self.push(DrawOp::Text {
                    x: start,
                    y,
                    size,
                    face,
                    colour,
                    text: piece.to_string(),
                });
                if word.style.underline {
                    self.push(DrawOp::Line {
                        x1: start,
                        x2: start + width,
                        y: y - 0.7,
                        thickness: 0.3,
                        colour,
                    });
                }
                if word.style.strike {
                    self.push(DrawOp::Line {
                        x1: start,
                        x2: start + width,
                        y: y + size * PT_TO_MM * 0.3,
                        thickness: 0.3,
                        colour,
                    });
                }
                x = start + width;
            }
        }
        self.gap(1.2);
    }

    fn finish(mut self, title: &str) -> Vec<PageLayout> {
        let total = self.pages.len();
        for (i, page) in self.pages.iter_mut().enumerate() {
            page.ops.push(DrawOp::Text {
                x: MARGIN_X,
                y: FOOTER_Y,
                size: 8.0,
                face: Face::Regular,
                colour: MUTED,
                text: title.to_string(),
            });
            let label = format!("Página {} de {}", i + 1, total);
            page.ops.push(DrawOp::Text {
                x: PAGE_WIDTH - MARGIN_X - text_width(&label, 8.0, Face::Regular),
                y: FOOTER_Y,
                size: 8.0,
                face: Face::Regular,
                colour: MUTED,
                text: label,
            });
        }
        self.pages
    }
}

fn split_words(spans: &[Span]) -> Vec<Word<'_>> {
    let mut words = Vec::new();
    let mut pending_space = false;
    for span in spans {
        let mut rest = span.text.as_str();
        loop {
            let trimmed = rest.trim_start();
            if trimmed.len() != rest.len() {
                pending_space = true;
            }
            if trimmed.is_empty() {
                break;
            }
            let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
            words.push(Word {
                text: &trimmed[..end],
                style: span.style,
                space_before: pending_space,
            });
            pending_space = false;
            rest = &trimmed[end..];
        }
    }
    words
}

/// Split a word wider than `max_width` into pieces that fit on a line.
fn break_long_word(word: &str, size: f32, face: Face, max_width: f32) -> Vec<&str> {
    let per_char = text_width("x", size, face);
    let max_chars = ((max_width / per_char).floor() as usize).max(1);
    if word.chars().count() <= max_chars {
        return vec![word];
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (count, (idx, _)) in word.char_indices().enumerate() {
        if count > 0 && count % max_chars == 0 {
            pieces.push(&word[start..idx]);
            start = idx;
        }
    }
    pieces.push(&word[start..]);
    pieces
}

/// Typeset `doc` onto A4 pages.
pub fn paginate(doc: &ReportDocument) -> Vec<PageLayout> {
    let mut ts = Typesetter::new();
    ts.text_line(&doc.title, 22.0, Face::Bold, PURPLE);
    ts.gap(1.0);
    for line in &doc.header {
        ts.text_line(line, 9.5, Face::Regular, MUTED);
    }
    ts.gap(2.0);

    for section in &doc.sections {
        ts.heading(&section.title);
        for block in &section.blocks {
            match block {
                Block::Paragraph(spans) => ts.spans(spans, BODY_SIZE, TEXT, 0.0),
                Block::Rule => ts.rule(),
                Block::Source { index, url } => {
                    let spans = [
                        Span {
                            text: format!("{index}. "),
                            style: Style {
                                bold: true,
                                ..Style::default()
                            },
                        },
                        Span {
                            text: url.clone(),
                            style: Style::default(),
                        },
                    ];
                    ts.spans(&spans, SOURCE_SIZE, LINK, 4.0)
                }
            }
        }
    }
    ts.finish(&doc.title)
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    bold_italic: IndirectFontRef,
}

impl Fonts {
    fn get(&self, face: Face) -> &IndirectFontRef {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Italic => &self.italic,
            Face::BoldItalic => &self.bold_italic,
        }
    }
}

fn draw(layer: &PdfLayerReference, fonts: &Fonts, op: &DrawOp) {
    match op {
        DrawOp::Text {
            x,
            y,
            size,
            face,
            colour,
            text,
        } => {
            layer.set_fill_color(colour.to_pdf());
            layer.use_text(text.as_str(), *size, Mm(*x), Mm(*y), fonts.get(*face));
        }
        DrawOp::Line {
            x1,
            x2,
            y,
            thickness,
            colour,
        } => {
            layer.set_outline_color(colour.to_pdf());
            layer.set_outline_thickness(*thickness);
            layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(*x1), Mm(*y)), false),
                    (Point::new(Mm(*x2), Mm(*y)), false),
                ],
                is_closed: false,
            });
        }
    }
}

/// Render `doc` to PDF bytes.
#[instrument(level = "info", skip_all)]
pub fn render_pdf(doc: &ReportDocument) -> Result<Vec<u8>, ReportError> {
    let pages = paginate(doc);
    let (pdf, first_page, first_layer) =
        PdfDocument::new(doc.title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Camada 1");
    let fonts = Fonts {
        regular: pdf.add_builtin_font(BuiltinFont::Helvetica).map_err(|e| ReportError::Pdf(e.to_string()))?,
        bold: pdf.add_builtin_font(BuiltinFont::HelveticaBold).map_err(|e| ReportError::Pdf(e.to_string()))?,
        italic: pdf.add_builtin_font(BuiltinFont::HelveticaOblique).map_err(|e| ReportError::Pdf(e.to_string()))?,
        bold_italic: pdf
            .add_builtin_font(BuiltinFont::HelveticaBoldOblique)
            .map_err(|e| ReportError::Pdf(e.to_string()))?,
    };

    for (i, page) in pages.iter().enumerate() {
        let layer = if i == 0 {
            pdf.get_page(first_page).get_layer(first_layer)
        } else {
            let (p, l) = pdf.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Camada {}", i + 1));
            pdf.get_page(p).get_layer(l)
        };
        for op in &page.ops {
            draw(&layer, &fonts, op);
        }
    }

    let bytes = pdf.save_to_bytes().map_err(|e| ReportError::Pdf(e.to_string()))?;
    info!(pages = pages.len(), bytes = bytes.len(), "Rendered PDF report");
    Ok(bytes)
}
