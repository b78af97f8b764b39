//! Text-only PDF output using `printpdf` 0.8.
//!
//! Text is laid out top to bottom on A4 pages. Line wrapping uses estimated
//! glyph widths (CJK characters count as one em, everything else a bit over
//! half), which is close enough for body text.

use std::fs;

use printpdf::{
    BuiltinFont, FontId, Mm, Op, ParsedFont, PdfDocument, PdfPage, PdfSaveOptions,
    PdfWarnMsg, Point, Pt, TextItem,
};

use crate::{fonts::FontChoice, prelude::*};

/// A4, in millimetres.
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;

/// One inch on every side.
const MARGIN_PT: f32 = 72.0;

const BODY_SIZE_PT: f32 = 12.0;
const TITLE_SIZE_PT: f32 = 18.0;

/// Baseline-to-baseline distance, relative to font size (14pt for 12pt text).
const LEADING: f32 = 14.0 / 12.0;

/// Extra space before each paragraph, and after the title.
const PARAGRAPH_GAP_PT: f32 = 7.2;
const TITLE_GAP_PT: f32 = 18.0;

/// Estimated advance of a non-CJK character, in ems.
const NARROW_EM: f32 = 0.55;

/// A line of text waiting to be placed.
#[derive(Debug, Clone, PartialEq)]
struct Line {
    text: String,
    size: f32,
    space_before: f32,
}

/// A line with a position on a page.
#[derive(Debug, Clone, PartialEq)]
struct PlacedLine {
    text: String,
    size: f32,
    y: f32,
}

/// The font we are drawing with.
enum PdfFont<'a> {
    Builtin,
    Embedded { id: FontId, parsed: &'a ParsedFont },
}

impl PdfFont<'_> {
    /// Map a character to something this font can draw, or `None` to drop it.
    fn drawable(&self, c: char) -> Option<char> {
        if c == '\t' {
            return Some(' ');
        }
        if c.is_control() {
            return None;
        }
        let covered = match self {
            // Helvetica is only reliable for Latin-1.
            PdfFont::Builtin => (' '..='~').contains(&c) || ('\u{a0}'..='\u{ff}').contains(&c),
            PdfFont::Embedded { parsed, .. } => parsed.lookup_glyph_index(c as u32).is_some(),
        };
        Some(if covered { c } else { '?' })
    }

    fn sanitize(&self, text: &str) -> String {
        text.chars().filter_map(|c| self.drawable(c)).collect()
    }

    fn push_text(&self, ops: &mut Vec<Op>, line: PlacedLine) {
        ops.push(Op::StartTextSection);
        ops.push(Op::SetTextCursor {
            pos: Point {
                x: Pt(MARGIN_PT),
                y: Pt(line.y),
            },
        });
        let items = vec![TextItem::Text(line.text)];
        match self {
            PdfFont::Builtin => {
                ops.push(Op::SetFontSizeBuiltinFont {
                    size: Pt(line.size),
                    font: BuiltinFont::Helvetica,
                });
                ops.push(Op::WriteTextBuiltinFont {
                    items,
                    font: BuiltinFont::Helvetica,
                });
            }
            PdfFont::Embedded { id, .. } => {
                ops.push(Op::SetFontSize {
                    size: Pt(line.size),
                    font: id.clone(),
                });
                ops.push(Op::WriteText {
                    items,
                    font: id.clone(),
                });
            }
        }
        ops.push(Op::EndTextSection);
    }
}

/// Render `text` under a `title` heading as PDF bytes.
///
/// Characters the font cannot draw are replaced with `?` rather than failing.
#[instrument(level = "debug", skip_all, fields(text_len = text.len()))]
pub fn render_pdf(title: &str, text: &str, font: &FontChoice) -> Vec<u8> {
    let mut doc = PdfDocument::new(title);
    let pdf_font = match font {
        FontChoice::Loaded { font, .. } => PdfFont::Embedded {
            id: doc.add_font(font),
            parsed: font,
        },
        FontChoice::Builtin => PdfFont::Builtin,
    };

    let page_w = Mm(PAGE_WIDTH_MM);
    let page_h = Mm(PAGE_HEIGHT_MM);
    let max_width = page_w.into_pt().0 - 2.0 * MARGIN_PT;
    let lines = layout_lines(
        &pdf_font.sanitize(title),
        &pdf_font.sanitize(text),
        max_width,
    );
    let pages = paginate(lines, page_h.into_pt().0)
        .into_iter()
        .map(|placed| {
            let mut ops = vec![];
            for line in placed {
                pdf_font.push_text(&mut ops, line);
            }
            PdfPage::new(page_w, page_h, ops)
        })
        .collect::<Vec<_>>();
    debug!(pages = pages.len(), "PDF layout complete");
    doc.with_pages(pages);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        debug!(count = warnings.len(), "PDF generation produced warnings");
    }
    bytes
}

/// Render and write a PDF.
pub fn write_pdf(path: &Path, title: &str, text: &str, font: &FontChoice) -> Result<()> {
    let bytes = render_pdf(title, text, font);
    fs::write(path, bytes).with_context(|| format!("cannot write {:?}", path))
}

/// Break the title and body into wrapped lines.
fn layout_lines(title: &str, text: &str, max_width: f32) -> Vec<Line> {
    let mut lines = vec![];
    for line in wrap(title, TITLE_SIZE_PT, max_width) {
        lines.push(Line {
            text: line,
            size: TITLE_SIZE_PT,
            space_before: 0.0,
        });
    }

    let mut gap = TITLE_GAP_PT;
    for paragraph in text.split("\n\n").filter(|p| !p.trim().is_empty()) {
        let mut space_before = gap;
        for raw in paragraph.trim_matches('\n').lines() {
            for line in wrap(raw, BODY_SIZE_PT, max_width) {
                lines.push(Line {
                    text: line,
                    size: BODY_SIZE_PT,
                    space_before,
                });
                space_before = 0.0;
            }
        }
        gap = PARAGRAPH_GAP_PT;
    }
    lines
}

/// Assign lines to pages, starting a new page when the bottom margin is hit.
///
/// Always returns at least one page.
fn paginate(lines: Vec<Line>, page_height: f32) -> Vec<Vec<PlacedLine>> {
    let top = page_height - MARGIN_PT;
    let mut pages = vec![];
    let mut current: Vec<PlacedLine> = vec![];
    let mut y = top;
    for line in lines {
        let advance = line.size * LEADING;
        let mut next_y = y - line.space_before - advance;
        if next_y < MARGIN_PT && !current.is_empty() {
            pages.push(std::mem::take(&mut current));
            next_y = top - advance;
        }
        y = next_y;
        current.push(PlacedLine {
            text: line.text,
            size: line.size,
            y,
        });
    }
    if !current.is_empty() || pages.is_empty() {
        pages.push(current);
    }
    pages
}

/// Is this a full-width (CJK, Hangul, fullwidth form) character?
fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x3FFFD)
}

fn char_width(c: char, size: f32) -> f32 {
    if is_wide(c) { size } else { size * NARROW_EM }
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().map(|c| char_width(c, size)).sum()
}

/// Split a line into words, whitespace runs, and single wide characters, so
/// that CJK text can break between any two characters.
fn tokens(line: &str) -> Vec<&str> {
    let mut tokens = vec![];
    let mut start = 0;
    let mut prev: Option<char> = None;
    for (idx, c) in line.char_indices() {
        if let Some(p) = prev {
            let boundary =
                is_wide(c) || is_wide(p) || c.is_whitespace() != p.is_whitespace();
            if boundary {
                tokens.push(&line[start..idx]);
                start = idx;
            }
        }
        prev = Some(c);
    }
    if start < line.len() {
        tokens.push(&line[start..]);
    }
    tokens
}

/// Greedy line wrapping. Words wider than a whole line are split.
fn wrap(line: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = vec![];
    let mut current = String::new();
    let mut width = 0.0;
    for token in tokens(line) {
        if token.trim().is_empty() {
            if !current.is_empty() {
                current.push(' ');
                width += char_width(' ', size);
            }
            continue;
        }
        let token_width = text_width(token, size);
        if width + token_width > max_width && !current.trim().is_empty() {
            lines.push(current.trim_end().to_owned());
            current.clear();
            width = 0.0;
        }
        if token_width > max_width {
            for c in token.chars() {
                let w = char_width(c, size);
                if width + w > max_width && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    width = 0.0;
                }
                current.push(c);
                width += w;
            }
        } else {
            current.push_str(token);
            width += token_width;
        }
    }
    if !current.trim().is_empty() || lines.is_empty() {
        lines.push(current.trim_end().to_owned());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_font_renders_any_text() {
        let bytes = render_pdf(
            "OCR text version - 扫描.pdf",
            "Hello\n\n中文内容，😀 and ünïcödé\tend",
            &FontChoice::Builtin,
        );
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn embedded_font_renders_when_one_is_installed() {
        let mut candidates = crate::fonts::platform_candidates();
        candidates.push(PathBuf::from(
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        ));
        let locator = crate::fonts::FontLocator::new(candidates);
        let choice = locator.select();
        let FontChoice::Loaded { font, .. } = choice else {
            eprintln!("no usable system font installed, skipping");
            return;
        };

        let bytes = render_pdf("OCR text version - 扫描.pdf", "Hé 中 x\n\nend", choice);
        assert!(bytes.starts_with(b"%PDF"));

        let mut doc = PdfDocument::new("fonts");
        let pdf_font = PdfFont::Embedded {
            id: doc.add_font(font),
            parsed: font,
        };
        assert_eq!(pdf_font.sanitize("Hé\tx\u{7}"), "Hé x");
    }

    #[test]
    fn builtin_font_substitutes_uncovered_characters() {
        let font = PdfFont::Builtin;
        assert_eq!(font.sanitize("café 中\u{7}\tx"), "café ? x");
    }

    #[test]
    fn wraps_on_spaces() {
        let lines = wrap("aaaa bbbb cccc", 10.0, 30.0);
        assert_eq!(lines, ["aaaa", "bbbb", "cccc"]);
    }

    #[test]
    fn wraps_cjk_between_characters() {
        let lines = wrap("一二三四五", 10.0, 30.0);
        assert_eq!(lines, ["一二三", "四五"]);
    }

    #[test]
    fn splits_overlong_words() {
        let lines = wrap(&"x".repeat(20), 10.0, 30.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| text_width(l, 10.0) <= 30.0));
        assert_eq!(lines.concat(), "x".repeat(20));
    }

    #[test]
    fn long_text_spans_pages() {
        let text = (0..200)
            .map(|i| format!("Paragraph {i}"))
            .collect::<Vec<_>>()
            .join("\n\n");
        let lines = layout_lines("Title", &text, 400.0);
        let pages = paginate(lines, Mm(PAGE_HEIGHT_MM).into_pt().0);
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(page.iter().all(|l| l.y >= MARGIN_PT));
        }
    }

    #[test]
    fn empty_text_still_has_a_page() {
        assert_eq!(paginate(vec![], 800.0).len(), 1);
    }
}
