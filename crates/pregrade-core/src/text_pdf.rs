//! Plain-text PDF rendering for generated solutions.
//!
//! Letter pages, Courier 11pt, 36pt margins. Lines are wrapped at
//! [`WRAP_COLUMNS`] and characters outside printable ASCII become `?`.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::ExtractionResult;
use crate::extraction::page_block;

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const MARGIN: f32 = 36.0;
pub const FONT_SIZE: f32 = 11.0;
pub const LINE_HEIGHT: f32 = FONT_SIZE * 1.35;
pub const WRAP_COLUMNS: usize = 80;

/// Lines that fit between the top and bottom margins.
pub fn lines_per_page() -> usize {
    ((PAGE_HEIGHT - 2.0 * MARGIN) / LINE_HEIGHT).floor() as usize
}

fn sanitize(line: &str) -> String {
    line.chars()
        .map(|c| match c {
            '\t' => ' ',
            ' '..='~' => c,
            _ => '?',
        })
        .collect()
}

/// Wrap one line at word boundaries. Leading indentation (capped at half
/// the width) is kept on every wrapped piece.
fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let body = line.trim_start_matches(' ');
    let indent = (line.len() - body.len()).min(width / 2);
    let pad = " ".repeat(indent);
    wrap_words(body, width - indent)
        .into_iter()
        .map(|piece| format!("{}{}", pad, piece))
        .collect()
}

/// Greedy word wrap, hard-splitting words longer than `width`.
fn wrap_words(line: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for word in line.split(' ') {
        let mut word = word.to_string();
        while word.len() > width {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            out.push(word);
            word = rest;
        }
        let needed = if current.is_empty() {
            word.len()
        } else {
            current.len() + 1 + word.len()
        };
        if needed > width {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    out.push(current);
    out
}

/// Split `text` into pages of wrapped, ASCII-only lines. Always returns at
/// least one page.
pub fn paginate(text: &str) -> Vec<Vec<String>> {
    let lines: Vec<String> = text
        .lines()
        .flat_map(|line| wrap_line(sanitize(line).trim_end(), WRAP_COLUMNS))
        .collect();
    if lines.is_empty() {
        return vec![Vec::new()];
    }
    lines
        .chunks(lines_per_page())
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// The same text laid out page by page, with the positional headers the
/// extractor would produce for the rendered PDF.
pub fn paginated_text(text: &str) -> ExtractionResult {
    let pages = paginate(text);
    let total = pages.len();
    let text = pages
        .iter()
        .enumerate()
        .map(|(i, lines)| page_block(i + 1, total, lines.join("\n").trim()))
        .collect();
    ExtractionResult {
        text,
        total_pages: total,
        ocr_pages_used: 0,
    }
}

/// Render `text` to a PDF at `path`.
pub fn write_text_pdf(path: &Path, text: &str) -> Result<(), lopdf::Error> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in paginate(text) {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("TL", vec![LINE_HEIGHT.into()]),
            Operation::new(
                "Td",
                vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN - FONT_SIZE).into()],
            ),
        ];
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                operations.push(Operation::new("T*", vec![]));
            }
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(line.as_str())],
            ));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let media_box: Vec<Object> = vec![
        0.into(),
        0.into(),
        PAGE_WIDTH.into(),
        PAGE_HEIGHT.into(),
    ];
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_lines_wrap_at_column_limit() {
        let line = "word ".repeat(40);
        let pages = paginate(&line);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].len() > 1);
        assert!(pages[0].iter().all(|l| l.len() <= WRAP_COLUMNS));
    }

    #[test]
    fn unbroken_words_are_hard_split() {
        let pages = paginate(&"x".repeat(200));
        assert_eq!(pages[0], vec!["x".repeat(80), "x".repeat(80), "x".repeat(40)]);
    }

    #[test]
    fn indentation_is_kept() {
        let pages = paginate("Steps:\n    1. x = 2\n\t a. y = 4");
        assert_eq!(pages[0], vec!["Steps:", "    1. x = 2", "  a. y = 4"]);
    }

    #[test]
    fn wrapped_indented_lines_stay_indented() {
        let line = format!("    {}", "term ".repeat(30));
        let pages = paginate(&line);
        assert!(pages[0].len() > 1);
        assert!(pages[0].iter().all(|l| l.starts_with("    ") && l.len() <= WRAP_COLUMNS));
    }

    #[test]
    fn non_ascii_becomes_question_mark() {
        let pages = paginate("∫ f(x) dx = π");
        assert_eq!(pages[0][0], "? f(x) dx = ?");
    }

    #[test]
    fn text_splits_across_pages() {
        let per_page = lines_per_page();
        let text = (0..per_page + 3)
            .map(|i| format!("Step {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let pages = paginate(&text);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].len(), 3);

        let result = paginated_text(&text);
        assert_eq!(result.total_pages, 2);
        assert_eq!(result.ocr_pages_used, 0);
        assert!(result.text.contains("--- PAGE 2/2 ---"));
    }

    #[test]
    fn empty_text_still_has_one_page() {
        assert_eq!(paginate("").len(), 1);
        assert_eq!(paginated_text("").total_pages, 1);
    }

    #[test]
    fn writes_a_loadable_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solution.pdf");
        write_text_pdf(&path, "Problem 1\n1. Let x = 2.\n2. Then x + 1 = 3.").unwrap();

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }
}
