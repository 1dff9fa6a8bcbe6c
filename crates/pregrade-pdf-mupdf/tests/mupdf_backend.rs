use std::sync::Arc;

use pregrade_core::extraction::{DEFAULT_DPI, TextExtractor};
use pregrade_core::text_pdf::{lines_per_page, write_text_pdf};
use pregrade_core::{BackendError, DocumentBackend, NoOcr};
use pregrade_pdf_mupdf::MupdfBackend;

fn sample_pdf(dir: &std::path::Path, text: &str) -> std::path::PathBuf {
    let path = dir.join("sample.pdf");
    write_text_pdf(&path, text).unwrap();
    path
}

#[test]
fn reads_text_layer_per_page() {
    let dir = tempfile::tempdir().unwrap();
    let mut text = String::from("Problem 1: integrate x dx from 0 to 1");
    for i in 0..lines_per_page() {
        text.push_str(&format!("\nfiller line {}", i));
    }
    text.push_str("\nProblem 2: last page content");
    let path = sample_pdf(dir.path(), &text);

    let mut doc = MupdfBackend::new().open(&path).unwrap();
    assert_eq!(doc.page_count(), 2);
    assert!(doc.page_text(0).unwrap().contains("Problem 1: integrate x dx"));
    assert!(doc.page_text(1).unwrap().contains("Problem 2: last page content"));
    assert!(matches!(
        doc.page_text(2),
        Err(BackendError::PageOutOfRange { index: 2, count: 2 })
    ));
}

#[test]
fn renders_pages_as_png() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_pdf(dir.path(), "x^2 + y^2 = 1");

    let mut doc = MupdfBackend::new().open(&path).unwrap();
    let png = doc.render_page(0, 72).unwrap();
    assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
}

#[test]
fn non_pdf_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.pdf");
    std::fs::write(&path, b"definitely not a pdf").unwrap();
    assert!(MupdfBackend::new().open(&path).is_err());
}

#[test]
fn extractor_reads_generated_pdf_without_ocr() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_pdf(dir.path(), "Show that the sum of two even numbers is even.");
    let extractor = TextExtractor::new(Arc::new(MupdfBackend::new()), Arc::new(NoOcr));

    let result = extractor.extract_document(&path, Some(15), DEFAULT_DPI);
    assert_eq!(result.total_pages, 1);
    assert_eq!(result.ocr_pages_used, 0);
    assert!(result.text.contains("--- PAGE 1/1 ---"));
    assert!(result.text.contains("sum of two even numbers"));
}
