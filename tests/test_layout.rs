//! Integration tests for the text layout engine.

use pdf_folio::geometry::PageSize;
use pdf_folio::layout::{FragmentContent, LayoutBox, Line};
use pdf_folio::model::Document;
use pdf_folio::style::{Style, TextAlign};
use proptest::prelude::*;

const PARAGRAPH: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod \
    tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis nostrud \
    exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. Duis aute irure dolor \
    in reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla pariatur. Excepteur \
    sint occaecat cupidatat non proident, sunt in culpa qui officia deserunt mollit anim id est \
    laborum. ";

fn words(line: &Line) -> Vec<String> {
    line.fragments
        .iter()
        .map(|f| match &f.content {
            FragmentContent::Text(t) => t.clone(),
            FragmentContent::Box(id) => format!("{:?}", id),
        })
        .collect()
}

fn long_paragraph() -> String {
    // At least 1500 characters.
    let mut text = String::new();
    while text.len() < 1500 {
        text.push_str(PARAGRAPH);
    }
    text.push('\n');
    text
}

/// Lay out four long paragraphs and split the box into 700pt pieces
/// until nothing remains. Returns the height of each piece.
fn paginate() -> Vec<f32> {
    let style = Style::new().with_align(TextAlign::Justify);
    let mut lbox = LayoutBox::new(200.0);
    for _ in 0..4 {
        lbox.add_text(&long_paragraph(), &style, None);
    }
    lbox.flush();

    let mut heights = Vec::new();
    for _ in 0..1000 {
        if lbox.height().unwrap() == 0.0 {
            break;
        }
        let rest = lbox.split_at(700.0).unwrap();
        let head = lbox.height().unwrap();
        assert!(head <= 700.0 + 1e-3);
        assert!(head > 0.0, "split made no progress");
        heights.push(head);
        lbox = rest;
    }
    assert_eq!(lbox.height().unwrap(), 0.0);
    heights
}

#[test]
fn test_four_paragraphs_paginate_deterministically() {
    // 204 lines of 14.4pt: four pieces of 48 lines and a last one of 12.
    let expected = [691.2, 691.2, 691.2, 691.2, 172.8];
    let first = paginate();
    assert_eq!(first.len(), expected.len(), "heights {:?}", first);
    for (got, want) in first.iter().zip(expected) {
        assert!((got - want).abs() < 0.01, "heights {:?}", first);
    }
    assert_eq!(first, paginate());
}

#[test]
fn test_paginated_flow_draws_onto_pages() {
    let style = Style::new().with_align(TextAlign::Justify);
    let mut lbox = LayoutBox::new(200.0);
    lbox.add_text(&long_paragraph(), &style, None);
    lbox.flush();

    let mut doc = Document::new();
    loop {
        let rest = lbox.split_at(300.0).unwrap();
        let page = doc.new_page(PageSize::A5);
        lbox.draw(page, 72.0, 520.0).unwrap();
        if rest.is_empty() {
            break;
        }
        lbox = rest;
    }
    assert!(doc.pages().len() > 1);
    assert!(doc.validate().is_ok());
}

#[test]
fn test_split_before_flush_is_rejected() {
    let mut lbox = LayoutBox::new(200.0);
    lbox.add_text("pending text", &Style::new(), None);
    assert!(lbox.split_at(10.0).is_err());
}

proptest! {
    #[test]
    fn split_preserves_height_and_lines(
        word_count in 1usize..200,
        width in 60.0f32..400.0,
        cut in 0.05f32..0.95,
        justify in any::<bool>(),
    ) {
        let align = if justify { TextAlign::Justify } else { TextAlign::Left };
        let text: String = (0..word_count).map(|i| format!("w{} ", i * 7919 % 1000)).collect();
        let mut lbox = LayoutBox::new(width);
        lbox.add_text(&text, &Style::new().with_align(align), None);
        lbox.flush();

        let total = lbox.height().unwrap();
        let original: Vec<Vec<String>> = lbox.lines().iter().map(words).collect();
        let h = total * cut;

        let rest = lbox.split_at(h).unwrap();
        let head = lbox.height().unwrap();
        prop_assert!(head <= h + 1e-3);
        prop_assert!((head + rest.height().unwrap() - total).abs() < 1e-2);

        let rejoined: Vec<Vec<String>> = lbox.lines().iter().chain(rest.lines()).map(words).collect();
        prop_assert_eq!(rejoined, original);
    }
}
