//! Integration tests for appending documents.

use std::collections::BTreeSet;

use pdf_folio::geometry::PageSize;
use pdf_folio::model::{Bookmark, BookmarkMode, Document, FormElement};
use pdf_folio::Error;

fn document(pages: usize, bookmarks: &[&str], fields: &[&str]) -> Document {
    let mut doc = Document::new();
    for i in 0..pages {
        doc.new_page(PageSize::A4).draw_text(format!("page {}", i + 1), 72.0, 770.0);
    }
    for title in bookmarks {
        let page = doc.pages()[0].id();
        doc.bookmarks_mut().push(Bookmark::to_page(*title, page));
    }
    for name in fields {
        doc.form_mut().add_element(*name, FormElement::text()).unwrap();
    }
    doc
}

fn titles(doc: &Document) -> Vec<String> {
    doc.bookmarks().iter().map(|b| b.title.clone()).collect()
}

#[test]
fn test_disjoint_documents_concatenate() {
    let mut first = document(2, &["Intro", "Summary"], &["Name"]);
    let second = document(3, &["Appendix A", "Appendix B"], &["Address"]);

    let appended = first.concatenate(second, BookmarkMode::Flatten).unwrap();
    assert_eq!(appended, 3);
    assert_eq!(first.pages().len(), 5);
    assert_eq!(titles(&first), vec!["Intro", "Summary", "Appendix A", "Appendix B"]);
    assert_eq!(first.form().len(), 2);
    assert!(first.validate().is_ok());

    // Bookmarks of the appended document point at its pages in the result.
    let target = first.bookmarks()[2].action.as_ref().and_then(|a| a.target_page());
    assert_eq!(target, Some(first.pages()[2].id()));
}

#[test]
fn test_nested_bookmarks() {
    let mut first = document(1, &["Intro"], &[]);
    let second = document(2, &["Results", "Discussion"], &[]);
    first
        .concatenate(second, BookmarkMode::Nested("second.folio".into()))
        .unwrap();

    assert_eq!(titles(&first), vec!["Intro", "second.folio"]);
    let nested = &first.bookmarks()[1];
    let children: Vec<&str> = nested.children.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(children, vec!["Results", "Discussion"]);
}

#[test]
fn test_name_collision_leaves_first_untouched() {
    let mut first = document(1, &["Intro"], &["Name", "Email"]);
    let second = document(1, &["Other"], &["Name", "Phone"]);
    let before = first.clone();

    match first.concatenate(second, BookmarkMode::Flatten) {
        Err(Error::NameCollision(names)) => {
            let expected: BTreeSet<String> = ["Name".to_string()].into_iter().collect();
            assert_eq!(names, expected);
        },
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(first, before);
}
