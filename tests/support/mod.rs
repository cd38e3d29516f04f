//! Shared utilities for integration tests (PDF fixtures, Crossref mock bodies).
//!
//! Test PDFs are built with lopdf rather than checked in as binaries, so each
//! fixture states exactly what its text layer and Info dictionary contain.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

/// Builds a one-page PDF whose text layer contains `body_text`, optionally
/// carrying an Info dictionary Subject entry.
pub fn build_pdf(path: &Path, body_text: &str, subject: Option<&str>) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![50.into(), 600.into()]),
            Operation::new("Tj", vec![Object::string_literal(body_text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("encode content stream"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(subject) = subject {
        let info_id = doc.add_object(dictionary! {
            "Subject" => Object::string_literal(subject),
        });
        doc.trailer.set("Info", info_id);
    }

    doc.save(path).expect("save test PDF");
}

/// Crossref works response body with the given fields, in the shape the real
/// API returns (`status: ok`, array-valued title/container-title).
#[allow(dead_code)]
pub fn crossref_body(title: &str, family: &str, given: &str, year: i32, journal: &str) -> String {
    format!(
        r#"{{
            "status": "ok",
            "message": {{
                "title": ["{title}"],
                "author": [{{"family": "{family}", "given": "{given}"}}],
                "container-title": ["{journal}"],
                "published": {{"date-parts": [[{year}, 1, 1]]}}
            }}
        }}"#
    )
}
