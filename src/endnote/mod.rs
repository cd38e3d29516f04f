//! EndNote XML library serialization.
//!
//! Produces the `<xml><records>...</records></xml>` document shape understood
//! by EndNote and other reference managers. Absent fields are omitted
//! entirely (no internal sentinel ever reaches the output), text content is
//! escaped by the XML writer, and the file sink writes atomically via a
//! temporary file so an I/O error never leaves a partially-written library
//! behind.

use std::io::Write as _;
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::record::{OutcomeRecord, RecordStatus};

/// EndNote numeric code for the "Journal Article" reference type.
const REF_TYPE_JOURNAL_ARTICLE: &str = "17";

/// Errors from serializing or writing the library file.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("XML serialization failed: {0}")]
    Xml(String),
    #[error("I/O error writing library: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializes records into an EndNote XML document.
///
/// Always yields a well-formed document; an empty record set produces a
/// valid empty shell. One `<record>` element is emitted per input record in
/// order, carrying whichever bibliographic fields are present.
///
/// # Errors
///
/// Returns [`WriteError::Xml`] when the writer fails (not expected for
/// in-memory output, but the contract keeps the sink honest).
pub fn serialize(records: &[OutcomeRecord]) -> Result<String, WriteError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    start(&mut writer, "xml")?;
    start(&mut writer, "records")?;

    for record in records {
        write_record(&mut writer, record)?;
    }

    end(&mut writer, "records")?;
    end(&mut writer, "xml")?;

    let bytes = writer.into_inner();
    String::from_utf8(bytes).map_err(|error| WriteError::Xml(error.to_string()))
}

/// Serializes records and writes them to `path` atomically.
///
/// The document is first written to a temporary file in the destination
/// directory, then renamed over the target: either the target ends up with
/// complete, valid content or it is left untouched.
///
/// # Errors
///
/// Returns [`WriteError`] on serialization failure or any I/O error.
#[instrument(skip(records), fields(path = %path.display(), records = records.len()))]
pub fn write_library(records: &[OutcomeRecord], path: &Path) -> Result<(), WriteError> {
    let xml = serialize(records)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(xml.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|error| WriteError::Io(error.error))?;

    info!("library written");
    Ok(())
}

fn write_record(writer: &mut Writer<Vec<u8>>, record: &OutcomeRecord) -> Result<(), WriteError> {
    start(writer, "record")?;

    let mut ref_type = BytesStart::new("ref-type");
    ref_type.push_attribute(("name", "Journal Article"));
    writer
        .write_event(Event::Start(ref_type))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Text(BytesText::new(REF_TYPE_JOURNAL_ARTICLE)))
        .map_err(xml_err)?;
    end(writer, "ref-type")?;

    if let Some(authors) = &record.authors {
        start(writer, "contributors")?;
        start(writer, "authors")?;
        for author in authors.split(';').map(str::trim).filter(|a| !a.is_empty()) {
            text_element(writer, "author", author)?;
        }
        end(writer, "authors")?;
        end(writer, "contributors")?;
    }

    if let Some(title) = &record.title {
        start(writer, "titles")?;
        text_element(writer, "title", title)?;
        end(writer, "titles")?;
    }

    if let Some(journal) = &record.journal {
        start(writer, "periodical")?;
        text_element(writer, "full-title", journal)?;
        end(writer, "periodical")?;
    }

    if let Some(year) = record.year {
        start(writer, "dates")?;
        text_element(writer, "year", &year.to_string())?;
        end(writer, "dates")?;
    }

    if let Some(doi) = &record.doi {
        text_element(writer, "electronic-resource-num", doi)?;
    }

    // Traceability back to the scanned file, and status for failed entries.
    text_element(writer, "custom1", &record.file_path().display().to_string())?;
    if record.status != RecordStatus::Success {
        text_element(writer, "custom2", &record.status.to_string())?;
    }

    end(writer, "record")?;
    debug!(path = %record.file_path().display(), "record serialized");
    Ok(())
}

fn start(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), WriteError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_err)
}

fn end(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), WriteError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)
}

/// Writes `<name>text</name>` with the text content escaped.
fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), WriteError> {
    start(writer, name)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_err)?;
    end(writer, name)
}

fn xml_err(error: impl std::fmt::Display) -> WriteError {
    WriteError::Xml(error.to_string())
}
