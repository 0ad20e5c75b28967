//! Plain-text extraction for uploaded documents (DOCX, PDF, plain text).
//!
//! The blob store supplies bytes and the object key; this module picks a
//! content type from the key's extension and returns UTF-8 text.
//!
//! DOCX rendering follows the usual docx-to-text convention, which the
//! paragraph splitter relies on: every `w:p` contributes `"\n\n"` before
//! its runs, `w:br`/`w:cr` become `\n` and `w:tab` becomes `\t`. An empty
//! Word paragraph between two paragraphs therefore shows up as a run of
//! newlines containing the `"\n\n\n"` paragraph delimiter.
//!
//! Header parts (`word/header<N>.xml`) are rendered before the body and
//! footer parts (`word/footer<N>.xml`) after it, in archive order. The
//! combined text is trimmed, so the first paragraph carries no leading
//! blank lines.

use std::io::Read;

use quick_xml::events::Event;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug)]
pub enum ExtractError {
    UnsupportedContentType(String),
    Pdf(String),
    Ooxml(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedContentType(ct) => {
                write!(f, "unsupported content-type: {}", ct)
            }
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Ooxml(e) => write!(f, "OOXML extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Detect a content type from an object key's extension.
///
/// | Extension | Content type |
/// |-----------|--------------|
/// | `.docx` | DOCX |
/// | `.pdf` | `application/pdf` |
/// | `.md` | `text/markdown` |
/// | other | `text/plain` |
pub fn content_type_for_key(key: &str) -> &'static str {
    let ext = key
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("docx") => MIME_DOCX,
        Some("pdf") => MIME_PDF,
        Some("md") => MIME_MARKDOWN,
        _ => MIME_TEXT,
    }
}

/// Extracts plain text from document bytes.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    match content_type {
        MIME_DOCX => extract_docx(bytes),
        MIME_PDF => extract_pdf(bytes),
        ct if ct.starts_with("text/") => Ok(String::from_utf8_lossy(bytes).into_owned()),
        _ => Err(ExtractError::UnsupportedContentType(
            content_type.to_string(),
        )),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if archive.index_for_name("word/document.xml").is_none() {
        return Err(ExtractError::Ooxml(
            "word/document.xml not found".to_string(),
        ));
    }

    let names: Vec<String> = (0..archive.len())
        .filter_map(|i| archive.name_for_index(i).map(str::to_string))
        .collect();
    let headers = names.iter().filter(|n| is_numbered_part(n, "word/header"));
    let footers = names.iter().filter(|n| is_numbered_part(n, "word/footer"));

    let mut out = String::new();
    for name in headers
        .map(String::as_str)
        .chain(std::iter::once("word/document.xml"))
        .chain(footers.map(String::as_str))
    {
        let xml = read_entry(&mut archive, name)?;
        out.push_str(&render_document_xml(&xml)?);
    }
    Ok(out.trim().to_string())
}

/// `word/header.xml`, `word/header1.xml`, ... for `prefix = "word/header"`.
fn is_numbered_part(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(".xml"))
        .is_some_and(|n| n.bytes().all(|b| b.is_ascii_digit()))
}

fn read_entry(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(format!("{}: {}", name, e)))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Ooxml(format!("{} exceeds size limit", name)));
    }
    Ok(xml)
}

/// Render WordprocessingML body text.
fn render_document_xml(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => out.push_str("\n\n"),
                b"w:t" => in_text = true,
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:p" => out.push_str("\n\n"),
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"w:t" {
                    in_text = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    fn docx(body: &str) -> Vec<u8> {
        docx_with_parts(&[], body, &[])
    }

    /// Header parts are written before the body, footer parts after it.
    fn docx_with_parts(headers: &[(&str, &str)], body: &str, footers: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();
            for (name, para) in headers {
                zip.start_file(*name, options).unwrap();
                let xml = format!(
                    "<w:hdr xmlns:w=\"{}\"><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:hdr>",
                    W_NS, para
                );
                zip.write_all(xml.as_bytes()).unwrap();
            }
            zip.start_file("word/document.xml", options).unwrap();
            let xml = format!(
                "<?xml version=\"1.0\"?><w:document xmlns:w=\"{}\"><w:body>{}</w:body></w:document>",
                W_NS, body
            );
            zip.write_all(xml.as_bytes()).unwrap();
            for (name, para) in footers {
                zip.start_file(*name, options).unwrap();
                let xml = format!(
                    "<w:ftr xmlns:w=\"{}\"><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:ftr>",
                    W_NS, para
                );
                zip.write_all(xml.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn unsupported_content_type_returns_error() {
        let err = extract_text(b"foo", "application/octet-stream").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedContentType(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf", MIME_PDF).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn invalid_zip_returns_error_for_docx() {
        let err = extract_text(b"not a zip", MIME_DOCX).unwrap_err();
        assert!(matches!(err, ExtractError::Ooxml(_)));
    }

    #[test]
    fn plain_text_passes_through() {
        let text = extract_text("one\n\n\ntwo".as_bytes(), MIME_TEXT).unwrap();
        assert_eq!(text, "one\n\n\ntwo");
    }

    #[test]
    fn docx_paragraphs_are_separated_by_blank_lines() {
        let bytes = docx(
            "<w:p><w:r><w:t>First</w:t></w:r></w:p><w:p/><w:p><w:r><w:t xml:space=\"preserve\">Second </w:t><w:t>part</w:t></w:r></w:p>",
        );
        let text = extract_text(&bytes, MIME_DOCX).unwrap();
        assert_eq!(text, "First\n\n\n\nSecond part");
    }

    #[test]
    fn docx_breaks_and_tabs() {
        let bytes = docx(
            "<w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c &amp; d</w:t></w:r></w:p>",
        );
        let text = extract_text(&bytes, MIME_DOCX).unwrap();
        assert_eq!(text, "a\tb\nc & d");
    }

    #[test]
    fn docx_headers_lead_and_footers_trail() {
        let bytes = docx_with_parts(
            &[("word/header1.xml", "Campaign 2016")],
            "<w:p><w:r><w:t>First</w:t></w:r></w:p><w:p/><w:p><w:r><w:t>Second</w:t></w:r></w:p>",
            &[("word/footer1.xml", "Page 1"), ("word/footnotes.xml", "ignored")],
        );
        let text = extract_text(&bytes, MIME_DOCX).unwrap();
        assert_eq!(text, "Campaign 2016\n\nFirst\n\n\n\nSecond\n\nPage 1");
    }

    #[test]
    fn numbered_parts() {
        assert!(is_numbered_part("word/header1.xml", "word/header"));
        assert!(is_numbered_part("word/header.xml", "word/header"));
        assert!(is_numbered_part("word/footer12.xml", "word/footer"));
        assert!(!is_numbered_part("word/footnotes.xml", "word/footer"));
        assert!(!is_numbered_part("word/header1.xml.rels", "word/header"));
    }

    #[test]
    fn docx_without_document_xml_is_an_error() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = extract_text(&buf, MIME_DOCX).unwrap_err();
        assert!(err.to_string().contains("word/document.xml not found"));
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for_key("speeches/rally.DOCX"), MIME_DOCX);
        assert_eq!(content_type_for_key("a.pdf"), MIME_PDF);
        assert_eq!(content_type_for_key("notes.md"), MIME_MARKDOWN);
        assert_eq!(content_type_for_key("dir.v2/README"), MIME_TEXT);
    }
}
