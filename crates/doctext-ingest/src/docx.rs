//! DOCX text extraction.
//!
//! A `.docx` file is a ZIP container; the body lives in `word/document.xml`.
//! The XML is walked SAX-style: body paragraphs are emitted in document order,
//! then the rows of each top-level table (cells separated by a space).
//! Headers, footers, comments and text boxes are not included.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::ExtractError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract the text of a `.docx` file.
pub fn extract_docx_text(path: &Path) -> Result<String, ExtractError> {
    let file = File::open(path)
        .map_err(|e| ExtractError::Docx(format!("cannot open {}: {}", path.display(), e)))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| ExtractError::Docx(format!("not a valid DOCX container: {}", e)))?;
    let part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractError::Docx(format!("{} not found: {}", DOCUMENT_PART, e)))?;

    parse_document_xml(BufReader::new(part))
}

/// Accumulates text for the top-level table currently being read.
#[derive(Default)]
struct TableState {
    rows: Vec<String>,
    cells: Vec<String>,
    cell_paragraphs: Vec<String>,
}

/// Walk `word/document.xml` and return its text.
pub fn parse_document_xml<R: BufRead>(reader: R) -> Result<String, ExtractError> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(false);

    let mut buf = Vec::with_capacity(4096);

    let mut paragraphs: Vec<String> = Vec::new();
    let mut table_rows: Vec<String> = Vec::new();
    let mut table = TableState::default();

    let mut table_depth: usize = 0;
    // >1 means a paragraph nested inside another one (text boxes)
    let mut paragraph_depth: usize = 0;
    let mut paragraph = String::new();
    let mut in_text = false;
    let mut properties_depth: usize = 0;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"tbl" => {
                    table_depth += 1;
                    if table_depth == 1 {
                        table = TableState::default();
                    }
                }
                b"tr" if table_depth == 1 => table.cells.clear(),
                b"tc" if table_depth == 1 => table.cell_paragraphs.clear(),
                b"p" => {
                    paragraph_depth += 1;
                    if paragraph_depth == 1 {
                        paragraph.clear();
                    }
                }
                b"pPr" | b"rPr" => properties_depth += 1,
                b"t" if paragraph_depth == 1 => in_text = true,
                _ => {}
            },

            Ok(Event::Empty(ref e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    // <w:p/>: an empty paragraph still occupies a line
                    b"p" if paragraph_depth == 0 => {
                        if table_depth == 0 {
                            paragraphs.push(String::new());
                        } else {
                            table.cell_paragraphs.push(String::new());
                        }
                    }
                    _ if paragraph_depth != 1 || properties_depth > 0 => {}
                    b"tab" => paragraph.push('\t'),
                    b"br" if is_line_break(e) => paragraph.push('\n'),
                    b"cr" => paragraph.push('\n'),
                    b"noBreakHyphen" => paragraph.push('-'),
                    _ => {}
                }
            }

            Ok(Event::Text(ref e)) => {
                if in_text {
                    let text = e
                        .unescape()
                        .map_err(|err| ExtractError::Docx(format!("bad text in {}: {}", DOCUMENT_PART, err)))?;
                    paragraph.push_str(&text);
                }
            }

            Ok(Event::CData(ref e)) => {
                if in_text {
                    paragraph.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }

            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"pPr" | b"rPr" => properties_depth = properties_depth.saturating_sub(1),
                b"p" => {
                    if paragraph_depth == 1 {
                        let finished = std::mem::take(&mut paragraph);
                        if table_depth == 0 {
                            paragraphs.push(finished);
                        } else {
                            table.cell_paragraphs.push(finished);
                        }
                    }
                    paragraph_depth = paragraph_depth.saturating_sub(1);
                }
                b"tc" if table_depth == 1 => {
                    let cell = table.cell_paragraphs.join("\n");
                    table.cells.push(cell);
                    table.cell_paragraphs.clear();
                }
                b"tr" if table_depth == 1 => {
                    let row = std::mem::take(&mut table.cells).join(" ");
                    table.rows.push(row);
                }
                b"tbl" => {
                    if table_depth == 1 {
                        table_rows.append(&mut table.rows);
                    }
                    table_depth = table_depth.saturating_sub(1);
                }
                _ => {}
            },

            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::Docx(format!(
                    "malformed {} at byte {}: {}",
                    DOCUMENT_PART,
                    xml.buffer_position(),
                    e
                )));
            }
            _ => {}
        }

        buf.clear();
    }

    let mut text = paragraphs.join("\n");
    if !table_rows.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&table_rows.join("\n"));
    }
    Ok(text)
}

/// `<w:br/>` is a line break unless typed as a page or column break.
fn is_line_break(e: &BytesStart<'_>) -> bool {
    !e.attributes().flatten().any(|attr| {
        attr.key.local_name().as_ref() == b"type"
            && matches!(attr.value.as_ref(), b"page" | b"column")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        )
    }

    fn parse(body: &str) -> String {
        parse_document_xml(wrap(body).as_bytes()).unwrap()
    }

    #[test]
    fn paragraphs_in_order() {
        let text = parse(
            "<w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Engineer</w:t></w:r></w:p>",
        );
        assert_eq!(text, "Jane Doe\nEngineer");
    }

    #[test]
    fn runs_are_concatenated() {
        let text = parse(
            "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Jane</w:t></w:r>\
             <w:r><w:t xml:space=\"preserve\"> Doe</w:t></w:r></w:p>",
        );
        assert_eq!(text, "Jane Doe");
    }

    #[test]
    fn entities_are_unescaped() {
        let text = parse("<w:p><w:r><w:t>R&amp;D &lt;lead&gt;</w:t></w:r></w:p>");
        assert_eq!(text, "R&D <lead>");
    }

    #[test]
    fn tabs_and_breaks() {
        let text = parse(
            "<w:p><w:pPr><w:tabs><w:tab w:val=\"left\" w:pos=\"720\"/></w:tabs></w:pPr>\
             <w:r><w:t>2020</w:t><w:tab/><w:t>Acme</w:t><w:br/><w:t>Rust</w:t>\
             <w:br w:type=\"page\"/></w:r></w:p>",
        );
        assert_eq!(text, "2020\tAcme\nRust");
    }

    #[test]
    fn empty_paragraphs_keep_their_line() {
        let text = parse(
            "<w:p><w:r><w:t>A</w:t></w:r></w:p><w:p/><w:p></w:p>\
             <w:p><w:r><w:t>B</w:t></w:r></w:p>",
        );
        assert_eq!(text, "A\n\n\nB");
    }

    #[test]
    fn tables_follow_body_paragraphs() {
        let text = parse(
            "<w:p><w:r><w:t>Skills</w:t></w:r></w:p>\
             <w:tbl><w:tr>\
               <w:tc><w:p><w:r><w:t>Rust</w:t></w:r></w:p></w:tc>\
               <w:tc><w:p><w:r><w:t>5 years</w:t></w:r></w:p></w:tc>\
             </w:tr><w:tr>\
               <w:tc><w:p><w:r><w:t>Go</w:t></w:r></w:p></w:tc>\
               <w:tc><w:p><w:r><w:t>2 years</w:t></w:r></w:p></w:tc>\
             </w:tr></w:tbl>\
             <w:p><w:r><w:t>References on request</w:t></w:r></w:p>",
        );
        assert_eq!(
            text,
            "Skills\nReferences on request\nRust 5 years\nGo 2 years"
        );
    }

    #[test]
    fn nested_table_text_stays_in_outer_cell() {
        let text = parse(
            "<w:tbl><w:tr><w:tc>\
               <w:p><w:r><w:t>outer</w:t></w:r></w:p>\
               <w:tbl><w:tr><w:tc><w:p><w:r><w:t>inner</w:t></w:r></w:p></w:tc></w:tr></w:tbl>\
             </w:tc></w:tr></w:tbl>",
        );
        assert_eq!(text, "outer\ninner");
    }

    #[test]
    fn text_box_content_is_skipped() {
        let text = parse(
            "<w:p><w:r><w:t>Visible</w:t></w:r><w:r><w:drawing><wps:txbx xmlns:wps=\"x\">\
             <w:txbxContent><w:p><w:r><w:t>Boxed</w:t></w:r></w:p></w:txbxContent>\
             </wps:txbx></w:drawing></w:r></w:p>",
        );
        assert_eq!(text, "Visible");
    }

    #[test]
    fn deleted_text_is_ignored() {
        let text = parse(
            "<w:p><w:del><w:r><w:delText>old</w:delText></w:r></w:del>\
             <w:ins><w:r><w:t>new</w:t></w:r></w:ins></w:p>",
        );
        assert_eq!(text, "new");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = parse_document_xml("<w:document><w:body><w:p></w:body>".as_bytes()).unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
    }

    #[test]
    fn not_a_zip_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.docx");
        std::fs::write(&path, b"plain text pretending to be docx").unwrap();
        let err = extract_docx_text(&path).unwrap_err();
        assert!(err.to_string().contains("not a valid DOCX container"));
    }
}
