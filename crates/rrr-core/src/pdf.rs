//! PDF extraction
//!
//! Text comes from `pdf-extract`, one string per page. Hyperlinks come from
//! the link annotations lopdf exposes: page → `/Annots` → `/Subtype /Link`
//! → `/A` → `/URI`.

use crate::collaborator::DocumentExtractor;
use crate::discovery::display_name;
use crate::error::ExtractionError;
use crate::types::{ExtractedDocument, Hyperlink};
use lopdf::{Dictionary, Document, Object};
use std::path::Path;

/// Characters of page text kept on each side of a link
pub const LINK_CONTEXT_CHARS: usize = 50;

/// Production [`DocumentExtractor`] for PDF files
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// Extract from in-memory PDF bytes
    ///
    /// # Errors
    /// Returns [`ExtractionError::Pdf`] if the bytes are not a readable PDF.
    pub fn extract_bytes(name: &str, bytes: &[u8]) -> Result<ExtractedDocument, ExtractionError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| ExtractionError::Pdf(e.to_string()))?;
        let hyperlinks = extract_hyperlinks(name, bytes, &pages)?;
        Ok(ExtractedDocument {
            name: name.to_string(),
            text: pages.join("\n"),
            hyperlinks,
        })
    }
}

impl DocumentExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError> {
        let bytes = std::fs::read(path)?;
        Self::extract_bytes(&display_name(path), &bytes)
    }
}

fn extract_hyperlinks(
    source_file: &str,
    bytes: &[u8],
    page_texts: &[String],
) -> Result<Vec<Hyperlink>, ExtractionError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))?;
    let mut links = Vec::new();

    for (page_number, page_id) in doc.get_pages() {
        let Some(page) = doc.get_object(page_id).ok().and_then(|o| o.as_dict().ok()) else {
            continue;
        };
        let Some(annots) = page
            .get(b"Annots")
            .ok()
            .map(|o| resolve(&doc, o))
            .and_then(|o| o.as_array().ok())
        else {
            continue;
        };

        let page_text = usize::try_from(page_number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| page_texts.get(i))
            .map_or("", String::as_str);

        for annot in annots {
            let Some(uri) = resolve(&doc, annot).as_dict().ok().and_then(|d| link_uri(&doc, d))
            else {
                continue;
            };
            links.push(Hyperlink {
                context: link_context(page_text, &uri),
                url: uri,
                page: page_number,
                source_file: source_file.to_string(),
            });
        }
    }

    Ok(links)
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// URI of a `/Link` annotation with a URI action
fn link_uri(doc: &Document, annot: &Dictionary) -> Option<String> {
    let is_link = annot
        .get(b"Subtype")
        .is_ok_and(|s| matches!(s, Object::Name(n) if n == b"Link"));
    if !is_link {
        return None;
    }
    let action = resolve(doc, annot.get(b"A").ok()?).as_dict().ok()?;
    match resolve(doc, action.get(b"URI").ok()?) {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Page text around the first mention of `uri`, or the start of the page
/// when the link text is not visible
fn link_context(page_text: &str, uri: &str) -> String {
    let chars: Vec<char> = page_text.chars().collect();
    let window = match page_text.find(uri) {
        Some(byte_pos) => {
            let start = page_text[..byte_pos].chars().count();
            let end = start + uri.chars().count();
            let from = start.saturating_sub(LINK_CONTEXT_CHARS);
            let to = (end + LINK_CONTEXT_CHARS).min(chars.len());
            &chars[from..to]
        }
        None => {
            let to = (uri.chars().count() + LINK_CONTEXT_CHARS).min(chars.len());
            &chars[..to]
        }
    };
    window.iter().collect::<String>().trim().to_string()
}
