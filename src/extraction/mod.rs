//! Page text extraction for uploaded documents
//!
//! PDFs go through an external [`TextExtractor`] (poppler + tesseract by
//! default), plain UTF-8 uploads are split on form feeds. Every page is
//! normalised with [`clean_text`] before it reaches the chunker.


pub mod poppler;

use anyhow::Result;
use async_trait::async_trait;
use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::DiligenceError;

pub use poppler::PopplerExtractor;

pub const NO_READABLE_TEXT: &str = "No readable text found";

const PDF_MAGIC: &[u8] = b"%PDF";
const PAGE_BREAK: char = '\u{c}';

static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?<=[.!?])\s+").expect("sentence boundary pattern is valid"));

/// Text of one page, 1-based page number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

impl PageText {
    #[inline]
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
        }
    }
}

/// Backend that turns document bytes into per-page text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the embedded text layer
    async fn extract_text(&self, bytes: &[u8]) -> Result<Vec<PageText>>;

    /// Rasterise and OCR every page
    async fn extract_ocr(&self, bytes: &[u8]) -> Result<Vec<PageText>>;
}

/// Read an uploaded document into cleaned, non-blank pages.
///
/// The text layer is tried first and its failures only logged. OCR runs when
/// the text layer produced nothing or when `use_ocr` is set; OCR pages
/// replace the text-layer pages when they yield anything.
pub async fn read_document(
    extractor: &dyn TextExtractor,
    bytes: &[u8],
    use_ocr: bool,
) -> crate::Result<Vec<PageText>> {
    if let Some(pages) = read_plain_text(bytes) {
        debug!("Upload is plain text, {} pages", pages.len());
        return non_empty(pages);
    }

    let mut pages = match extractor.extract_text(bytes).await {
        Ok(pages) => clean_pages(pages),
        Err(e) => {
            warn!("Text layer extraction failed: {:#}", e);
            Vec::new()
        }
    };

    if pages.is_empty() || use_ocr {
        info!(
            "Running OCR (requested: {}, text layer pages: {})",
            use_ocr,
            pages.len()
        );
        match extractor.extract_ocr(bytes).await {
            Ok(ocr_pages) => {
                let ocr_pages = clean_pages(ocr_pages);
                if !ocr_pages.is_empty() {
                    pages = ocr_pages;
                }
            }
            Err(e) => warn!("OCR failed: {:#}", e),
        }
    }

    non_empty(pages)
}

fn non_empty(pages: Vec<PageText>) -> crate::Result<Vec<PageText>> {
    if pages.is_empty() {
        return Err(DiligenceError::Extraction(NO_READABLE_TEXT.to_string()));
    }
    Ok(pages)
}

fn read_plain_text(bytes: &[u8]) -> Option<Vec<PageText>> {
    if bytes.starts_with(PDF_MAGIC) {
        return None;
    }
    let text = std::str::from_utf8(bytes).ok()?;
    Some(clean_pages(split_pages(text)))
}

/// Split text on form feeds into 1-based pages
#[inline]
pub fn split_pages(text: &str) -> Vec<PageText> {
    text.split(PAGE_BREAK)
        .enumerate()
        .map(|(i, page)| PageText::new(u32::try_from(i + 1).unwrap_or(u32::MAX), page))
        .collect()
}

fn clean_pages(pages: Vec<PageText>) -> Vec<PageText> {
    pages
        .into_iter()
        .map(|page| PageText {
            text: clean_text(&page.text),
            ..page
        })
        .filter(|page| !page.text.is_empty())
        .collect()
}

/// Collapse whitespace, replace non-ASCII runs with a space and trim
#[inline]
pub fn clean_text(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || !c.is_ascii())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split text after sentence-terminal punctuation followed by whitespace.
///
/// Pieces are trimmed and blank pieces dropped.
#[inline]
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        let Ok(boundary) = boundary else {
            break;
        };
        sentences.push(&text[start..boundary.start()]);
        start = boundary.end();
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
