use async_trait::async_trait;

use crate::error::{PipelineError, Result};

/// Plain text recovered from an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: u32,
}

/// Turns uploaded bytes into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, data: &[u8]) -> Result<ExtractedText>;
}

/// Extractor for text uploads. Pages are separated by form feeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

const FORM_FEED: char = '\u{000C}';

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, data: &[u8]) -> Result<ExtractedText> {
        let text = std::str::from_utf8(data)
            .map_err(|e| PipelineError::Extraction(format!("upload is not valid UTF-8: {e}")))?;

        let page_count = text
            .split(FORM_FEED)
            .filter(|page| !page.trim().is_empty())
            .count()
            .max(1) as u32;

        Ok(ExtractedText {
            text: text.replace(FORM_FEED, "\n"),
            page_count,
        })
    }
}
