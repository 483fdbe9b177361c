//! Document sources and page-by-page text acquisition.

use crate::domain::model::ExtractedText;
use crate::domain::ports::{DocumentSource, PageSource};
use crate::utils::error::DocumentError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FORM_FEED: char = '\x0C';

/// Turns any [`DocumentSource`] into [`ExtractedText`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TextAcquirer;

impl TextAcquirer {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, document: &dyn DocumentSource) -> Result<ExtractedText, DocumentError> {
        let pages = document.open()?;
        let count = pages.page_count();

        let mut texts = Vec::with_capacity(count);
        for index in 0..count {
            let text = pages.page_text(index).unwrap_or_default();
            if text.is_empty() {
                tracing::debug!("{}: page {} yielded no text", document.display_name(), index + 1);
            }
            texts.push(normalize(&text));
        }

        tracing::debug!(
            "{}: extracted {} pages ({} chars)",
            document.display_name(),
            count,
            texts.iter().map(|t| t.chars().count()).sum::<usize>()
        );

        Ok(ExtractedText::from_pages(texts))
    }
}

fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\0', "")
}

/// Builds the right source for a file on disk, chosen by extension.
pub fn document_from_path(path: impl Into<PathBuf>) -> Arc<dyn DocumentSource> {
    let path = path.into();
    let is_text = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("txt"))
        .unwrap_or(false);

    if is_text {
        Arc::new(TextFile::new(path))
    } else {
        Arc::new(PdfFile::new(path))
    }
}

fn file_display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

struct PdfPages {
    document: lopdf::Document,
    page_numbers: Vec<u32>,
}

impl PdfPages {
    fn load(bytes: &[u8]) -> Result<Self, DocumentError> {
        let document = lopdf::Document::load_mem(bytes)
            .map_err(|e| DocumentError::acquisition(format!("unreadable PDF: {}", e)))?;
        // get_pages is keyed by 1-based page number, already in order
        let page_numbers = document.get_pages().keys().copied().collect();
        Ok(Self {
            document,
            page_numbers,
        })
    }
}

impl PageSource for PdfPages {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn page_text(&self, index: usize) -> Option<String> {
        let number = *self.page_numbers.get(index)?;
        match self.document.extract_text(&[number]) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!("page {}: text extraction failed: {}", number, e);
                None
            }
        }
    }
}

/// PDF résumé on the local filesystem.
#[derive(Debug, Clone)]
pub struct PdfFile {
    path: PathBuf,
    name: String,
}

impl PdfFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = file_display_name(&path);
        Self { path, name }
    }
}

impl DocumentSource for PdfFile {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<Box<dyn PageSource>, DocumentError> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            DocumentError::acquisition(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        Ok(Box::new(PdfPages::load(&bytes)?))
    }
}

/// PDF already held in memory, e.g. an uploaded file.
#[derive(Debug, Clone)]
pub struct PdfBytes {
    name: String,
    bytes: Vec<u8>,
}

impl PdfBytes {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

impl DocumentSource for PdfBytes {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<Box<dyn PageSource>, DocumentError> {
        Ok(Box::new(PdfPages::load(&self.bytes)?))
    }
}

struct TextPages(Vec<String>);

impl PageSource for TextPages {
    fn page_count(&self) -> usize {
        self.0.len()
    }

    fn page_text(&self, index: usize) -> Option<String> {
        self.0.get(index).filter(|text| !text.is_empty()).cloned()
    }
}

/// Plain-text résumé held in memory; pages are given explicitly.
#[derive(Debug, Clone)]
pub struct TextDocument {
    name: String,
    pages: Vec<String>,
}

impl TextDocument {
    pub fn new(name: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            name: name.into(),
            pages,
        }
    }

    pub fn single_page(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, vec![text.into()])
    }
}

impl DocumentSource for TextDocument {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<Box<dyn PageSource>, DocumentError> {
        Ok(Box::new(TextPages(self.pages.clone())))
    }
}

/// UTF-8 text file on disk; form feeds separate pages.
#[derive(Debug, Clone)]
pub struct TextFile {
    path: PathBuf,
    name: String,
}

impl TextFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = file_display_name(&path);
        Self { path, name }
    }
}

impl DocumentSource for TextFile {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<Box<dyn PageSource>, DocumentError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            DocumentError::acquisition(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let pages = content.split(FORM_FEED).map(str::to_string).collect();
        Ok(Box::new(TextPages(pages)))
    }
}
