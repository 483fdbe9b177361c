use crate::utils::error::{DocumentError, Result};
use async_trait::async_trait;

/// Page-structured view of an opened document.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Text of page `index`, or `None` when the page yields no text.
    fn page_text(&self, index: usize) -> Option<String>;
}

/// Anything that can be opened into pages: a PDF on disk, uploaded bytes,
/// a plain-text résumé.
pub trait DocumentSource: Send + Sync {
    fn display_name(&self) -> &str;

    fn open(&self) -> std::result::Result<Box<dyn PageSource>, DocumentError>;
}

/// Chat-completion endpoint. Implementations must be safe to share across
/// concurrently processed documents.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        model_id: &str,
        temperature: f32,
    ) -> std::result::Result<String, DocumentError>;
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
