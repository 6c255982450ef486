use crate::locator::Locator;
use async_trait::async_trait;
use thiserror::Error;

/// Opaque reference to an element of the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webdriver error `{error}`: {message}")]
    WebDriver { error: String, message: String },
    #[error("unexpected webdriver response: {0}")]
    Protocol(String),
    #[error("page did not finish loading within {0:?}")]
    LoadTimeout(std::time::Duration),
    #[error("failed to decode screenshot: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// One exclusively owned browser window.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;
    async fn wait_until_loaded(&self) -> Result<(), BrowserError>;
    /// All matches in document order; empty when nothing matches.
    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>, BrowserError>;
    async fn find_all_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, BrowserError>;
    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError>;
    async fn fill(&self, element: &ElementHandle, text: &str) -> Result<(), BrowserError>;
    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError>;
    /// PNG encoded capture of the viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError>;
    async fn close(&self) -> Result<(), BrowserError>;

    async fn find_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Option<ElementHandle>, BrowserError> {
        Ok(self
            .find_all_within(parent, locator)
            .await?
            .into_iter()
            .next())
    }
}

#[async_trait]
pub trait BrowserLauncher: Clone + Send + Sync + 'static {
    type Session: BrowserSession + 'static;

    async fn launch(&self) -> Result<Self::Session, BrowserError>;
}
