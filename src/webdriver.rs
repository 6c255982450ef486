//! Minimal W3C WebDriver client, enough to drive the booking workflow through
//! chromedriver (or any other WebDriver endpoint).

use crate::browser::{BrowserError, BrowserLauncher, BrowserSession, ElementHandle};
use crate::locator::Locator;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound for a single driver command, so a hung driver fails the run
/// instead of holding it open.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);
const PAGE_LOAD_POLL: Duration = Duration::from_millis(250);

#[derive(Deserialize)]
struct Envelope<T> {
    value: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// Element reference, keyed by the W3C web element identifier.
#[derive(Deserialize)]
struct ElementRef {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
    id: String,
}

async fn send<T: DeserializeOwned>(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<T, BrowserError> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        return Err(match serde_json::from_slice::<Envelope<ErrorBody>>(&bytes) {
            Ok(envelope) => BrowserError::WebDriver {
                error: envelope.value.error,
                message: envelope.value.message,
            },
            Err(_) => BrowserError::Protocol(format!(
                "{status}: {}",
                String::from_utf8_lossy(&bytes)
            )),
        });
    }

    serde_json::from_slice::<Envelope<T>>(&bytes)
        .map(|envelope| envelope.value)
        .map_err(|err| BrowserError::Protocol(err.to_string()))
}

#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    client: Client,
    endpoint: String,
    headless: bool,
    user_agent: String,
}

impl WebDriverLauncher {
    pub fn new(endpoint: impl Into<String>, headless: bool) -> Result<Self, BrowserError> {
        Self::with_command_timeout(endpoint, headless, COMMAND_TIMEOUT)
    }

    pub fn with_command_timeout(
        endpoint: impl Into<String>,
        headless: bool,
        command_timeout: Duration,
    ) -> Result<Self, BrowserError> {
        let client = Client::builder().timeout(command_timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            headless,
            user_agent: DEFAULT_USER_AGENT.into(),
        })
    }

    fn capabilities(&self) -> Value {
        let mut args = vec![
            format!("--user-agent={}", self.user_agent),
            "--window-size=1280,1024".to_string(),
        ];
        if self.headless {
            args.push("--headless=new".into());
            args.push("--no-sandbox".into());
            args.push("--disable-dev-shm-usage".into());
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    type Session = WebDriverSession;

    async fn launch(&self) -> Result<WebDriverSession, BrowserError> {
        let url = format!("{}/session", self.endpoint);
        let session: NewSession =
            send(&self.client, Method::POST, &url, Some(self.capabilities())).await?;
        info!(session_id = %session.session_id, headless = self.headless, "Browser session opened");
        Ok(WebDriverSession {
            client: self.client.clone(),
            session_url: format!("{}/session/{}", self.endpoint, session.session_id),
        })
    }
}

pub struct WebDriverSession {
    client: Client,
    session_url: String,
}

impl WebDriverSession {
    async fn command<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, BrowserError> {
        let url = format!("{}{path}", self.session_url);
        debug!(%method, %url, "webdriver command");
        send(&self.client, method, &url, body).await
    }

    fn locator_body(locator: &Locator) -> Value {
        json!({ "using": locator.strategy(), "value": locator.value() })
    }

    fn handles(elements: Vec<ElementRef>) -> Vec<ElementHandle> {
        elements
            .into_iter()
            .map(|element| ElementHandle(element.id))
            .collect()
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.command::<Value>(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn wait_until_loaded(&self) -> Result<(), BrowserError> {
        let deadline = Instant::now() + PAGE_LOAD_TIMEOUT;
        loop {
            let state: Value = self
                .command(
                    Method::POST,
                    "/execute/sync",
                    Some(json!({ "script": "return document.readyState;", "args": [] })),
                )
                .await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::LoadTimeout(PAGE_LOAD_TIMEOUT));
            }
            sleep(PAGE_LOAD_POLL).await;
        }
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>, BrowserError> {
        let elements: Vec<ElementRef> = self
            .command(Method::POST, "/elements", Some(Self::locator_body(locator)))
            .await?;
        Ok(Self::handles(elements))
    }

    async fn find_all_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, BrowserError> {
        let path = format!("/element/{}/elements", parent.0);
        let elements: Vec<ElementRef> = self
            .command(Method::POST, &path, Some(Self::locator_body(locator)))
            .await?;
        Ok(Self::handles(elements))
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError> {
        let path = format!("/element/{}/click", element.0);
        self.command::<Value>(Method::POST, &path, Some(json!({})))
            .await?;
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, text: &str) -> Result<(), BrowserError> {
        let clear = format!("/element/{}/clear", element.0);
        self.command::<Value>(Method::POST, &clear, Some(json!({})))
            .await?;
        let value = format!("/element/{}/value", element.0);
        self.command::<Value>(Method::POST, &value, Some(json!({ "text": text })))
            .await?;
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError> {
        let path = format!("/element/{}/text", element.0);
        self.command(Method::GET, &path, None).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        let encoded: String = self.command(Method::GET, "/screenshot", None).await?;
        Ok(STANDARD.decode(encoded)?)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.command::<Value>(Method::DELETE, "", None).await?;
        info!("Browser session closed");
        Ok(())
    }
}
