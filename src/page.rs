use crate::browser::{BrowserError, BrowserSession, ElementHandle};
use crate::locator::{Locator, LocatorChain};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Polls until `locator` matches something or `timeout` elapses.
pub async fn wait_for<S: BrowserSession + ?Sized>(
    session: &S,
    locator: &Locator,
    timeout: Duration,
) -> Result<Option<ElementHandle>, BrowserError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(element) = session.find_all(locator).await?.into_iter().next() {
            return Ok(Some(element));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// First element of the first candidate that currently matches anything.
pub async fn first_present<S: BrowserSession + ?Sized>(
    session: &S,
    chain: &LocatorChain,
) -> Result<Option<ElementHandle>, BrowserError> {
    for locator in chain.candidates() {
        if let Some(element) = session.find_all(locator).await?.into_iter().next() {
            return Ok(Some(element));
        }
    }
    Ok(None)
}

/// Polls the whole chain until one candidate matches or `timeout` elapses.
pub async fn wait_for_any<S: BrowserSession + ?Sized>(
    session: &S,
    chain: &LocatorChain,
    timeout: Duration,
) -> Result<Option<ElementHandle>, BrowserError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(element) = first_present(session, chain).await? {
            return Ok(Some(element));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Tries each candidate in order, waiting up to `timeout` for it, and clicks
/// the first one that appears and accepts the click. Returns the locator that
/// worked.
pub async fn click_first<'c, S: BrowserSession + ?Sized>(
    session: &S,
    chain: &'c LocatorChain,
    timeout: Duration,
) -> Result<Option<&'c Locator>, BrowserError> {
    for locator in chain.candidates() {
        let Some(element) = wait_for(session, locator, timeout).await? else {
            continue;
        };
        match session.click(&element).await {
            Ok(()) => return Ok(Some(locator)),
            Err(BrowserError::WebDriver { error, message }) => {
                warn!(ui_target = chain.target(), %locator, %error, %message, "Click rejected, trying next candidate");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(None)
}

/// Writes a screenshot named `name` into `directory`. Diagnostics are for
/// humans only, so failures are logged and swallowed.
pub async fn capture<S: BrowserSession + ?Sized>(
    session: &S,
    directory: &Path,
    name: &str,
) -> Option<PathBuf> {
    let path = directory.join(name);
    let result = async {
        let png = session.screenshot().await?;
        tokio::fs::create_dir_all(directory).await?;
        tokio::fs::write(&path, png).await?;
        Ok::<_, BrowserError>(())
    }
    .await;

    match result {
        Ok(()) => {
            info!(path = %path.display(), "Saved diagnostic screenshot");
            Some(path)
        }
        Err(err) => {
            error!(?err, name, "Failed to save diagnostic screenshot");
            None
        }
    }
}
