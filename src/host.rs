use crate::errors::AppResult;
use crate::messaging::{DeliveryError, TabInfo, TabMessenger};
use crate::snapshot::{capture, ContentScript, PageSource};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("clipboard write failed: {0}")]
pub struct ClipboardWriteFailed(pub String);

/// Browser capabilities the popup uses besides messaging.
#[async_trait]
pub trait BrowserActions: Send + Sync {
    /// Opens `url` in a new, active tab and returns its id.
    async fn open_tab(&self, url: &str) -> AppResult<u32>;
    async fn write_clipboard(&self, text: &str) -> Result<(), ClipboardWriteFailed>;
}

#[derive(Debug, Clone)]
struct LocalTab {
    id: u32,
    title: String,
    url: String,
    content_script: Option<ContentScript>,
}

/// In-process browser: a window of tabs, some running the content script.
#[derive(Clone)]
pub struct LocalBrowser {
    tabs: Arc<Mutex<Vec<LocalTab>>>,
    active: Arc<Mutex<Option<u32>>>,
    next_id: Arc<AtomicU32>,
    clipboard: Arc<Mutex<Option<String>>>,
    clipboard_available: Arc<AtomicBool>,
}

impl Default for LocalBrowser {
    fn default() -> Self {
        Self {
            tabs: Arc::new(Mutex::new(Vec::new())),
            active: Arc::new(Mutex::new(None)),
            next_id: Arc::new(AtomicU32::new(1)),
            clipboard: Arc::new(Mutex::new(None)),
            clipboard_available: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl LocalBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `page` into a new active tab, optionally injecting the content script.
    pub async fn open_page(&self, page: PageSource, with_content_script: bool) -> u32 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let title = capture(&page).title;
        let url = page.url.clone();
        let content_script = with_content_script.then(|| ContentScript::attach(page));

        {
            let mut tabs = self.tabs.lock().await;
            tabs.push(LocalTab {
                id,
                title,
                url,
                content_script,
            });
        }
        self.activate(id).await;
        id
    }

    /// Opens the page to inspect. Without markup the tab is a blank page with
    /// no content script, like a browser-internal page.
    pub async fn open_inspected_page(
        &self,
        url: &str,
        html: Option<String>,
        with_content_script: bool,
    ) -> u32 {
        match html {
            Some(markup) => self.open_page(PageSource::new(url, markup), with_content_script).await,
            None => self.open_page(PageSource::new(url, String::new()), false).await,
        }
    }

    pub async fn activate(&self, id: u32) -> bool {
        let known = {
            let tabs = self.tabs.lock().await;
            tabs.iter().any(|tab| tab.id == id)
        };
        if known {
            let mut active = self.active.lock().await;
            *active = Some(id);
        }
        known
    }

    pub async fn tab_urls(&self) -> Vec<String> {
        let tabs = self.tabs.lock().await;
        tabs.iter().map(|tab| tab.url.clone()).collect()
    }

    pub async fn clipboard_contents(&self) -> Option<String> {
        let clipboard = self.clipboard.lock().await;
        clipboard.clone()
    }

    pub fn set_clipboard_available(&self, available: bool) {
        self.clipboard_available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl TabMessenger for LocalBrowser {
    async fn active_tab(&self) -> Option<TabInfo> {
        let active = *self.active.lock().await;
        let id = active?;
        let tabs = self.tabs.lock().await;
        tabs.iter().find(|tab| tab.id == id).map(|tab| TabInfo {
            id: Some(tab.id),
            title: tab.title.clone(),
            url: tab.url.clone(),
        })
    }

    async fn send_message(&self, tab_id: u32, message: Value) -> Result<Option<Value>, DeliveryError> {
        let script = {
            let tabs = self.tabs.lock().await;
            let Some(tab) = tabs.iter().find(|tab| tab.id == tab_id) else {
                return Err(DeliveryError(format!("No tab with id: {}", tab_id)));
            };
            tab.content_script.clone()
        };

        match script {
            Some(script) => Ok(script.handle_message(&message)),
            None => Err(DeliveryError(
                "Could not establish connection. Receiving end does not exist.".to_string(),
            )),
        }
    }
}

#[async_trait]
impl BrowserActions for LocalBrowser {
    async fn open_tab(&self, url: &str) -> AppResult<u32> {
        let id = self.open_page(PageSource::new(url, String::new()), false).await;
        tracing::info!(tab_id = id, url, "opened tab");
        Ok(id)
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), ClipboardWriteFailed> {
        if !self.clipboard_available.load(Ordering::SeqCst) {
            return Err(ClipboardWriteFailed("Document is not focused.".to_string()));
        }
        let mut clipboard = self.clipboard.lock().await;
        *clipboard = Some(text.to_string());
        Ok(())
    }
}
