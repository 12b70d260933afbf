pub mod db;
pub mod document;
pub mod editor;
pub mod errors;
pub mod host;
pub mod messaging;
pub mod models;
pub mod popup;
pub mod settings;
pub mod snapshot;
pub mod store;
pub mod view;

pub use crate::errors::{AppError, AppResult};
pub use crate::models::{CollectionKind, NoteField, StateDocument};
pub use crate::popup::{CommitOutcome, ModalAction, PopupCore};
pub use crate::settings::Settings;

use crate::db::SqliteKeyValueStore;
use crate::host::BrowserActions;
use crate::messaging::{TabMessagingClient, TabMessenger};
use crate::store::DocumentStore;
use crate::view::ViewRenderer;
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Builds a popup backed by the SQLite store in `data_dir` and loads its state.
///
/// A stored document that does not decode is left untouched in the store and
/// the popup starts from the defaults, so `reset` can still replace it.
pub async fn open_popup<B>(
    data_dir: &Path,
    settings: &Settings,
    renderer: Box<dyn ViewRenderer>,
    browser: Arc<B>,
) -> AppResult<PopupCore>
where
    B: BrowserActions + TabMessenger + 'static,
{
    let backend = SqliteKeyValueStore::open(&settings.database_path(data_dir))?;
    let messaging = TabMessagingClient::new(browser.clone(), settings.message_timeout());
    let mut popup = PopupCore::new(DocumentStore::new(Arc::new(backend)), renderer, browser, messaging);
    match popup.load().await {
        Ok(()) => {}
        Err(AppError::MalformedDocument(message)) => {
            tracing::warn!(error = %message, "stored document is malformed, starting from defaults");
        }
        Err(error) => return Err(error),
    }
    Ok(popup)
}

pub fn init_tracing(data_dir: &Path, default_filter: &str) -> Result<(), String> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "support-assistant.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
