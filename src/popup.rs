use crate::document::{materialize, reset};
use crate::editor::{apply_commit, apply_remove, CommitRejection, Editor, EditorForm, EditorState};
use crate::errors::{AppError, AppResult};
use crate::host::BrowserActions;
use crate::messaging::{status_for, PageInfo, SnapshotError, TabMessagingClient, PENDING_STATUS};
use crate::models::{CollectionKind, NoteField, StateDocument};
use crate::store::DocumentStore;
use crate::view::{project, ViewRenderer};
use std::sync::Arc;

/// How the editor modal was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalAction {
    Save,
    Dismiss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed { kind: CollectionKind, index: usize },
    Rejected(CommitRejection),
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
enum RenderScope {
    Nothing,
    Collection(CollectionKind),
    Everything,
}

/// Owns the popup's state document and performs every mutation on it.
///
/// Each mutating call updates memory, saves the whole document once and
/// then re-renders. A failed save is returned as `AppError::Persistence`;
/// the in-memory change is kept and already drawn.
pub struct PopupCore {
    store: DocumentStore,
    renderer: Box<dyn ViewRenderer>,
    browser: Arc<dyn BrowserActions>,
    messaging: TabMessagingClient,
    state: StateDocument,
    editor: Editor,
    page_status: String,
}

impl PopupCore {
    pub fn new(
        store: DocumentStore,
        renderer: Box<dyn ViewRenderer>,
        browser: Arc<dyn BrowserActions>,
        messaging: TabMessagingClient,
    ) -> Self {
        Self {
            store,
            renderer,
            browser,
            messaging,
            state: reset(),
            editor: Editor::new(),
            page_status: String::new(),
        }
    }

    /// Reads the stored document, migrates it and draws everything.
    /// On error the current in-memory document is left as it was.
    pub async fn load(&mut self) -> AppResult<()> {
        let stored = self.store.load().await?;
        let first_run = stored.is_none();
        self.state = materialize(stored)?;
        tracing::info!(
            first_run,
            links = self.state.links.len(),
            templates = self.state.templates.len(),
            checklist = self.state.checklist.len(),
            "popup state loaded"
        );
        self.renderer.render_all(&self.state);
        Ok(())
    }

    pub fn document(&self) -> &StateDocument {
        &self.state
    }

    pub fn editor_state(&self) -> EditorState {
        self.editor.state()
    }

    pub fn page_status(&self) -> &str {
        &self.page_status
    }

    pub fn open_add(&mut self, kind: CollectionKind) -> EditorForm {
        self.editor.open_add(kind)
    }

    pub fn open_edit(&mut self, kind: CollectionKind, index: usize) -> AppResult<EditorForm> {
        self.editor.open_edit(kind, index, &self.state)
    }

    pub fn cancel(&mut self) -> bool {
        let cancelled = self.editor.cancel();
        if cancelled {
            tracing::debug!("editor dismissed without saving");
        }
        cancelled
    }

    /// Saves the open editor. Invalid input leaves the editor open and
    /// touches nothing.
    pub async fn commit(&mut self, label: &str, value: &str) -> AppResult<CommitOutcome> {
        let (context, fields) = match self.editor.prepare_commit(label, value) {
            Ok(prepared) => prepared,
            Err(rejection) => {
                tracing::debug!(?rejection, "commit rejected");
                return Ok(CommitOutcome::Rejected(rejection));
            }
        };

        let index = apply_commit(&mut self.state, context, fields)?;
        tracing::info!(
            kind = context.kind.as_str(),
            index,
            added = context.target.is_none(),
            "collection item committed"
        );
        let saved = self.persist_then_render(RenderScope::Collection(context.kind)).await;
        self.editor.finish();
        saved.map(|()| CommitOutcome::Committed {
            kind: context.kind,
            index,
        })
    }

    /// Dialog close handler: only an explicit save commits.
    pub async fn close_editor(&mut self, action: ModalAction, label: &str, value: &str) -> AppResult<CommitOutcome> {
        match action {
            ModalAction::Save => self.commit(label, value).await,
            ModalAction::Dismiss => {
                self.cancel();
                Ok(CommitOutcome::Cancelled)
            }
        }
    }

    pub async fn remove(&mut self, kind: CollectionKind, index: usize) -> AppResult<()> {
        apply_remove(&mut self.state, kind, index)?;
        tracing::info!(kind = kind.as_str(), index, "collection item removed");
        self.persist_then_render(RenderScope::Collection(kind)).await
    }

    /// Flips a checklist item and returns its new state. The checkbox already
    /// shows the change, so nothing is redrawn.
    pub async fn toggle_checklist(&mut self, index: usize) -> AppResult<bool> {
        let len = self.state.checklist.len();
        let item = self
            .state
            .checklist
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound(format!("no checklist at index {} ({} items)", index, len)))?;
        item.done = !item.done;
        let done = item.done;
        tracing::debug!(index, done, "checklist item toggled");
        self.persist_then_render(RenderScope::Nothing).await?;
        Ok(done)
    }

    pub async fn set_note(&mut self, field: NoteField, value: &str) -> AppResult<()> {
        self.state.notes.set(field, value.to_string());
        tracing::debug!(field = field.as_str(), "note updated");
        self.persist_then_render(RenderScope::Nothing).await
    }

    /// Replaces the whole document with the defaults.
    pub async fn reset(&mut self) -> AppResult<()> {
        self.editor.cancel();
        self.state = reset();
        tracing::info!("popup state reset to defaults");
        self.persist_then_render(RenderScope::Everything).await
    }

    pub async fn open_link(&self, index: usize) -> AppResult<u32> {
        let link = self
            .state
            .links
            .get(index)
            .ok_or_else(|| AppError::NotFound(format!("no link at index {}", index)))?;
        self.browser.open_tab(&link.value).await
    }

    /// Copies a template body. Clipboard failures are logged and reported as
    /// `Ok(false)`.
    pub async fn copy_template(&self, index: usize) -> AppResult<bool> {
        let template = self
            .state
            .templates
            .get(index)
            .ok_or_else(|| AppError::NotFound(format!("no template at index {}", index)))?;
        match self.browser.write_clipboard(&template.value).await {
            Ok(()) => Ok(true),
            Err(error) => {
                tracing::error!(error = %error, index, "clipboard copy failed");
                Ok(false)
            }
        }
    }

    /// Asks the active tab's content script for a snapshot. Every outcome
    /// ends up as a status line; nothing is raised.
    pub async fn log_page_info(&mut self) -> Result<PageInfo, SnapshotError> {
        self.set_page_status(PENDING_STATUS.to_string());
        let result = self.messaging.request_page_snapshot().await;
        if let Err(error) = &result {
            tracing::warn!(error = %error, "page snapshot failed");
        }
        self.set_page_status(status_for(&result));
        result
    }

    fn set_page_status(&mut self, status: String) {
        self.renderer.render_status(&status);
        self.page_status = status;
    }

    async fn persist_then_render(&mut self, scope: RenderScope) -> AppResult<()> {
        let saved = self.store.save(&self.state).await;
        match scope {
            RenderScope::Nothing => {}
            RenderScope::Collection(kind) => {
                let rows = project(&self.state, kind);
                self.renderer.render_collection(kind, &rows);
            }
            RenderScope::Everything => self.renderer.render_all(&self.state),
        }
        saved
    }
}
