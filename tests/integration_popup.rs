use serde_json::json;
use std::sync::Arc;
use support_assistant_lib::document::reset;
use support_assistant_lib::host::{BrowserActions, LocalBrowser};
use support_assistant_lib::messaging::SnapshotError;
use support_assistant_lib::snapshot::PageSource;
use support_assistant_lib::view::TextRenderer;
use support_assistant_lib::{open_popup, CollectionKind, CommitOutcome, ModalAction, NoteField, Settings};

fn quiet() -> Box<TextRenderer<std::io::Sink>> {
    Box::new(TextRenderer::new(std::io::sink()))
}

#[tokio::test]
async fn edits_survive_reopening_the_popup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = Settings::default();
    let browser = Arc::new(LocalBrowser::new());

    {
        let mut popup = open_popup(dir.path(), &settings, quiet(), browser.clone())
            .await
            .expect("open");
        assert_eq!(popup.document(), &reset());

        popup.open_add(CollectionKind::Link);
        let outcome = popup
            .close_editor(ModalAction::Save, "Runbook", "https://runbook.example")
            .await
            .expect("save");
        assert!(matches!(outcome, CommitOutcome::Committed { index: 3, .. }));

        popup.open_edit(CollectionKind::Template, 0).expect("edit");
        popup
            .commit("Greeting", "Hello, thanks for writing in.")
            .await
            .expect("commit");
        popup.remove(CollectionKind::Checklist, 1).await.expect("remove");
        popup.toggle_checklist(0).await.expect("toggle");
        popup.set_note(NoteField::TicketNumber, "SUP-981").await.expect("note");
    }

    let popup = open_popup(dir.path(), &settings, quiet(), browser)
        .await
        .expect("reopen");
    let doc = popup.document();
    assert_eq!(doc.links.len(), 4);
    assert_eq!(doc.links[3].label, "Runbook");
    assert_eq!(doc.links[3].meta, "Custom link.");
    assert_eq!(doc.templates[0].label, "Greeting");
    assert_eq!(doc.templates[0].meta, reset().templates[0].meta);
    assert_eq!(doc.checklist.len(), 2);
    assert!(doc.checklist[0].done);
    assert_eq!(doc.checklist[1].label, "Send end-of-day summary");
    assert_eq!(doc.notes.ticket_number, "SUP-981");
}

#[tokio::test]
async fn reset_replaces_stored_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = Settings::default();
    let browser = Arc::new(LocalBrowser::new());

    let mut popup = open_popup(dir.path(), &settings, quiet(), browser.clone())
        .await
        .expect("open");
    popup.remove(CollectionKind::Link, 0).await.expect("remove");
    popup.reset().await.expect("reset");

    let reopened = open_popup(dir.path(), &settings, quiet(), browser)
        .await
        .expect("reopen");
    assert_eq!(reopened.document(), &reset());
}

#[tokio::test]
async fn older_stored_document_gains_notes_on_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = Settings::default();
    let store = support_assistant_lib::db::SqliteKeyValueStore::open(&settings.database_path(dir.path()))
        .expect("store");
    {
        use support_assistant_lib::store::KeyValueStore;
        store
            .set(
                support_assistant_lib::models::STORAGE_KEY,
                json!({
                    "links": [{ "label": "Mine", "value": "https://mine.example", "meta": "kept" }],
                    "templates": [],
                    "checklist": [{ "label": "Only task", "done": true }],
                    "layout": "compact"
                }),
            )
            .await
            .expect("seed");
    }

    let mut popup = open_popup(dir.path(), &settings, quiet(), Arc::new(LocalBrowser::new()))
        .await
        .expect("open");
    assert_eq!(popup.document().notes, reset().notes);
    assert_eq!(popup.document().links[0].meta, "kept");
    assert!(popup.document().templates.is_empty());

    popup.set_note(NoteField::Domain, "mine.example").await.expect("note");
    let reopened = open_popup(dir.path(), &settings, quiet(), Arc::new(LocalBrowser::new()))
        .await
        .expect("reopen");
    assert_eq!(reopened.document().notes.domain, "mine.example");
    assert_eq!(reopened.document().extra.get("layout"), Some(&json!("compact")));
}

#[tokio::test]
async fn page_snapshot_round_trip_through_local_browser() {
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = Arc::new(LocalBrowser::new());
    let mut popup = open_popup(dir.path(), &Settings::default(), quiet(), browser.clone())
        .await
        .expect("open");

    browser
        .open_page(
            PageSource::new(
                "https://status.example.com/incidents",
                r#"<html><head><title>Incidents</title><meta name="description" content="Live status"></head>
                   <body><h2>API</h2><h2>Dashboard</h2><h2> Webhooks </h2><h2>Email</h2></body></html>"#,
            ),
            true,
        )
        .await;
    let info = popup.log_page_info().await.expect("snapshot");
    assert_eq!(info.headings, vec!["API", "Dashboard", "Webhooks", "Email"]);
    assert_eq!(info.meta_description, "Live status");
    assert_eq!(popup.page_status(), "Logged page info for Incidents.");

    browser.open_tab("chrome://newtab").await.expect("open tab");
    let result = popup.log_page_info().await;
    assert!(matches!(result, Err(SnapshotError::EndpointUnavailable(_))));
}

#[tokio::test]
async fn malformed_stored_document_can_be_reset() {
    use support_assistant_lib::store::KeyValueStore;

    let dir = tempfile::tempdir().expect("tempdir");
    let settings = Settings::default();
    let store = support_assistant_lib::db::SqliteKeyValueStore::open(&settings.database_path(dir.path()))
        .expect("store");
    store
        .set(support_assistant_lib::models::STORAGE_KEY, json!({ "links": "oops" }))
        .await
        .expect("seed");

    let mut popup = open_popup(dir.path(), &settings, quiet(), Arc::new(LocalBrowser::new()))
        .await
        .expect("open despite malformed document");
    assert_eq!(popup.document(), &reset());
    assert_eq!(
        store.get(support_assistant_lib::models::STORAGE_KEY).await.expect("get"),
        Some(json!({ "links": "oops" }))
    );

    popup.reset().await.expect("reset");
    let reopened = open_popup(dir.path(), &settings, quiet(), Arc::new(LocalBrowser::new()))
        .await
        .expect("reopen");
    assert_eq!(reopened.document(), &reset());
    let stored = store
        .get(support_assistant_lib::models::STORAGE_KEY)
        .await
        .expect("get")
        .expect("stored");
    assert!(stored["links"].is_array());
}
