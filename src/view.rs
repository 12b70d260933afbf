use crate::models::{CollectionKind, StateDocument};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemAction {
    Open,
    Copy,
    Edit,
    Remove,
    Toggle,
}

/// One drawn entry of a collection. `index` is only valid until the next
/// mutation of that collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRow {
    pub index: usize,
    pub title: String,
    pub meta: String,
    pub checked: Option<bool>,
    pub actions: Vec<ItemAction>,
}

pub fn project(doc: &StateDocument, kind: CollectionKind) -> Vec<ItemRow> {
    match kind {
        CollectionKind::Link => doc
            .links
            .iter()
            .enumerate()
            .map(|(index, link)| ItemRow {
                index,
                title: link.label.clone(),
                meta: if link.meta.is_empty() { link.value.clone() } else { link.meta.clone() },
                checked: None,
                actions: vec![ItemAction::Open, ItemAction::Edit, ItemAction::Remove],
            })
            .collect(),
        CollectionKind::Template => doc
            .templates
            .iter()
            .enumerate()
            .map(|(index, template)| ItemRow {
                index,
                title: template.label.clone(),
                meta: if template.meta.is_empty() {
                    "Click to copy response.".to_string()
                } else {
                    template.meta.clone()
                },
                checked: None,
                actions: vec![ItemAction::Copy, ItemAction::Edit, ItemAction::Remove],
            })
            .collect(),
        CollectionKind::Checklist => doc
            .checklist
            .iter()
            .enumerate()
            .map(|(index, item)| ItemRow {
                index,
                title: item.label.clone(),
                meta: String::new(),
                checked: Some(item.done),
                actions: vec![ItemAction::Toggle, ItemAction::Edit, ItemAction::Remove],
            })
            .collect(),
    }
}

/// Draws the document. Renderers never mutate state themselves.
pub trait ViewRenderer: Send {
    fn render_collection(&mut self, kind: CollectionKind, rows: &[ItemRow]);

    fn render_all(&mut self, doc: &StateDocument) {
        for kind in CollectionKind::ALL {
            self.render_collection(kind, &project(doc, kind));
        }
    }

    fn render_status(&mut self, _status: &str) {}
}

/// Plain-text renderer used by the command line front end.
pub struct TextRenderer<W: Write + Send> {
    out: W,
    write_failed: bool,
}

impl<W: Write + Send> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            write_failed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Whether any line failed to reach the output.
    pub fn write_failed(&self) -> bool {
        self.write_failed
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if let Err(error) = writeln!(self.out, "{}", args) {
            if !self.write_failed {
                tracing::debug!(error = %error, "text renderer output failed");
            }
            self.write_failed = true;
        }
    }
}

impl<W: Write + Send> ViewRenderer for TextRenderer<W> {
    fn render_collection(&mut self, kind: CollectionKind, rows: &[ItemRow]) {
        self.line(format_args!("[{}]", kind.collection_key()));
        if rows.is_empty() {
            self.line(format_args!("  (empty)"));
        }
        for row in rows {
            let marker = match row.checked {
                Some(true) => "[x] ",
                Some(false) => "[ ] ",
                None => "",
            };
            if row.meta.is_empty() {
                self.line(format_args!("  {}. {}{}", row.index, marker, row.title));
            } else {
                self.line(format_args!("  {}. {}{} - {}", row.index, marker, row.title, row.meta));
            }
        }
    }

    fn render_status(&mut self, status: &str) {
        self.line(format_args!("{}", status));
    }
}

#[cfg(test)]
mod tests {
    use super::{project, ItemAction, TextRenderer, ViewRenderer};
    use crate::document::reset;
    use crate::models::CollectionKind;

    #[test]
    fn link_rows_fall_back_to_url_without_meta() {
        let mut doc = reset();
        doc.links[0].meta.clear();
        let rows = project(&doc, CollectionKind::Link);
        assert_eq!(rows[0].meta, doc.links[0].value);
        assert_eq!(rows[1].meta, doc.links[1].meta);
        assert_eq!(rows[0].actions[0], ItemAction::Open);
    }

    #[test]
    fn template_rows_fall_back_to_copy_hint() {
        let mut doc = reset();
        doc.templates[2].meta.clear();
        let rows = project(&doc, CollectionKind::Template);
        assert_eq!(rows[2].meta, "Click to copy response.");
    }

    #[test]
    fn text_renderer_marks_checklist_state() {
        let mut doc = reset();
        doc.checklist[0].done = true;
        let mut renderer = TextRenderer::new(Vec::new());
        renderer.render_collection(CollectionKind::Checklist, &project(&doc, CollectionKind::Checklist));
        let text = String::from_utf8(renderer.into_inner()).expect("utf8");
        assert!(text.starts_with("[checklist]"));
        assert!(text.contains("0. [x] Review overnight escalations"));
        assert!(text.contains("1. [ ] Check open high-priority tickets"));
    }

    struct ClosedPipe;

    impl std::io::Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_writes_are_recorded_and_do_not_panic() {
        let doc = reset();
        let mut renderer = TextRenderer::new(ClosedPipe);
        assert!(!renderer.write_failed());
        renderer.render_all(&doc);
        renderer.render_status("done");
        assert!(renderer.write_failed());

        let mut healthy = TextRenderer::new(Vec::new());
        healthy.render_status("done");
        assert!(!healthy.write_failed());
    }
}
