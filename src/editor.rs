use crate::errors::{AppError, AppResult};
use crate::models::{
    ChecklistItem, CollectionKind, LinkItem, StateDocument, TemplateItem, CUSTOM_LINK_META, CUSTOM_TEMPLATE_META,
};
use serde::{Deserialize, Serialize};
use serde_json::Map;

/// What the shared modal editor can read and write on an item.
pub trait EditableItem {
    fn label(&self) -> &str;
    /// `None` for kinds whose editor has no value field.
    fn value(&self) -> Option<&str>;
    fn create(label: String, value: String) -> Self;
    /// Replaces the edited fields only; everything else on the item stays.
    fn apply_edit(&mut self, label: String, value: String);
}

impl EditableItem for LinkItem {
    fn label(&self) -> &str {
        &self.label
    }

    fn value(&self) -> Option<&str> {
        Some(&self.value)
    }

    fn create(label: String, value: String) -> Self {
        Self {
            label,
            value,
            meta: CUSTOM_LINK_META.to_string(),
            extra: Map::new(),
        }
    }

    fn apply_edit(&mut self, label: String, value: String) {
        self.label = label;
        self.value = value;
    }
}

impl EditableItem for TemplateItem {
    fn label(&self) -> &str {
        &self.label
    }

    fn value(&self) -> Option<&str> {
        Some(&self.value)
    }

    fn create(label: String, value: String) -> Self {
        Self {
            label,
            value,
            meta: CUSTOM_TEMPLATE_META.to_string(),
            extra: Map::new(),
        }
    }

    fn apply_edit(&mut self, label: String, value: String) {
        self.label = label;
        self.value = value;
    }
}

impl EditableItem for ChecklistItem {
    fn label(&self) -> &str {
        &self.label
    }

    fn value(&self) -> Option<&str> {
        None
    }

    fn create(label: String, _value: String) -> Self {
        Self {
            label,
            done: false,
            extra: Map::new(),
        }
    }

    fn apply_edit(&mut self, label: String, _value: String) {
        self.label = label;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditingContext {
    pub kind: CollectionKind,
    pub target: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorState {
    #[default]
    Idle,
    Editing(EditingContext),
}

/// Everything the modal needs to draw itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorForm {
    pub kind: CollectionKind,
    pub target: Option<usize>,
    pub title: String,
    pub label: String,
    pub value: String,
    pub value_required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationFailure {
    EmptyLabel,
    EmptyValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitRejection {
    NotEditing,
    Invalid(ValidationFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditFields {
    pub label: String,
    pub value: String,
}

impl EditFields {
    pub fn validate(kind: CollectionKind, label: &str, value: &str) -> Result<Self, ValidationFailure> {
        let label = label.trim();
        let value = value.trim();
        if label.is_empty() {
            return Err(ValidationFailure::EmptyLabel);
        }
        if kind.requires_value() && value.is_empty() {
            return Err(ValidationFailure::EmptyValue);
        }
        Ok(Self {
            label: label.to_string(),
            value: if kind.requires_value() { value.to_string() } else { String::new() },
        })
    }
}

#[derive(Debug, Default)]
pub struct Editor {
    state: EditorState,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, EditorState::Editing(_))
    }

    pub fn open_add(&mut self, kind: CollectionKind) -> EditorForm {
        self.state = EditorState::Editing(EditingContext { kind, target: None });
        EditorForm {
            kind,
            target: None,
            title: format!("Add {}", kind.as_str()),
            label: String::new(),
            value: String::new(),
            value_required: kind.requires_value(),
        }
    }

    pub fn open_edit(&mut self, kind: CollectionKind, index: usize, doc: &StateDocument) -> AppResult<EditorForm> {
        let (label, value) = match kind {
            CollectionKind::Link => current_fields(&doc.links, kind, index)?,
            CollectionKind::Template => current_fields(&doc.templates, kind, index)?,
            CollectionKind::Checklist => current_fields(&doc.checklist, kind, index)?,
        };
        self.state = EditorState::Editing(EditingContext {
            kind,
            target: Some(index),
        });
        Ok(EditorForm {
            kind,
            target: Some(index),
            title: format!("Edit {}", kind.as_str()),
            label,
            value,
            value_required: kind.requires_value(),
        })
    }

    /// Validates a save. On rejection the editor stays exactly as it was.
    pub fn prepare_commit(&self, label: &str, value: &str) -> Result<(EditingContext, EditFields), CommitRejection> {
        let EditorState::Editing(context) = self.state else {
            return Err(CommitRejection::NotEditing);
        };
        let fields = EditFields::validate(context.kind, label, value).map_err(CommitRejection::Invalid)?;
        Ok((context, fields))
    }

    pub fn finish(&mut self) {
        self.state = EditorState::Idle;
    }

    /// Returns whether an edit was actually discarded.
    pub fn cancel(&mut self) -> bool {
        let was_open = self.is_open();
        self.state = EditorState::Idle;
        was_open
    }
}

fn current_fields<T: EditableItem>(items: &[T], kind: CollectionKind, index: usize) -> AppResult<(String, String)> {
    let item = items.get(index).ok_or_else(|| out_of_range(kind, index, items.len()))?;
    Ok((item.label().to_string(), item.value().unwrap_or_default().to_string()))
}

/// Appends when `target` is `None`, otherwise edits the item in place.
/// Returns the index of the affected item.
pub fn commit_into<T: EditableItem>(
    items: &mut Vec<T>,
    kind: CollectionKind,
    target: Option<usize>,
    fields: EditFields,
) -> AppResult<usize> {
    match target {
        None => {
            items.push(T::create(fields.label, fields.value));
            Ok(items.len() - 1)
        }
        Some(index) => {
            let len = items.len();
            let item = items.get_mut(index).ok_or_else(|| out_of_range(kind, index, len))?;
            item.apply_edit(fields.label, fields.value);
            Ok(index)
        }
    }
}

pub fn remove_from<T>(items: &mut Vec<T>, kind: CollectionKind, index: usize) -> AppResult<T> {
    if index >= items.len() {
        return Err(out_of_range(kind, index, items.len()));
    }
    Ok(items.remove(index))
}

pub fn apply_commit(doc: &mut StateDocument, context: EditingContext, fields: EditFields) -> AppResult<usize> {
    match context.kind {
        CollectionKind::Link => commit_into(&mut doc.links, context.kind, context.target, fields),
        CollectionKind::Template => commit_into(&mut doc.templates, context.kind, context.target, fields),
        CollectionKind::Checklist => commit_into(&mut doc.checklist, context.kind, context.target, fields),
    }
}

pub fn apply_remove(doc: &mut StateDocument, kind: CollectionKind, index: usize) -> AppResult<()> {
    match kind {
        CollectionKind::Link => remove_from(&mut doc.links, kind, index).map(|_| ()),
        CollectionKind::Template => remove_from(&mut doc.templates, kind, index).map(|_| ()),
        CollectionKind::Checklist => remove_from(&mut doc.checklist, kind, index).map(|_| ()),
    }
}

fn out_of_range(kind: CollectionKind, index: usize, len: usize) -> AppError {
    AppError::NotFound(format!(
        "no {} at index {} ({} items)",
        kind.as_str(),
        index,
        len
    ))
}
