use crate::errors::AppError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Key under which the whole state document lives in the local store.
pub const STORAGE_KEY: &str = "supportAssistantData";

pub const CUSTOM_LINK_META: &str = "Custom link.";
pub const CUSTOM_TEMPLATE_META: &str = "Custom response.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionKind {
    Link,
    Template,
    Checklist,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [Self::Link, Self::Template, Self::Checklist];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Template => "template",
            Self::Checklist => "checklist",
        }
    }

    /// Name of the document field holding this collection.
    pub fn collection_key(self) -> &'static str {
        match self {
            Self::Link => "links",
            Self::Template => "templates",
            Self::Checklist => "checklist",
        }
    }

    pub fn requires_value(self) -> bool {
        !matches!(self, Self::Checklist)
    }
}

impl FromStr for CollectionKind {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "link" | "links" => Ok(Self::Link),
            "template" | "templates" => Ok(Self::Template),
            "checklist" => Ok(Self::Checklist),
            other => Err(AppError::Validation(format!("unknown collection kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoteField {
    TicketNumber,
    ConfigurationId,
    Domain,
}

impl NoteField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TicketNumber => "ticketNumber",
            Self::ConfigurationId => "configurationId",
            Self::Domain => "domain",
        }
    }
}

impl FromStr for NoteField {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "ticket" | "ticketNumber" | "ticket-number" => Ok(Self::TicketNumber),
            "configuration" | "configurationId" | "configuration-id" => Ok(Self::ConfigurationId),
            "domain" => Ok(Self::Domain),
            other => Err(AppError::Validation(format!("unknown note field: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkItem {
    pub label: String,
    pub value: String,
    #[serde(default)]
    pub meta: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateItem {
    pub label: String,
    pub value: String,
    #[serde(default)]
    pub meta: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub label: String,
    #[serde(default)]
    pub done: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Notes {
    pub ticket_number: String,
    pub configuration_id: String,
    pub domain: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Notes {
    pub fn get(&self, field: NoteField) -> &str {
        match field {
            NoteField::TicketNumber => &self.ticket_number,
            NoteField::ConfigurationId => &self.configuration_id,
            NoteField::Domain => &self.domain,
        }
    }

    pub fn set(&mut self, field: NoteField, value: String) {
        match field {
            NoteField::TicketNumber => self.ticket_number = value,
            NoteField::ConfigurationId => self.configuration_id = value,
            NoteField::Domain => self.domain = value,
        }
    }
}

/// The single persisted aggregate. Unknown top-level fields written by other
/// versions are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDocument {
    pub links: Vec<LinkItem>,
    pub templates: Vec<TemplateItem>,
    pub checklist: Vec<ChecklistItem>,
    pub notes: Notes,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StateDocument {
    pub fn len_of(&self, kind: CollectionKind) -> usize {
        match kind {
            CollectionKind::Link => self.links.len(),
            CollectionKind::Template => self.templates.len(),
            CollectionKind::Checklist => self.checklist.len(),
        }
    }
}

fn link(label: &str, value: &str, meta: &str) -> LinkItem {
    LinkItem {
        label: label.to_string(),
        value: value.to_string(),
        meta: meta.to_string(),
        extra: Map::new(),
    }
}

fn template(label: &str, value: &str, meta: &str) -> TemplateItem {
    TemplateItem {
        label: label.to_string(),
        value: value.to_string(),
        meta: meta.to_string(),
        extra: Map::new(),
    }
}

fn task(label: &str) -> ChecklistItem {
    ChecklistItem {
        label: label.to_string(),
        done: false,
        extra: Map::new(),
    }
}

pub(crate) static DEFAULT_DOCUMENT: Lazy<StateDocument> = Lazy::new(|| StateDocument {
    links: vec![
        link(
            "Ticket Queue",
            "https://support.example.com/queue",
            "Open the live ticket backlog.",
        ),
        link(
            "Knowledge Base",
            "https://support.example.com/kb",
            "Search approved troubleshooting steps.",
        ),
        link("Status Page", "https://status.example.com", "Check ongoing incidents."),
    ],
    templates: vec![
        template(
            "First response",
            "Hi there! Thanks for reaching out. I am looking into this now and will share an update shortly.",
            "Standard acknowledgement.",
        ),
        template(
            "Need more info",
            "Can you share the exact time of the issue, affected user email, and any screenshots or error messages?",
            "Gather missing details.",
        ),
        template(
            "Resolution confirmation",
            "We have deployed a fix. Please confirm if the issue is resolved on your end.",
            "Close-the-loop response.",
        ),
    ],
    checklist: vec![
        task("Review overnight escalations"),
        task("Check open high-priority tickets"),
        task("Send end-of-day summary"),
    ],
    notes: Notes::default(),
    extra: Map::new(),
});
