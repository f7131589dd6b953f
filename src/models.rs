use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type DocumentId = u64;
pub type AssetId = u64;

// ── Documents ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentKind(String);

impl DocumentKind {
    pub fn new(kind: impl Into<String>) -> Self {
        DocumentKind(kind.into())
    }

    pub fn post() -> Self {
        DocumentKind::new("post")
    }

    pub fn page() -> Self {
        DocumentKind::new("page")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: DocumentId,
    pub kind: DocumentKind,
    pub title: String,
    pub body: String,
    pub author: String,
    pub meta: HashMap<String, String>,
}

// ── Users ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Editor,
    Author,
    Subscriber,
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "administrator" => Ok(Role::Administrator),
            "editor" => Ok(Role::Editor),
            "author" => Ok(Role::Author),
            "subscriber" => Ok(Role::Subscriber),
            _ => Err(()),
        }
    }
}

// ── Assets ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetMetadata {
    pub file_size: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Asset {
    pub id: AssetId,
    pub parent: DocumentId,
    pub path: PathBuf,
    pub filename: String,
    pub url: String,
    pub mime: String,
    pub metadata: AssetMetadata,
}

// ── Request / response bodies ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub kind: DocumentKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// The editor's save form. `save_remote_images` and `remote_images_nonce` are
/// the side-panel fields; everything else belongs to the host's own form.
#[derive(Debug, Default, Deserialize)]
pub struct SaveRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub save_remote_images: Option<String>,
    pub remote_images_nonce: Option<String>,
    #[serde(default)]
    pub autosave: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct PanelChoice {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct EditorPanel {
    pub id: &'static str,
    pub title: &'static str,
    pub choices: Vec<PanelChoice>,
    pub selected: &'static str,
    pub caption: &'static str,
    pub nonce_field: &'static str,
    pub nonce: String,
}
