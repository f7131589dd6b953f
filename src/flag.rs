use std::fmt;
use std::sync::Arc;

use crate::content::ContentRepository;
use crate::deferred::DeferredQueue;
use crate::models::{DocumentId, DocumentKind};
use crate::nonce::NonceIssuer;
use crate::permissions::Permissions;

pub const META_KEY: &str = "_auto_save_remote_images";
pub const NONCE_PURPOSE: &str = "save_remote_images_flag";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptIn {
    Yes,
    #[default]
    No,
}

impl OptIn {
    /// Only the exact literal `yes` opts in.
    pub fn normalize(raw: &str) -> Self {
        if raw == "yes" {
            OptIn::Yes
        } else {
            OptIn::No
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OptIn::Yes => "yes",
            OptIn::No => "no",
        }
    }
}

impl fmt::Display for OptIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is submitting a save, and with what token.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub nonce: Option<String>,
    pub autosave: bool,
}

pub struct FlagStore {
    content: Arc<ContentRepository>,
    permissions: Arc<Permissions>,
    nonces: Arc<NonceIssuer>,
    kinds: Vec<DocumentKind>,
    queue: DeferredQueue,
}

impl FlagStore {
    pub fn new(
        content: Arc<ContentRepository>,
        permissions: Arc<Permissions>,
        nonces: Arc<NonceIssuer>,
        kinds: Vec<DocumentKind>,
        queue: DeferredQueue,
    ) -> Self {
        Self {
            content,
            permissions,
            nonces,
            kinds,
            queue,
        }
    }

    pub fn supports(&self, kind: &DocumentKind) -> bool {
        self.kinds.contains(kind)
    }

    pub fn read(&self, document: DocumentId) -> OptIn {
        match self.content.meta(document, META_KEY).as_deref() {
            Some("yes") => OptIn::Yes,
            _ => OptIn::No,
        }
    }

    /// Persists the submitted flag. Every rejected submission is a silent
    /// no-op: bad or missing token, autosave, unsupported kind, or no edit
    /// permission. A stored `yes` queues one vendoring run for the document.
    pub fn write(&self, document: DocumentId, raw: Option<&str>, credentials: &Credentials) {
        let Some(token) = credentials.nonce.as_deref() else {
            return;
        };
        if !self
            .nonces
            .verify(token, NONCE_PURPOSE, &credentials.user, document)
        {
            tracing::debug!(document, "remote image flag: bad token");
            return;
        }
        if credentials.autosave {
            return;
        }
        let Some(doc) = self.content.get(document) else {
            return;
        };
        if !self.supports(&doc.kind) || !self.permissions.can_edit(&credentials.user, &doc) {
            return;
        }

        let value = raw.map(OptIn::normalize).unwrap_or_default();
        if self.content.set_meta(document, META_KEY, value.as_str()).is_err() {
            return;
        }
        if value == OptIn::Yes {
            self.queue.schedule(document);
        }
    }
}
