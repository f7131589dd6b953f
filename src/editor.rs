use std::sync::Arc;

use crate::content::ContentRepository;
use crate::flag::{Credentials, FlagStore, OptIn, NONCE_PURPOSE};
use crate::models::{Document, DocumentId, EditorPanel, PanelChoice, SaveRequest};
use crate::nonce::NonceIssuer;
use crate::permissions::Permissions;

pub const PANEL_ID: &str = "remote-images";
pub const NONCE_FIELD: &str = "remote_images_nonce";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("document {0} not found")]
    NotFound(DocumentId),
    #[error("not allowed to edit document {0}")]
    Forbidden(DocumentId),
    #[error("document kind {0:?} has no remote image panel")]
    Unsupported(String),
}

pub struct Editor {
    content: Arc<ContentRepository>,
    permissions: Arc<Permissions>,
    nonces: Arc<NonceIssuer>,
    flags: FlagStore,
}

impl Editor {
    pub fn new(
        content: Arc<ContentRepository>,
        permissions: Arc<Permissions>,
        nonces: Arc<NonceIssuer>,
        flags: FlagStore,
    ) -> Self {
        Self {
            content,
            permissions,
            nonces,
            flags,
        }
    }

    pub fn panel(&self, id: DocumentId, user: &str) -> Result<EditorPanel, EditorError> {
        let doc = self.editable(id, user)?;
        if !self.flags.supports(&doc.kind) {
            return Err(EditorError::Unsupported(doc.kind.to_string()));
        }

        Ok(EditorPanel {
            id: PANEL_ID,
            title: "Save remote images",
            choices: vec![
                PanelChoice {
                    value: OptIn::Yes.as_str(),
                    label: "Yes",
                },
                PanelChoice {
                    value: OptIn::No.as_str(),
                    label: "No",
                },
            ],
            selected: self.flags.read(id).as_str(),
            caption: "Choose \"Yes\" to download remote images into the media library when this document is saved.",
            nonce_field: NONCE_FIELD,
            nonce: self.nonces.create(NONCE_PURPOSE, user, id),
        })
    }

    /// Applies a save submission, then runs the save hooks. The remote image
    /// flag hook may queue a vendoring job; it runs after this returns.
    pub fn save(
        &self,
        id: DocumentId,
        user: &str,
        request: SaveRequest,
    ) -> Result<Document, EditorError> {
        self.editable(id, user)?;

        if let Some(title) = request.title {
            self.content
                .update_title(id, title)
                .map_err(|_| EditorError::NotFound(id))?;
        }
        if let Some(body) = request.body {
            self.content
                .update_body(id, body)
                .map_err(|_| EditorError::NotFound(id))?;
        }

        let credentials = Credentials {
            user: user.to_string(),
            nonce: request.remote_images_nonce,
            autosave: request.autosave,
        };
        self.flags
            .write(id, request.save_remote_images.as_deref(), &credentials);

        self.content.get(id).ok_or(EditorError::NotFound(id))
    }

    fn editable(&self, id: DocumentId, user: &str) -> Result<Document, EditorError> {
        let doc = self.content.get(id).ok_or(EditorError::NotFound(id))?;
        if !self.permissions.can_edit(user, &doc) {
            return Err(EditorError::Forbidden(id));
        }
        Ok(doc)
    }
}
