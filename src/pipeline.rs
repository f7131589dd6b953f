use std::sync::Arc;

use crate::assets::AssetLibrary;
use crate::content::ContentRepository;
use crate::fetch::HttpFetcher;
use crate::filename::derive_filename;
use crate::locator::{classify, extract, ImageClass};
use crate::models::{AssetId, DocumentId};

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum VendorError {
    #[error("image host unreachable: {0}")]
    HttpUnreachable(String),
    #[error("not an image: {0}")]
    NotAnImage(String),
    #[error("could not write image: {0}")]
    WriteFailure(String),
    #[error("could not register asset: {0}")]
    RegistrationFailure(String),
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

pub struct Pipeline {
    content: Arc<ContentRepository>,
    assets: Arc<AssetLibrary>,
    fetcher: HttpFetcher,
    site_url: String,
}

impl Pipeline {
    pub fn new(
        content: Arc<ContentRepository>,
        assets: Arc<AssetLibrary>,
        fetcher: HttpFetcher,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            content,
            assets,
            fetcher,
            site_url: site_url.into(),
        }
    }

    /// Vendors every remote image in the document, one at a time and in
    /// document order. A failed image keeps its original URL.
    ///
    /// The rewritten body goes straight to the repository, so no save hooks
    /// fire and the run cannot re-trigger itself.
    pub async fn process(&self, document: DocumentId) {
        let Some(doc) = self.content.get(document) else {
            return;
        };
        if doc.body.is_empty() {
            return;
        }

        let mut body = doc.body.clone();
        let mut dirty = false;

        for url in extract(&doc.body) {
            if classify(url, &self.site_url) != ImageClass::Remote {
                continue;
            }
            let asset = match self.vendor(url, document).await {
                Ok(asset) => asset,
                Err(e) => {
                    tracing::debug!(document, url, error = %e, "skipping remote image");
                    continue;
                }
            };
            if let Some(local_url) = self.assets.url_of(asset) {
                tracing::info!(document, url, local_url = %local_url, "vendored remote image");
                body = body.replace(url, &local_url);
                dirty = true;
            }
        }

        if dirty {
            if let Err(e) = self.content.update_body(document, body) {
                tracing::warn!(document, error = %e, "could not save vendored body");
            }
        }
    }

    /// Downloads one image and registers it as an asset of `document`.
    pub async fn vendor(&self, url: &str, document: DocumentId) -> Result<AssetId, VendorError> {
        let head = self
            .fetcher
            .head(url)
            .await
            .map_err(|e| VendorError::HttpUnreachable(e.to_string()))?;
        if head.status != 200 {
            return Err(VendorError::HttpUnreachable(format!(
                "HEAD returned {}",
                head.status
            )));
        }

        let content_type = head.content_type;
        if let Some(ct) = content_type.as_deref() {
            if !ct.starts_with("image/") {
                return Err(VendorError::NotAnImage(ct.to_string()));
            }
        }

        let got = self
            .fetcher
            .get(url)
            .await
            .map_err(|e| VendorError::HttpUnreachable(e.to_string()))?;
        if got.status != 200 {
            return Err(VendorError::HttpUnreachable(format!(
                "GET returned {}",
                got.status
            )));
        }
        if got.body.is_empty() {
            return Err(VendorError::HttpUnreachable("empty body".to_string()));
        }

        let filename = derive_filename(url, content_type.as_deref());
        let stored = self
            .assets
            .store_file(&filename, &got.body)
            .await
            .map_err(|e| VendorError::WriteFailure(e.to_string()))?;

        let path = stored.path.clone();
        let registered = self
            .assets
            .register(
                document,
                stored,
                content_type.as_deref().or(got.content_type.as_deref()),
            )
            .await;
        match registered {
            Ok(id) => Ok(id),
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(
                        path = %path.display(),
                        error = %rm,
                        "could not remove unregistered image"
                    );
                }
                Err(VendorError::RegistrationFailure(e.to_string()))
            }
        }
    }
}
