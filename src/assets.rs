use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use crate::content::ContentRepository;
use crate::filename::unique_filename;
use crate::models::{Asset, AssetId, AssetMetadata, DocumentId};

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
    #[error("parent document {0} does not exist")]
    MissingParent(DocumentId),
    #[error("metadata generation failed for {path}: {source}")]
    Metadata {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A file written into the upload directory but not yet registered.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: PathBuf,
    /// Period directory relative to the upload root, e.g. `2026/10`.
    pub period: String,
    pub filename: String,
}

#[derive(Default)]
struct Registry {
    next_id: AssetId,
    assets: HashMap<AssetId, Asset>,
}

pub struct AssetLibrary {
    upload_dir: PathBuf,
    upload_url: String,
    content: Arc<ContentRepository>,
    registry: RwLock<Registry>,
}

impl AssetLibrary {
    /// Files land in `<upload_dir>/<YYYY>/<MM>/` and are published at the same
    /// relative path under `upload_url`, which is used verbatim.
    pub fn new(
        upload_dir: PathBuf,
        upload_url: impl Into<String>,
        content: Arc<ContentRepository>,
    ) -> Self {
        Self {
            upload_dir,
            upload_url: upload_url.into(),
            content,
            registry: RwLock::new(Registry::default()),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    fn current_period() -> String {
        Utc::now().format("%Y/%m").to_string()
    }

    /// Writes `bytes` into this period's directory under the first free
    /// variant of `filename`.
    pub async fn store_file(&self, filename: &str, bytes: &[u8]) -> Result<StoredFile, AssetError> {
        self.store_file_in(&Self::current_period(), filename, bytes)
            .await
    }

    async fn store_file_in(
        &self,
        period: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, AssetError> {
        let dir = self.upload_dir.join(period);
        tokio::fs::create_dir_all(&dir).await?;

        let filename = unique_filename(&dir, filename).await?;
        let path = dir.join(&filename);
        tokio::fs::write(&path, bytes).await?;

        Ok(StoredFile {
            path,
            period: period.to_string(),
            filename,
        })
    }

    /// Registers a stored file as an asset of `parent` and generates its
    /// metadata. The MIME type comes from the filename, then `fallback_mime`.
    pub async fn register(
        &self,
        parent: DocumentId,
        file: StoredFile,
        fallback_mime: Option<&str>,
    ) -> Result<AssetId, AssetError> {
        if !self.content.exists(parent) {
            return Err(AssetError::MissingParent(parent));
        }

        let mime = mime_guess::from_path(&file.filename)
            .first()
            .map(|m| m.essence_str().to_string())
            .or_else(|| {
                fallback_mime
                    .and_then(|ct| ct.split(';').next())
                    .map(|ct| ct.trim().to_string())
            })
            .unwrap_or_else(|| FALLBACK_MIME.to_string());

        let metadata = generate_metadata(&file.path).await?;
        let url = self.public_url(&file.period, &file.filename);

        let mut registry = self.registry.write();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.assets.insert(
            id,
            Asset {
                id,
                parent,
                path: file.path,
                filename: file.filename,
                url,
                mime,
                metadata,
            },
        );
        Ok(id)
    }

    pub fn get(&self, id: AssetId) -> Option<Asset> {
        self.registry.read().assets.get(&id).cloned()
    }

    pub fn url_of(&self, id: AssetId) -> Option<String> {
        self.registry.read().assets.get(&id).map(|a| a.url.clone())
    }

    pub fn for_document(&self, parent: DocumentId) -> Vec<Asset> {
        let mut assets: Vec<Asset> = self
            .registry
            .read()
            .assets
            .values()
            .filter(|a| a.parent == parent)
            .cloned()
            .collect();
        assets.sort_by_key(|a| a.id);
        assets
    }

    fn public_url(&self, period: &str, filename: &str) -> String {
        format!(
            "{}/{}/{}",
            self.upload_url.trim_end_matches('/'),
            period,
            urlencoding::encode(filename)
        )
    }
}

/// Size and, for raster formats the decoder recognizes, pixel dimensions.
async fn generate_metadata(path: &Path) -> Result<AssetMetadata, AssetError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| AssetError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;

    let dimensions = image::ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok());

    Ok(AssetMetadata {
        file_size: bytes.len() as u64,
        width: dimensions.map(|(w, _)| w),
        height: dimensions.map(|(_, h)| h),
    })
}
