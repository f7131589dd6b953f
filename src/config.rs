use std::net::SocketAddr;
use std::path::PathBuf;

use rand::RngCore;
use url::Url;

use crate::locator::raw_host;
use crate::models::{DocumentKind, Role};

// ── Defaults ─────────────────────────────────────────────────────────────────

const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_SITE_URL: &str = "http://localhost:8000";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_USERS: &str = "admin:administrator";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid bind address {0:?}")]
    InvalidBind(String),
    #[error("invalid {name} URL {value:?}")]
    InvalidUrl { name: &'static str, value: String },
    #[error("upload URL {upload:?} is not on the site host of {site:?}")]
    UploadHostMismatch { site: String, upload: String },
    #[error("invalid user entry {0:?}, expected name:role")]
    InvalidUser(String),
    #[error("unknown role {0:?}")]
    UnknownRole(String),
}

// ── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    /// Base URL of this site, as configured. Image hosts equal to its host are
    /// local.
    pub site_url: String,
    pub upload_dir: PathBuf,
    /// Public URL under which `upload_dir` is served. Shares the site host.
    pub upload_url: String,
    pub nonce_secret: Vec<u8>,
    /// Document kinds that get the editor panel and are eligible for vendoring.
    pub document_kinds: Vec<DocumentKind>,
    pub users: Vec<(String, Role)>,
    pub insecure_ssl: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults
    /// for every missing key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup("IMAGE_SAVER_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind_raw.clone()))?;

        let site_url =
            lookup("IMAGE_SAVER_SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
        check_url("site", &site_url)?;

        let upload_dir = PathBuf::from(
            lookup("IMAGE_SAVER_UPLOAD_DIR").unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string()),
        );

        let upload_url = lookup("IMAGE_SAVER_UPLOAD_URL").unwrap_or_else(|| {
            format!("{}/uploads", site_url.trim_end_matches('/'))
        });
        check_url("upload", &upload_url)?;
        if raw_host(&upload_url) != raw_host(&site_url) {
            return Err(ConfigError::UploadHostMismatch {
                site: site_url,
                upload: upload_url,
            });
        }

        let nonce_secret = match lookup("IMAGE_SAVER_NONCE_SECRET") {
            Some(secret) if !secret.is_empty() => secret.into_bytes(),
            _ => {
                let mut bytes = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut bytes);
                bytes
            }
        };

        let document_kinds = match lookup("IMAGE_SAVER_DOCUMENT_KINDS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(DocumentKind::new)
                .collect(),
            None => vec![DocumentKind::post(), DocumentKind::page()],
        };

        let users = parse_users(
            &lookup("IMAGE_SAVER_USERS").unwrap_or_else(|| DEFAULT_USERS.to_string()),
        )?;

        let insecure_ssl = lookup("IMAGE_SAVER_INSECURE_SSL").as_deref() == Some("1");

        Ok(Config {
            bind,
            site_url,
            upload_dir,
            upload_url,
            nonce_secret,
            document_kinds,
            users,
            insecure_ssl,
        })
    }
}

fn check_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|_| ConfigError::InvalidUrl {
            name,
            value: value.to_string(),
        })
}

fn parse_users(raw: &str) -> Result<Vec<(String, Role)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (name, role) = entry
                .split_once(':')
                .ok_or_else(|| ConfigError::InvalidUser(entry.to_string()))?;
            let role = role
                .trim()
                .parse::<Role>()
                .map_err(|_| ConfigError::UnknownRole(role.trim().to_string()))?;
            Ok((name.trim().to_string(), role))
        })
        .collect()
}
