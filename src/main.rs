use std::sync::Arc;

mod assets;
mod config;
mod content;
mod deferred;
mod editor;
mod fetch;
mod filename;
mod flag;
mod locator;
mod models;
mod nonce;
mod permissions;
mod pipeline;
mod routes;

use assets::AssetLibrary;
use config::Config;
use content::ContentRepository;
use deferred::DeferredQueue;
use editor::Editor;
use fetch::HttpFetcher;
use flag::FlagStore;
use nonce::NonceIssuer;
use permissions::Permissions;
use pipeline::Pipeline;
use routes::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let content = Arc::new(ContentRepository::new());
    let permissions = Arc::new(Permissions::new(config.users.clone()));
    let nonces = Arc::new(NonceIssuer::new(config.nonce_secret.clone()));
    let assets = Arc::new(AssetLibrary::new(
        config.upload_dir.clone(),
        config.upload_url.clone(),
        content.clone(),
    ));

    let (queue, jobs) = DeferredQueue::new();
    let pipeline = Arc::new(Pipeline::new(
        content.clone(),
        assets.clone(),
        HttpFetcher::new(config.insecure_ssl)?,
        config.site_url.clone(),
    ));
    tokio::spawn(deferred::run_worker(jobs, pipeline));

    let flags = FlagStore::new(
        content.clone(),
        permissions.clone(),
        nonces.clone(),
        config.document_kinds.clone(),
        queue,
    );
    let editor = Arc::new(Editor::new(
        content.clone(),
        permissions.clone(),
        nonces,
        flags,
    ));

    let app = routes::router(AppState {
        content,
        permissions,
        assets,
        editor,
    });

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(
        site = %config.site_url,
        uploads = %config.upload_dir.display(),
        "listening on {}",
        listener.local_addr()?
    );
    axum::serve(listener, app).await?;
    Ok(())
}
