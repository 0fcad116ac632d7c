use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use c2m_client::{
    auth::TokenManager,
    config::Config,
    http_client::{build_http_client, C2mClient},
    models::JobRequest,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("C2M client starting (api: {}, auth: {})", config.base_url, config.auth_url);

    // One pooled HTTP client for both token exchanges and API calls
    let http = build_http_client(config.http_connect_timeout, config.http_request_timeout)?;

    let token_manager = Arc::new(TokenManager::with_client(
        config.credential(),
        config.auth_url.clone(),
        config.token_policy(),
        http.clone(),
    ));
    let client = C2mClient::with_client(token_manager.clone(), config.base_url.clone(), http);

    let job = match config.job_file {
        Some(ref path) => load_job(path)?,
        None => {
            tracing::info!("No job file given, submitting sample letter");
            JobRequest::sample()
        }
    };

    let outcome = client.submit_job(&job).await;

    if config.revoke_after {
        match token_manager.revoke_short_token().await {
            Ok(true) => tracing::info!("Short-term token revoked"),
            Ok(false) => tracing::debug!("No short-term token to revoke"),
            Err(e) => tracing::warn!("Failed to revoke short-term token: {}", e),
        }
    }

    match outcome {
        Ok(result) => {
            println!(
                "Job submitted: {}",
                serde_json::to_string_pretty(&result).unwrap_or_default()
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Job submission failed: {}", e);
            Err(e).context("Job submission failed")
        }
    }
}

/// Read a job request from a JSON file
fn load_job(path: &Path) -> Result<JobRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse job file: {}", path.display()))
}
