use anyhow::{Context, Result};
use chrono::Duration;
use clap::Parser;
use dialoguer::{Confirm, Input, Password};
use std::io::Write;
use std::path::PathBuf;

use crate::auth::{Credential, TokenPolicy};

pub const DEFAULT_BASE_URL: &str = "https://api.c2m.com/v2";

/// C2M API client - submits a job using two-tier JWT authentication
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// C2M API base URL
    #[arg(short, long, env = "C2M_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Auth endpoint base URL (defaults to the API base URL)
    #[arg(long, env = "C2M_AUTH_URL")]
    pub auth_url: Option<String>,

    /// Client ID for the long-term token grant
    #[arg(short = 'i', long, env = "C2M_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Client secret for the long-term token grant
    #[arg(short = 's', long, env = "C2M_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Scopes requested for the long-term token (comma separated)
    #[arg(
        long,
        env = "C2M_LONG_SCOPES",
        value_delimiter = ',',
        default_value = "jobs:submit,jobs:read,templates:read"
    )]
    pub long_scopes: Vec<String>,

    /// Scopes requested for short-term tokens (comma separated)
    #[arg(long, env = "C2M_SHORT_SCOPES", value_delimiter = ',', default_value = "jobs:submit")]
    pub short_scopes: Vec<String>,

    /// Requested long-term token lifetime in seconds
    #[arg(long, env = "C2M_LONG_TOKEN_TTL", default_value = "2592000")]
    pub long_token_ttl: u64,

    /// Seconds before expiry at which a short-term token is refreshed
    #[arg(long, env = "C2M_REFRESH_MARGIN", default_value = "60")]
    pub refresh_margin: i64,

    /// Re-acquire the long-term token once if the short token endpoint rejects it
    #[arg(long, env = "C2M_REACQUIRE_ON_REJECTION")]
    pub reacquire_on_rejection: bool,

    /// JSON file with the job to submit (defaults to a sample letter)
    #[arg(short, long, env = "C2M_JOB_FILE")]
    pub job_file: Option<String>,

    /// Revoke the short-term token after submitting
    #[arg(long)]
    pub revoke_after: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Endpoints
    pub base_url: String,
    pub auth_url: String,

    // Credentials
    pub client_id: String,
    pub client_secret: String,

    // Token policy
    pub long_scopes: Vec<String>,
    pub long_token_ttl: u64,
    pub short_scopes: Vec<String>,
    pub refresh_margin: i64,
    pub reacquire_on_rejection: bool,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Job
    pub job_file: Option<PathBuf>,
    pub revoke_after: bool,

    pub log_level: String,
}

impl Config {
    /// Load configuration with priority: CLI > ENV (.env included) > interactive setup > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let mut args = CliArgs::parse();

        if needs_interactive_setup(&args) {
            let interactive = run_interactive_setup(&args.base_url)?;
            args.client_id = Some(interactive.client_id);
            args.client_secret = Some(interactive.client_secret);
            args.base_url = interactive.base_url;
        }

        Self::from_args(args)
    }

    /// Build configuration from parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let client_id = args
            .client_id
            .context("C2M_CLIENT_ID is required (use -i or set C2M_CLIENT_ID env var)")?;
        let client_secret = args
            .client_secret
            .context("C2M_CLIENT_SECRET is required (use -s or set C2M_CLIENT_SECRET env var)")?;

        let base_url = args.base_url.trim_end_matches('/').to_string();
        let auth_url = args
            .auth_url
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| base_url.clone());

        Ok(Config {
            base_url,
            auth_url,
            client_id,
            client_secret,
            long_scopes: clean_scopes(args.long_scopes),
            long_token_ttl: args.long_token_ttl,
            short_scopes: clean_scopes(args.short_scopes),
            refresh_margin: args.refresh_margin,
            reacquire_on_rejection: args.reacquire_on_rejection,
            http_connect_timeout: std::env::var("HTTP_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            http_request_timeout: args.http_timeout,
            job_file: args.job_file.map(|s| expand_tilde(&s)),
            revoke_after: args.revoke_after,
            log_level: args.log_level,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            anyhow::bail!("C2M_CLIENT_ID cannot be empty");
        }
        if self.client_secret.is_empty() {
            anyhow::bail!("C2M_CLIENT_SECRET cannot be empty");
        }

        for (name, url) in [("C2M_BASE_URL", &self.base_url), ("C2M_AUTH_URL", &self.auth_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("{} must be an http(s) URL: {}", name, url);
            }
        }

        if self.long_scopes.is_empty() || self.short_scopes.is_empty() {
            anyhow::bail!("Token scopes cannot be empty");
        }

        if self.refresh_margin < 0 {
            anyhow::bail!("C2M_REFRESH_MARGIN cannot be negative");
        }
        if self.refresh_margin as u64 > self.long_token_ttl {
            anyhow::bail!(
                "C2M_REFRESH_MARGIN ({}s) cannot exceed C2M_LONG_TOKEN_TTL ({}s)",
                self.refresh_margin,
                self.long_token_ttl
            );
        }

        if let Some(ref path) = self.job_file {
            if !path.exists() {
                anyhow::bail!("C2M_JOB_FILE does not exist: {}", path.display());
            }
        }

        Ok(())
    }

    pub fn credential(&self) -> Credential {
        Credential::new(&self.client_id, &self.client_secret)
    }

    pub fn token_policy(&self) -> TokenPolicy {
        TokenPolicy {
            long_scopes: self.long_scopes.clone(),
            long_ttl_seconds: self.long_token_ttl,
            short_scopes: self.short_scopes.clone(),
            // Out-of-range margins saturate instead of panicking
            refresh_margin: Duration::try_seconds(self.refresh_margin).unwrap_or(Duration::MAX),
            reacquire_on_rejection: self.reacquire_on_rejection,
        }
    }
}

/// Trim scope names and drop empty entries
fn clean_scopes(scopes: Vec<String>) -> Vec<String> {
    scopes
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

// === Interactive Setup ===

/// Check if interactive setup is needed (no .env file and missing credentials)
pub fn needs_interactive_setup(args: &CliArgs) -> bool {
    let env_file_exists = std::path::Path::new(".env").exists();
    !env_file_exists && (args.client_id.is_none() || args.client_secret.is_none())
}

/// Configuration collected from interactive setup
#[derive(Debug, Clone)]
pub struct InteractiveConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
}

/// Prompt for the client credential and optionally save it to .env
pub fn run_interactive_setup(default_base_url: &str) -> Result<InteractiveConfig> {
    println!();
    println!("C2M client - first time setup");
    println!("No credentials found. Enter the client credential issued for your account.");
    println!();

    let client_id: String = Input::new()
        .with_prompt("Client ID (C2M_CLIENT_ID)")
        .interact_text()
        .context("Failed to read C2M_CLIENT_ID")?;

    let client_secret: String = Password::new()
        .with_prompt("Client secret (C2M_CLIENT_SECRET)")
        .interact()
        .context("Failed to read C2M_CLIENT_SECRET")?;

    if client_secret.is_empty() {
        anyhow::bail!("C2M_CLIENT_SECRET cannot be empty");
    }

    let base_url: String = Input::new()
        .with_prompt("API base URL")
        .default(default_base_url.to_string())
        .interact_text()
        .context("Failed to read API base URL")?;

    let config = InteractiveConfig {
        client_id,
        client_secret,
        base_url,
    };

    println!();
    let save_to_env = Confirm::new()
        .with_prompt("Save configuration to .env file?")
        .default(true)
        .interact()
        .context("Failed to read save confirmation")?;

    if save_to_env {
        save_env_file(&config)?;
        println!("Configuration saved to .env file");
    }

    println!();
    Ok(config)
}

fn render_env_file(config: &InteractiveConfig) -> String {
    format!(
        r#"# C2M Client Configuration
# Generated by interactive setup

# Client credential for the long-term token grant (required)
C2M_CLIENT_ID={}
C2M_CLIENT_SECRET={}

# API base URL
C2M_BASE_URL={}

# Logging (trace, debug, info, warn, error)
LOG_LEVEL=info
"#,
        config.client_id, config.client_secret, config.base_url,
    )
}

/// Save configuration to .env file
fn save_env_file(config: &InteractiveConfig) -> Result<()> {
    let mut file = std::fs::File::create(".env").context("Failed to create .env file")?;
    file.write_all(render_env_file(config).as_bytes())
        .context("Failed to write .env file")?;

    Ok(())
}
