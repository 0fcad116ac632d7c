// C2M client - library root

pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;

pub use auth::{Credential, ShortToken, TokenManager, TokenPolicy};
pub use error::{AuthError, ClientError};
pub use http_client::C2mClient;
