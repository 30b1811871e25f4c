//! # flow-auth
//!
//! OAuth 2.0 authorization code flow for server-side applications:
//! - Sealed `state` parameters carrying the caller's CSRF token and application context
//!   (AES-GCM, versioned, URL safe)
//! - A single-use ledger so every issued state is accepted at most once
//! - Provider descriptors, including ready-made ones for common identity providers
//! - Code exchange and user-info retrieval over a bearer-authenticated HTTP client
//!
//! ## Usage
//!
//! ```rust,ignore
//! use flow_auth::{oauth::Client, providers};
//!
//! let provider = Arc::new(providers::google(&[])?);
//! let client: Client<serde_json::Value> =
//!     Client::new(client_id, client_secret, redirect_url, key, provider)?;
//!
//! let request = client.generate_authorization_url("", &json!({"return_to": "/"})).await?;
//! // redirect to request.url, then on the callback:
//! let validated = client.validate_state(&state).await?;
//! let tokens = client.exchange_code(&code).await?;
//! let user = client.fetch_user_info(&tokens).await?;
//! ```

pub mod error;
pub mod http;
pub mod oauth;
pub mod providers;
pub mod state;

pub use error::{Error, ErrorKind};
