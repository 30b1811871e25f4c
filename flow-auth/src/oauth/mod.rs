//! OAuth 2.0 authorization code flow.

mod client;
mod exchange;
mod provider;
mod token;

pub use client::{AuthorizationRequest, Client, ValidatedState};
pub use exchange::{ClientCredentials, CodeExchanger, Oauth2Exchanger};
pub use provider::{Provider, UserInfo};
pub use token::Tokens;
