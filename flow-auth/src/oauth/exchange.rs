//! Authorization code exchange against a provider's token endpoint.

use async_trait::async_trait;
use chrono::Utc;
use log::*;
use oauth2::basic::{BasicClient, BasicTokenType};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, RedirectUrl, TokenResponse, TokenUrl,
};
use secrecy::{ExposeSecret, SecretString};

use super::Tokens;
use crate::error::{Error, ErrorKind, ExchangeErrorKind};

/// Credentials the client presents to the token endpoint.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_url: String,
}

/// Trades an authorization code for tokens.
///
/// Every failure, whatever its cause, is reported as `ExchangeErrorKind::Rejected` with the
/// underlying error attached as the source.
#[async_trait]
pub trait CodeExchanger: Send + Sync {
    async fn exchange(
        &self,
        credentials: &ClientCredentials,
        token_endpoint: &str,
        code: &str,
    ) -> Result<Tokens, Error>;
}

/// Exchanger backed by the `oauth2` crate's authorization-code grant.
#[derive(Debug, Default, Clone, Copy)]
pub struct Oauth2Exchanger;

fn rejected<E>(err: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error {
        source: Some(Box::new(err)),
        error_kind: ErrorKind::Exchange(ExchangeErrorKind::Rejected),
    }
}

#[async_trait]
impl CodeExchanger for Oauth2Exchanger {
    async fn exchange(
        &self,
        credentials: &ClientCredentials,
        token_endpoint: &str,
        code: &str,
    ) -> Result<Tokens, Error> {
        let token_url = TokenUrl::new(token_endpoint.to_string()).map_err(rejected)?;
        // The code grant never visits the authorization endpoint.
        let auth_url = AuthUrl::new(token_endpoint.to_string()).map_err(rejected)?;
        let redirect_url = RedirectUrl::new(credentials.redirect_url.clone()).map_err(rejected)?;

        let client = BasicClient::new(
            ClientId::new(credentials.client_id.clone()),
            Some(ClientSecret::new(
                credentials.client_secret.expose_secret().clone(),
            )),
            auth_url,
            Some(token_url),
        )
        .set_redirect_uri(redirect_url);

        debug!("Exchanging authorization code at {}", token_endpoint);

        let response = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                warn!("Failed to exchange authorization code: {}", e);
                rejected(e)
            })?;

        let token_type = match response.token_type() {
            BasicTokenType::Bearer => "bearer".to_string(),
            BasicTokenType::Mac => "mac".to_string(),
            BasicTokenType::Extension(other) => other.clone(),
        };

        let tokens = Tokens {
            access_token: SecretString::new(response.access_token().secret().clone()),
            refresh_token: response
                .refresh_token()
                .map(|token| SecretString::new(token.secret().clone())),
            expires_at: response
                .expires_in()
                .and_then(|lifetime| chrono::Duration::from_std(lifetime).ok())
                .map(|lifetime| Utc::now() + lifetime),
            token_type,
            scopes: response
                .scopes()
                .map(|scopes| scopes.iter().map(|scope| scope.as_str().to_string()).collect())
                .unwrap_or_default(),
        };

        if tokens.refresh_token.is_none() {
            warn!("Token endpoint did not return a refresh token");
        }
        info!("Successfully exchanged authorization code for tokens");

        Ok(tokens)
    }
}
