//! OAuth provider descriptor.

use std::sync::{PoisonError, RwLock};

use log::*;

use crate::error::{
    configuration_error, http_error, ConfigurationErrorKind, Error, ErrorKind, HttpErrorKind,
};
use crate::http::AuthenticatedClient;

/// User profile returned by a provider's user-info endpoint.
pub type UserInfo = serde_json::Map<String, serde_json::Value>;

/// Static description of one OAuth 2.0 identity provider.
///
/// Everything but the scope list is fixed at construction. The scope list can be replaced at
/// any time, including while flows are running; readers always see either the old list or
/// the new one.
#[derive(Debug)]
pub struct Provider {
    name: String,
    authorization_endpoint: String,
    token_endpoint: String,
    user_info_endpoint: String,
    scopes: RwLock<Vec<String>>,
}

impl Provider {
    /// Create a provider descriptor.
    ///
    /// Fails with `ConfigurationErrorKind::MissingField` naming the first empty field, or
    /// `ConfigurationErrorKind::EmptyScope` with the index of the first empty scope. An empty
    /// scope list is valid. Duplicate scopes are collapsed, keeping the first occurrence.
    pub fn new(
        name: &str,
        authorization_endpoint: &str,
        token_endpoint: &str,
        user_info_endpoint: &str,
        scopes: &[&str],
    ) -> Result<Self, Error> {
        let required = [
            ("name", name),
            ("authorization_endpoint", authorization_endpoint),
            ("token_endpoint", token_endpoint),
            ("user_info_endpoint", user_info_endpoint),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(configuration_error(
                    ConfigurationErrorKind::MissingField(field),
                    &format!("provider {} must not be empty", field),
                ));
            }
        }

        if let Some(index) = scopes.iter().position(|scope| scope.is_empty()) {
            return Err(configuration_error(
                ConfigurationErrorKind::EmptyScope(index),
                &format!("provider scope at index {} is empty", index),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            authorization_endpoint: authorization_endpoint.to_string(),
            token_endpoint: token_endpoint.to_string(),
            user_info_endpoint: user_info_endpoint.to_string(),
            scopes: RwLock::new(sanitize(scopes.iter().copied())),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn authorization_endpoint(&self) -> &str {
        &self.authorization_endpoint
    }

    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    pub fn user_info_endpoint(&self) -> &str {
        &self.user_info_endpoint
    }

    /// A copy of the current scope list.
    pub fn scopes(&self) -> Vec<String> {
        self.scopes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the scope list, silently dropping empty and duplicate entries.
    pub fn set_scopes<I, S>(&self, scopes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sanitized = sanitize(scopes);
        *self.scopes.write().unwrap_or_else(PoisonError::into_inner) = sanitized;
    }

    /// Fetch the user profile with a transport that already carries bearer authorization.
    ///
    /// Fails with `HttpErrorKind::Network` or `HttpErrorKind::Timeout` when the request cannot
    /// complete, `HttpErrorKind::Status` for non-2xx responses, and `HttpErrorKind::Decode`
    /// when the body is empty or not a JSON object.
    pub async fn fetch_user_info(&self, client: &AuthenticatedClient) -> Result<UserInfo, Error> {
        debug!("Fetching user info from {} provider", self.name);

        let response = client
            .get(&self.user_info_endpoint)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach {} user info endpoint: {:?}", self.name, e);
                Error::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} user info endpoint returned {}", self.name, status);
            return Err(http_error(
                HttpErrorKind::Status(status.as_u16()),
                &format!("user info request failed with status {}", status),
            ));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(http_error(HttpErrorKind::Decode, "empty user info response"));
        }

        serde_json::from_slice::<UserInfo>(&body).map_err(|e| {
            warn!("Failed to parse {} user info: {:?}", self.name, e);
            Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::Http(HttpErrorKind::Decode),
            }
        })
    }
}

fn sanitize<I, S>(scopes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sanitized: Vec<String> = Vec::new();
    for scope in scopes {
        let scope = scope.as_ref();
        if !scope.is_empty() && !sanitized.iter().any(|kept| kept == scope) {
            sanitized.push(scope.to_string());
        }
    }
    sanitized
}
