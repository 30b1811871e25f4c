//! Endpoints and default scopes for well-known identity providers.

use crate::error::{configuration_error, ConfigurationErrorKind, Error};
use crate::oauth::Provider;

/// Names accepted by [`by_name`].
pub const WELL_KNOWN: [&str; 3] = ["google", "github", "microsoft"];

const GOOGLE_DEFAULT_SCOPES: &[&str] = &["openid", "email", "profile"];
const GITHUB_DEFAULT_SCOPES: &[&str] = &["read:user", "user:email"];
const MICROSOFT_DEFAULT_SCOPES: &[&str] = &["openid", "email", "profile", "offline_access"];

fn scopes_or<'a>(scopes: &'a [&'a str], defaults: &'a [&'a str]) -> &'a [&'a str] {
    if scopes.is_empty() {
        defaults
    } else {
        scopes
    }
}

/// Google accounts. An empty `scopes` slice requests `openid email profile`.
pub fn google(scopes: &[&str]) -> Result<Provider, Error> {
    Provider::new(
        "google",
        "https://accounts.google.com/o/oauth2/v2/auth",
        "https://oauth2.googleapis.com/token",
        "https://openidconnect.googleapis.com/v1/userinfo",
        scopes_or(scopes, GOOGLE_DEFAULT_SCOPES),
    )
}

/// GitHub OAuth apps. An empty `scopes` slice requests `read:user user:email`.
pub fn github(scopes: &[&str]) -> Result<Provider, Error> {
    Provider::new(
        "github",
        "https://github.com/login/oauth/authorize",
        "https://github.com/login/oauth/access_token",
        "https://api.github.com/user",
        scopes_or(scopes, GITHUB_DEFAULT_SCOPES),
    )
}

/// Microsoft identity platform (v2.0 endpoints) for `tenant`, which may be a tenant id or
/// one of `common`, `organizations` and `consumers`.
pub fn microsoft(tenant: &str, scopes: &[&str]) -> Result<Provider, Error> {
    if tenant.is_empty() {
        return Err(configuration_error(
            ConfigurationErrorKind::MissingField("tenant"),
            "microsoft tenant must not be empty",
        ));
    }

    Provider::new(
        "microsoft",
        &format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/authorize",
            tenant
        ),
        &format!("https://login.microsoftonline.com/{}/oauth2/v2.0/token", tenant),
        "https://graph.microsoft.com/oidc/userinfo",
        scopes_or(scopes, MICROSOFT_DEFAULT_SCOPES),
    )
}

/// Look up a well-known provider by case-insensitive name. Microsoft uses the `common` tenant.
pub fn by_name(name: &str, scopes: &[&str]) -> Result<Provider, Error> {
    match name.to_ascii_lowercase().as_str() {
        "google" => google(scopes),
        "github" => github(scopes),
        "microsoft" => microsoft("common", scopes),
        _ => Err(configuration_error(
            ConfigurationErrorKind::UnknownProvider,
            &format!("unknown provider {:?}, expected one of {:?}", name, WELL_KNOWN),
        )),
    }
}
