use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default callback address registered with the provider for local runs.
pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:4000/oauth/callback";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The OAuth client ID issued by the provider.
    #[arg(long, env)]
    client_id: String,

    /// The OAuth client secret issued by the provider.
    #[arg(long, env, hide_env_values = true)]
    client_secret: String,

    /// The callback URL registered with the provider.
    #[arg(long, env, default_value = DEFAULT_REDIRECT_URL)]
    redirect_url: String,

    /// The key used to seal the OAuth state parameter. Must be 16, 24 or 32 bytes long.
    #[arg(long, env, hide_env_values = true)]
    state_encryption_key: String,

    /// The identity provider to authenticate against: google, github, microsoft, or the
    /// name of a custom provider described by the endpoint flags below.
    #[arg(long, env, default_value = "google")]
    provider: String,

    /// Authorization endpoint of a custom provider.
    #[arg(long, env)]
    authorization_endpoint: Option<String>,

    /// Token endpoint of a custom provider.
    #[arg(long, env)]
    token_endpoint: Option<String>,

    /// User info endpoint of a custom provider.
    #[arg(long, env)]
    user_info_endpoint: Option<String>,

    /// A comma separated list of scopes to request. Well-known providers fall back to their
    /// default scopes when empty.
    #[arg(long, env, value_delimiter = ',', use_value_delimiter = true)]
    scopes: Vec<String>,

    /// Seconds an issued authorization state stays valid.
    #[arg(long, env, default_value_t = 600)]
    pub state_ttl_secs: u64,

    /// Timeout in seconds for each request to the provider
    #[arg(long, env, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Maximum number of retries for transient provider failures
    #[arg(long, env, default_value_t = 3)]
    pub http_max_retries: u32,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_url", &self.redirect_url)
            .field("state_encryption_key", &"[REDACTED]")
            .field("provider", &self.provider)
            .field("authorization_endpoint", &self.authorization_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("user_info_endpoint", &self.user_info_endpoint)
            .field("scopes", &self.scopes)
            .field("state_ttl_secs", &self.state_ttl_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("http_max_retries", &self.http_max_retries)
            .field("log_level_filter", &self.log_level_filter)
            .field("runtime_env", &self.runtime_env)
            .finish()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    pub fn state_encryption_key(&self) -> &[u8] {
        self.state_encryption_key.as_bytes()
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Requested scopes with blank entries from the comma list removed.
    pub fn scopes(&self) -> Vec<&str> {
        self.scopes
            .iter()
            .map(|scope| scope.trim())
            .filter(|scope| !scope.is_empty())
            .collect()
    }

    /// Authorization, token and user info endpoints of a custom provider, in that order.
    ///
    /// Returns `None` when no endpoint flag was given. When only some were given the missing
    /// ones are empty strings, which the provider descriptor rejects.
    pub fn endpoint_overrides(&self) -> Option<[&str; 3]> {
        let endpoints = [
            &self.authorization_endpoint,
            &self.token_endpoint,
            &self.user_info_endpoint,
        ];
        if endpoints.iter().all(|endpoint| endpoint.is_none()) {
            return None;
        }
        Some(endpoints.map(|endpoint| endpoint.as_deref().unwrap_or("")))
    }

    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.state_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
