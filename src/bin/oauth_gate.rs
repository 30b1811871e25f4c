use flow_auth::http::HttpClientConfig;
use flow_auth::oauth::{Client, Provider, Tokens};
use flow_auth::providers;
use flow_auth::state::MemoryLedger;
use flow_auth::Error;
use log::{debug, error, info, warn};
use secrecy::SecretString;
use serde_json::json;
use service::{config::Config, logging::Logger};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
    }

    info!(
        "Starting {} sign-in [{}]",
        config.provider(),
        config.runtime_env()
    );
    debug!("{:?}", config);

    let client = match build_client(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to configure OAuth client: {e}");
            std::process::exit(1);
        }
    };

    let context = json!({ "runtime_env": config.runtime_env().to_string() });
    let request = client
        .generate_authorization_url("", &context)
        .await
        .unwrap_or_else(|e| fail(e));

    println!("Open this URL in a browser and sign in:\n\n{}\n", request.url);
    println!("Then paste the full URL you were redirected to:");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let callback = match lines.next_line().await {
        Ok(Some(line)) => line,
        Ok(None) => {
            error!("No callback URL on standard input");
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to read callback URL: {e}");
            std::process::exit(1);
        }
    };

    let (code, state) = match parse_callback(&callback) {
        Ok(params) => params,
        Err(reason) => {
            error!("{reason}");
            std::process::exit(1);
        }
    };

    let validated = client
        .validate_state(&state)
        .await
        .unwrap_or_else(|e| fail(e));
    if validated.caller_token != request.caller_token {
        error!("Callback belongs to a different sign-in attempt");
        std::process::exit(1);
    }

    let tokens = client.exchange_code(&code).await.unwrap_or_else(|e| fail(e));
    info!("Received {} token, {}", tokens.token_type, token_lifetime(&tokens));
    let user = client
        .fetch_user_info(&tokens)
        .await
        .unwrap_or_else(|e| fail(e));

    match serde_json::to_string_pretty(&user) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => {
            error!("Failed to render user info: {e}");
            std::process::exit(1);
        }
    }
}

fn fail(e: Error) -> ! {
    error!("Sign-in failed: {e}");
    if e.is_retryable() {
        info!("The failure is transient, running the sign-in again may succeed");
    }
    eprintln!("{}", e.user_message());
    std::process::exit(1);
}

fn build_provider(config: &Config) -> Result<Provider, Error> {
    let scopes = config.scopes();
    match config.endpoint_overrides() {
        Some([authorization, token, user_info]) => Provider::new(
            config.provider(),
            authorization,
            token,
            user_info,
            &scopes,
        ),
        None => providers::by_name(config.provider(), &scopes),
    }
}

fn build_client(config: &Config) -> Result<Client<serde_json::Value>, Error> {
    let provider = Arc::new(build_provider(config)?);

    let ttl = chrono::Duration::from_std(config.state_ttl()).unwrap_or_else(|_| {
        warn!("State TTL out of range, using 10 minutes");
        chrono::Duration::minutes(10)
    });

    let client = Client::new(
        config.client_id(),
        SecretString::new(config.client_secret().to_string()),
        config.redirect_url(),
        config.state_encryption_key(),
        provider,
    )?
    .with_ledger(Arc::new(MemoryLedger::with_ttl(ttl)))
    .with_http_config(HttpClientConfig {
        timeout: config.request_timeout(),
        max_retries: config.http_max_retries,
        ..HttpClientConfig::default()
    });

    Ok(client)
}

fn token_lifetime(tokens: &Tokens) -> String {
    match tokens.time_until_expiry() {
        Some(remaining) if remaining.num_seconds() > 0 => {
            format!("expires in {} seconds", remaining.num_seconds())
        }
        Some(_) => "already expired".to_string(),
        None => "no expiry reported".to_string(),
    }
}

/// Pull `code` and `state` out of a pasted callback URL.
fn parse_callback(input: &str) -> Result<(String, String), String> {
    let url = Url::parse(input.trim()).map_err(|e| format!("Invalid callback URL: {e}"))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Err(format!("Provider denied the request: {value}")),
            _ => {}
        }
    }

    match (code, state) {
        (Some(code), Some(state)) => Ok((code, state)),
        (None, _) => Err("Callback URL has no code parameter".to_string()),
        (_, None) => Err("Callback URL has no state parameter".to_string()),
    }
}
