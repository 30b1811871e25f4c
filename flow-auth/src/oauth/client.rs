//! OAuth 2.0 authorization code flow client.
//!
//! A flow moves through four calls, each returning the artifact of the next stage:
//!
//! 1. [`Client::generate_authorization_url`] seals the caller's context into the `state`
//!    parameter, records it in the ledger and returns an [`AuthorizationRequest`].
//! 2. [`Client::validate_state`] consumes the echoed state and returns a [`ValidatedState`].
//! 3. [`Client::exchange_code`] trades the callback's code for [`Tokens`].
//! 4. [`Client::fetch_user_info`] reads the user's profile with those tokens.
//!
//! Any step may fail; every step except `validate_state` can be retried as is.

use std::marker::PhantomData;
use std::sync::Arc;

use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tokio::time::Instant;
use url::Url;
use uuid::Uuid;

use super::{ClientCredentials, CodeExchanger, Oauth2Exchanger, Provider, Tokens, UserInfo};
use crate::error::{
    configuration_error, state_error, state_error_opaque, ConfigurationErrorKind, Error,
    ErrorKind, ExchangeErrorKind, HttpErrorKind, StateErrorKind,
};
use crate::http::{AuthenticatedClientBuilder, HttpClientConfig};
use crate::state::{Ledger, MemoryLedger, StateCodec};

/// Authorization request ready to be sent to the user's browser.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Authorization URL to redirect the user to.
    pub url: String,
    /// Opaque state embedded in the URL and recorded in the ledger.
    pub state: String,
    /// CSRF token sealed into the state, generated when the caller supplied none.
    pub caller_token: String,
}

/// Context recovered from a consumed state.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedState<T> {
    pub caller_token: String,
    pub payload: T,
}

/// Authorization code flow client for one provider.
///
/// `T` is the application context sealed into every state this client issues. The client is
/// meant to be shared (`Arc<Client<T>>`) across all concurrent flows.
pub struct Client<T> {
    credentials: ClientCredentials,
    codec: StateCodec,
    authorization_url: Url,
    provider: Arc<Provider>,
    ledger: Arc<dyn Ledger>,
    exchanger: Arc<dyn CodeExchanger>,
    http_config: HttpClientConfig,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Client<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create a client with an in-memory ledger and the `oauth2` crate exchanger.
    ///
    /// Fails with a configuration error when a credential is empty, the key is not 16, 24 or
    /// 32 bytes long, or the authorization endpoint or redirect URL does not parse.
    pub fn new(
        client_id: &str,
        client_secret: SecretString,
        redirect_url: &str,
        key: &[u8],
        provider: Arc<Provider>,
    ) -> Result<Self, Error> {
        let required = [
            ("client_id", client_id),
            ("client_secret", client_secret.expose_secret().as_str()),
            ("redirect_url", redirect_url),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(configuration_error(
                    ConfigurationErrorKind::MissingField(field),
                    &format!("{} must not be empty", field),
                ));
            }
        }

        let codec = StateCodec::new(key)?;

        Url::parse(redirect_url).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Configuration(ConfigurationErrorKind::InvalidUrl("redirect_url")),
        })?;
        let authorization_url = Url::parse(provider.authorization_endpoint()).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Configuration(ConfigurationErrorKind::InvalidUrl(
                "authorization_endpoint",
            )),
        })?;

        Ok(Self {
            credentials: ClientCredentials {
                client_id: client_id.to_string(),
                client_secret,
                redirect_url: redirect_url.to_string(),
            },
            codec,
            authorization_url,
            provider,
            ledger: Arc::new(MemoryLedger::new()),
            exchanger: Arc::new(Oauth2Exchanger),
            http_config: HttpClientConfig::default(),
            _payload: PhantomData,
        })
    }

    /// Use `ledger` to track outstanding states.
    pub fn with_ledger(mut self, ledger: Arc<dyn Ledger>) -> Self {
        self.ledger = ledger;
        self
    }

    /// Replace the ledger. States issued through the previous ledger can no longer be
    /// validated, so only swap before any flow is in flight.
    pub fn set_ledger(&mut self, ledger: Arc<dyn Ledger>) {
        self.ledger = ledger;
    }

    /// Use `exchanger` to trade authorization codes for tokens.
    pub fn with_exchanger(mut self, exchanger: Arc<dyn CodeExchanger>) -> Self {
        self.exchanger = exchanger;
        self
    }

    /// Timeout, retry and user agent settings for provider requests.
    pub fn with_http_config(mut self, http_config: HttpClientConfig) -> Self {
        self.http_config = http_config;
        self
    }

    pub fn provider(&self) -> &Arc<Provider> {
        &self.provider
    }

    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    pub fn redirect_url(&self) -> &str {
        &self.credentials.redirect_url
    }

    /// Start a flow.
    ///
    /// An empty `caller_token` is replaced by a random UUID. The returned URL requests offline
    /// access and forces the consent screen so a refresh token is issued every time.
    pub async fn generate_authorization_url(
        &self,
        caller_token: &str,
        payload: &T,
    ) -> Result<AuthorizationRequest, Error> {
        let caller_token = if caller_token.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            caller_token.to_string()
        };

        let state = self.codec.seal(&caller_token, payload)?;
        let url = self.build_authorization_url(&state);

        if !self.ledger.issue(&state).await {
            warn!(
                "State ledger refused a new {} authorization state",
                self.provider.name()
            );
            return Err(state_error(
                StateErrorKind::Storage,
                "failed to record authorization state",
            ));
        }

        debug!("Issued {} authorization request", self.provider.name());

        Ok(AuthorizationRequest {
            url,
            state,
            caller_token,
        })
    }

    /// Consume the state echoed back on the callback and recover its context.
    ///
    /// The state is removed from the ledger before it is decrypted; a state that was never
    /// issued, was already used, or has expired fails with `StateErrorKind::NotFound` without
    /// being decrypted. A state can be validated at most once.
    pub async fn validate_state(&self, state: &str) -> Result<ValidatedState<T>, Error> {
        if !self.ledger.consume(state).await {
            debug!("Rejected unknown, expired or replayed authorization state");
            return Err(state_error_opaque(StateErrorKind::NotFound));
        }

        let (caller_token, payload) = self.codec.open(state).map_err(|e| {
            debug!("Consumed authorization state did not open: {}", e);
            e
        })?;

        Ok(ValidatedState {
            caller_token,
            payload,
        })
    }

    /// Exchange an authorization code for tokens within the configured request timeout.
    pub async fn exchange_code(&self, code: &str) -> Result<Tokens, Error> {
        self.exchange_code_until(code, Instant::now() + self.http_config.timeout)
            .await
    }

    /// Exchange an authorization code for tokens, giving up at `deadline`.
    pub async fn exchange_code_until(&self, code: &str, deadline: Instant) -> Result<Tokens, Error> {
        let exchange =
            self.exchanger
                .exchange(&self.credentials, self.provider.token_endpoint(), code);

        match tokio::time::timeout_at(deadline, exchange).await {
            Ok(Ok(tokens)) => Ok(tokens),
            Ok(Err(e)) if matches!(e.error_kind, ErrorKind::Exchange(_)) => Err(e),
            Ok(Err(e)) => Err(Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::Exchange(ExchangeErrorKind::Rejected),
            }),
            Err(elapsed) => {
                warn!("{} code exchange timed out", self.provider.name());
                Err(Error {
                    source: Some(Box::new(elapsed)),
                    error_kind: ErrorKind::Exchange(ExchangeErrorKind::Timeout),
                })
            }
        }
    }

    /// Fetch the user's profile within the configured request timeout.
    pub async fn fetch_user_info(&self, tokens: &Tokens) -> Result<UserInfo, Error> {
        self.fetch_user_info_until(tokens, Instant::now() + self.http_config.timeout)
            .await
    }

    /// Fetch the user's profile, giving up at `deadline`.
    pub async fn fetch_user_info_until(
        &self,
        tokens: &Tokens,
        deadline: Instant,
    ) -> Result<UserInfo, Error> {
        let client = AuthenticatedClientBuilder::from_config(self.http_config.clone())
            .with_bearer_token(tokens.access_token.clone())
            .build()?;

        match tokio::time::timeout_at(deadline, self.provider.fetch_user_info(&client)).await {
            Ok(result) => result,
            Err(elapsed) => {
                warn!("{} user info request timed out", self.provider.name());
                Err(Error {
                    source: Some(Box::new(elapsed)),
                    error_kind: ErrorKind::Http(HttpErrorKind::Timeout),
                })
            }
        }
    }

    fn build_authorization_url(&self, state: &str) -> String {
        let mut url = self.authorization_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.credentials.client_id)
                .append_pair("redirect_uri", &self.credentials.redirect_url);

            let scopes = self.provider.scopes();
            if !scopes.is_empty() {
                query.append_pair("scope", &scopes.join(" "));
            }

            query
                .append_pair("state", state)
                .append_pair("access_type", "offline")
                .append_pair("prompt", "consent");
        }
        url.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    const KEY_24: &[u8] = b"123456789012345678901234";

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Session {
        user: String,
    }

    struct RefusingLedger;

    #[async_trait]
    impl Ledger for RefusingLedger {
        async fn issue(&self, _state: &str) -> bool {
            false
        }

        async fn consume(&self, _state: &str) -> bool {
            false
        }
    }

    struct StubExchanger {
        delay: Duration,
        result: fn() -> Result<Tokens, Error>,
    }

    #[async_trait]
    impl CodeExchanger for StubExchanger {
        async fn exchange(
            &self,
            credentials: &ClientCredentials,
            token_endpoint: &str,
            code: &str,
        ) -> Result<Tokens, Error> {
            assert_eq!(credentials.client_id, "client-1");
            assert_eq!(token_endpoint, "https://ex/token");
            assert_eq!(code, "code-1");
            tokio::time::sleep(self.delay).await;
            (self.result)()
        }
    }

    fn issued_tokens() -> Result<Tokens, Error> {
        Ok(Tokens {
            access_token: SecretString::new("access-1".to_string()),
            refresh_token: Some(SecretString::new("refresh-1".to_string())),
            expires_at: None,
            token_type: "bearer".to_string(),
            scopes: vec!["read".to_string()],
        })
    }

    fn network_failure() -> Result<Tokens, Error> {
        Err(crate::error::http_error(HttpErrorKind::Network, "connection reset"))
    }

    fn test_provider() -> Arc<Provider> {
        Arc::new(
            Provider::new(
                "test",
                "https://ex/auth",
                "https://ex/token",
                "https://ex/info",
                &["read"],
            )
            .unwrap(),
        )
    }

    fn test_client<T: Serialize + DeserializeOwned>(provider: Arc<Provider>) -> Client<T> {
        Client::new(
            "client-1",
            SecretString::new("secret-1".to_string()),
            "http://localhost:4000/oauth/callback",
            KEY_24,
            provider,
        )
        .unwrap()
    }

    fn query_of(url: &str) -> HashMap<String, String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn state_kind(result: Result<ValidatedState<serde_json::Value>, Error>) -> StateErrorKind {
        match result {
            Err(Error {
                error_kind: ErrorKind::State(kind),
                ..
            }) => kind,
            other => panic!("expected a state error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_end_to_end_state_round_trip() {
        let client: Client<serde_json::Value> = test_client(test_provider());

        let request = client
            .generate_authorization_url("", &json!({"user": "u1"}))
            .await
            .unwrap();
        assert!(!request.caller_token.is_empty());

        let state = query_of(&request.url)["state"].clone();
        assert_eq!(state, request.state);

        let validated = client.validate_state(&state).await.unwrap();
        assert_eq!(validated.caller_token, request.caller_token);
        assert_eq!(validated.payload, json!({"user": "u1"}));

        assert_eq!(
            state_kind(client.validate_state(&state).await),
            StateErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_caller_token_is_preserved() {
        let client: Client<Session> = test_client(test_provider());
        let payload = Session {
            user: "u2".to_string(),
        };

        let request = client
            .generate_authorization_url("csrf-from-cookie", &payload)
            .await
            .unwrap();
        let validated = client.validate_state(&request.state).await.unwrap();

        assert_eq!(request.caller_token, "csrf-from-cookie");
        assert_eq!(validated.caller_token, "csrf-from-cookie");
        assert_eq!(validated.payload, payload);
    }

    #[tokio::test]
    async fn test_generated_caller_tokens_are_unique() {
        let client: Client<Session> = test_client(test_provider());
        let payload = Session {
            user: "u1".to_string(),
        };

        let first = client.generate_authorization_url("", &payload).await.unwrap();
        let second = client.generate_authorization_url("", &payload).await.unwrap();
        assert_ne!(first.caller_token, second.caller_token);
        assert_ne!(first.state, second.state);
    }

    #[tokio::test]
    async fn test_authorization_url_parameters() {
        let provider = test_provider();
        provider.set_scopes(["openid", "email profile"]);
        let client: Client<Session> = test_client(Arc::clone(&provider));

        let request = client
            .generate_authorization_url("t", &Session { user: "u1".to_string() })
            .await
            .unwrap();

        assert!(request.url.starts_with("https://ex/auth?"));
        let query = query_of(&request.url);
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["client_id"], "client-1");
        assert_eq!(query["redirect_uri"], "http://localhost:4000/oauth/callback");
        assert_eq!(query["scope"], "openid email profile");
        assert_eq!(query["state"], request.state);
        assert_eq!(query["access_type"], "offline");
        assert_eq!(query["prompt"], "consent");
    }

    #[tokio::test]
    async fn test_authorization_url_without_scopes() {
        let provider = test_provider();
        provider.set_scopes(Vec::<String>::new());
        let client: Client<Session> = test_client(provider);

        let request = client
            .generate_authorization_url("t", &Session { user: "u1".to_string() })
            .await
            .unwrap();
        assert!(!query_of(&request.url).contains_key("scope"));
    }

    #[tokio::test]
    async fn test_key_length_boundaries() {
        for len in [16, 23, 24, 25, 31, 32, 33] {
            let key = vec![b'7'; len];
            let result: Result<Client<Session>, Error> = Client::new(
                "client-1",
                SecretString::new("secret-1".to_string()),
                "http://localhost:4000/oauth/callback",
                &key,
                test_provider(),
            );
            match len {
                16 | 24 | 32 => assert!(result.is_ok(), "{len}-byte key should be accepted"),
                _ => assert!(
                    matches!(
                        result,
                        Err(Error {
                            error_kind: ErrorKind::Configuration(
                                ConfigurationErrorKind::InvalidKeyLength(_)
                            ),
                            ..
                        })
                    ),
                    "{len}-byte key should be rejected"
                ),
            }
        }
    }

    #[test]
    fn test_new_rejects_missing_credentials() {
        let cases = [
            ("", "secret", "http://localhost/cb", "client_id"),
            ("id", "", "http://localhost/cb", "client_secret"),
            ("id", "secret", "", "redirect_url"),
        ];
        for (id, secret, redirect, field) in cases {
            let result: Result<Client<Session>, Error> = Client::new(
                id,
                SecretString::new(secret.to_string()),
                redirect,
                KEY_24,
                test_provider(),
            );
            assert!(matches!(
                result,
                Err(Error {
                    error_kind: ErrorKind::Configuration(ConfigurationErrorKind::MissingField(f)),
                    ..
                }) if f == field
            ));
        }
    }

    #[test]
    fn test_new_rejects_unparseable_urls() {
        let result: Result<Client<Session>, Error> = Client::new(
            "id",
            SecretString::new("secret".to_string()),
            "not a url",
            KEY_24,
            test_provider(),
        );
        assert!(matches!(
            result,
            Err(Error {
                error_kind: ErrorKind::Configuration(ConfigurationErrorKind::InvalidUrl(
                    "redirect_url"
                )),
                ..
            })
        ));

        let provider = Arc::new(Provider::new("p", "/relative", "t", "u", &[]).unwrap());
        let result: Result<Client<Session>, Error> = Client::new(
            "id",
            SecretString::new("secret".to_string()),
            "http://localhost/cb",
            KEY_24,
            provider,
        );
        assert!(matches!(
            result,
            Err(Error {
                error_kind: ErrorKind::Configuration(ConfigurationErrorKind::InvalidUrl(
                    "authorization_endpoint"
                )),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_refused_issue_returns_storage_error_and_no_url() {
        let client: Client<serde_json::Value> =
            test_client(test_provider()).with_ledger(Arc::new(RefusingLedger));

        let result = client.generate_authorization_url("", &json!({})).await;
        assert!(matches!(
            result,
            Err(Error {
                error_kind: ErrorKind::State(StateErrorKind::Storage),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unrepresentable_state_ttl_returns_storage_error() {
        let ttl = chrono::Duration::from_std(Duration::from_secs(10_000_000_000_000)).unwrap();
        let client: Client<serde_json::Value> = test_client(test_provider())
            .with_ledger(Arc::new(MemoryLedger::with_ttl(ttl)));

        let result = client.generate_authorization_url("", &json!({})).await;
        assert!(matches!(
            result,
            Err(Error {
                error_kind: ErrorKind::State(StateErrorKind::Storage),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unissued_state_is_not_found_even_if_well_formed() {
        let client: Client<serde_json::Value> = test_client(test_provider());
        let forged = StateCodec::new(KEY_24)
            .unwrap()
            .seal("token", &json!({"user": "attacker"}))
            .unwrap();

        assert_eq!(
            state_kind(client.validate_state(&forged).await),
            StateErrorKind::NotFound
        );
        assert_eq!(
            state_kind(client.validate_state("").await),
            StateErrorKind::NotFound
        );
        assert_eq!(
            state_kind(client.validate_state("garbage").await),
            StateErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_state_from_foreign_key_is_consumed_then_fails_decryption() {
        let ledger: Arc<dyn Ledger> = Arc::new(MemoryLedger::new());
        let issuer: Client<serde_json::Value> =
            test_client(test_provider()).with_ledger(Arc::clone(&ledger));
        let verifier: Client<serde_json::Value> = Client::new(
            "client-1",
            SecretString::new("secret-1".to_string()),
            "http://localhost:4000/oauth/callback",
            b"abcdefghijklmnopqrstuvwxyz012345",
            test_provider(),
        )
        .unwrap()
        .with_ledger(ledger);

        let request = issuer
            .generate_authorization_url("", &json!({"user": "u1"}))
            .await
            .unwrap();

        assert_eq!(
            state_kind(verifier.validate_state(&request.state).await),
            StateErrorKind::Decryption
        );
        assert_eq!(
            state_kind(issuer.validate_state(&request.state).await),
            StateErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_payload_shape_mismatch_is_deserialization_error() {
        let ledger: Arc<dyn Ledger> = Arc::new(MemoryLedger::new());
        let issuer: Client<serde_json::Value> =
            test_client(test_provider()).with_ledger(Arc::clone(&ledger));
        let verifier: Client<Session> = test_client(test_provider()).with_ledger(ledger);

        let request = issuer
            .generate_authorization_url("", &json!({"tenant": 7}))
            .await
            .unwrap();

        let result = verifier.validate_state(&request.state).await;
        assert!(matches!(
            result,
            Err(Error {
                error_kind: ErrorKind::State(StateErrorKind::Deserialization),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_swapped_ledger_forgets_earlier_states() {
        let mut client: Client<serde_json::Value> = test_client(test_provider());
        let request = client
            .generate_authorization_url("", &json!({}))
            .await
            .unwrap();

        client.set_ledger(Arc::new(MemoryLedger::new()));
        assert_eq!(
            state_kind(client.validate_state(&request.state).await),
            StateErrorKind::NotFound
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_validation_succeeds_once() {
        let client: Arc<Client<serde_json::Value>> = Arc::new(test_client(test_provider()));
        let request = client
            .generate_authorization_url("", &json!({"user": "u1"}))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let client = Arc::clone(&client);
            let state = request.state.clone();
            handles.push(tokio::spawn(async move {
                client.validate_state(&state).await.is_ok()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_exchange_code_delegates_to_exchanger() {
        let client: Client<Session> =
            test_client(test_provider()).with_exchanger(Arc::new(StubExchanger {
                delay: Duration::ZERO,
                result: issued_tokens,
            }));

        let tokens = client.exchange_code("code-1").await.unwrap();
        assert_eq!(tokens.access_token.expose_secret(), "access-1");
    }

    #[tokio::test]
    async fn test_exchange_code_wraps_foreign_errors() {
        let client: Client<Session> =
            test_client(test_provider()).with_exchanger(Arc::new(StubExchanger {
                delay: Duration::ZERO,
                result: network_failure,
            }));

        let result = client.exchange_code("code-1").await;
        assert!(matches!(
            result,
            Err(Error {
                error_kind: ErrorKind::Exchange(ExchangeErrorKind::Rejected),
                source: Some(_),
            })
        ));
    }

    #[tokio::test]
    async fn test_exchange_code_times_out_at_deadline() {
        let client: Client<Session> =
            test_client(test_provider()).with_exchanger(Arc::new(StubExchanger {
                delay: Duration::from_secs(30),
                result: issued_tokens,
            }));

        let deadline = Instant::now() + Duration::from_millis(50);
        let result = client.exchange_code_until("code-1", deadline).await;
        assert!(matches!(
            result,
            Err(Error {
                error_kind: ErrorKind::Exchange(ExchangeErrorKind::Timeout),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_fetch_user_info_uses_access_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/info")
            .match_header("authorization", "Bearer access-1")
            .with_status(200)
            .with_body(r#"{"sub":"u1"}"#)
            .create_async()
            .await;

        let provider = Arc::new(
            Provider::new(
                "test",
                "https://ex/auth",
                "https://ex/token",
                &format!("{}/info", server.url()),
                &["read"],
            )
            .unwrap(),
        );
        let client: Client<Session> = test_client(provider).with_http_config(HttpClientConfig {
            max_retries: 0,
            ..HttpClientConfig::default()
        });

        let info = client
            .fetch_user_info(&issued_tokens().unwrap())
            .await
            .unwrap();
        assert_eq!(info["sub"], "u1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_user_info_times_out_at_deadline() {
        // Accepts connections at the socket level but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let provider = Arc::new(
            Provider::new(
                "test",
                "https://ex/auth",
                "https://ex/token",
                &format!("http://{}/info", address),
                &[],
            )
            .unwrap(),
        );
        let client: Client<Session> = test_client(provider).with_http_config(HttpClientConfig {
            max_retries: 0,
            ..HttpClientConfig::default()
        });

        let deadline = Instant::now() + Duration::from_millis(100);
        let result = client
            .fetch_user_info_until(&issued_tokens().unwrap(), deadline)
            .await;
        assert!(matches!(
            result,
            Err(Error {
                error_kind: ErrorKind::Http(HttpErrorKind::Timeout),
                ..
            })
        ));
        drop(listener);
    }
}
