//! AES-GCM sealing of OAuth state.
//!
//! A sealed state has the form `v1.<base64url(nonce ‖ ciphertext ‖ tag)>`. The plaintext is the
//! JSON encoding of `{caller_token, payload}`, the nonce is 12 random bytes drawn for every call,
//! and the version tag is bound into the ciphertext as associated data so it cannot be swapped.
//! The cipher width follows the key: 16, 24 or 32 bytes select AES-128, AES-192 or AES-256.
//!
//! Every way an opaque state can fail to open (bad encoding, unknown version, wrong key,
//! tampered bytes) yields the same `StateErrorKind::Decryption` with no source attached.

use aes::Aes192;
use aes_gcm::{
    aead::{consts::U12, Aead, KeyInit, Payload},
    Aes128Gcm, Aes256Gcm, AesGcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{
    configuration_error, state_error, state_error_opaque, ConfigurationErrorKind, Error,
    ErrorKind, StateErrorKind,
};

type Aes192Gcm = AesGcm<Aes192, U12>;

/// 12-byte nonce size for AES-GCM
const NONCE_SIZE: usize = 12;

/// 16-byte authentication tag appended by AES-GCM
const TAG_SIZE: usize = 16;

const CURRENT_VERSION: &str = "v1";
const VERSION_SEPARATOR: char = '.';

/// Key lengths accepted for sealing state.
pub const VALID_KEY_LENGTHS: [usize; 3] = [16, 24, 32];

#[derive(Serialize)]
struct SealedEnvelope<'a, T> {
    caller_token: &'a str,
    payload: &'a T,
}

#[derive(Deserialize)]
struct OpenedEnvelope<T> {
    caller_token: String,
    payload: T,
}

enum StateCipher {
    Aes128(Box<Aes128Gcm>),
    Aes192(Box<Aes192Gcm>),
    Aes256(Box<Aes256Gcm>),
}

impl StateCipher {
    fn from_key(key: &[u8]) -> Option<Self> {
        match key.len() {
            16 => Aes128Gcm::new_from_slice(key)
                .ok()
                .map(|c| Self::Aes128(Box::new(c))),
            24 => Aes192Gcm::new_from_slice(key)
                .ok()
                .map(|c| Self::Aes192(Box::new(c))),
            32 => Aes256Gcm::new_from_slice(key)
                .ok()
                .map(|c| Self::Aes256(Box::new(c))),
            _ => None,
        }
    }

    fn encrypt(&self, nonce: &[u8], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        let nonce = Nonce::<U12>::from_slice(nonce);
        let payload = Payload { msg, aad };
        match self {
            Self::Aes128(cipher) => cipher.encrypt(nonce, payload),
            Self::Aes192(cipher) => cipher.encrypt(nonce, payload),
            Self::Aes256(cipher) => cipher.encrypt(nonce, payload),
        }
    }

    fn decrypt(&self, nonce: &[u8], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        let nonce = Nonce::<U12>::from_slice(nonce);
        let payload = Payload { msg, aad };
        match self {
            Self::Aes128(cipher) => cipher.decrypt(nonce, payload),
            Self::Aes192(cipher) => cipher.decrypt(nonce, payload),
            Self::Aes256(cipher) => cipher.decrypt(nonce, payload),
        }
    }
}

fn decryption_err() -> Error {
    state_error_opaque(StateErrorKind::Decryption)
}

/// A state sealer bound to one validated key.
///
/// The key itself is dropped after the cipher is initialized and is never exposed.
pub struct StateCodec {
    cipher: StateCipher,
}

impl StateCodec {
    /// Create a codec, failing with `ConfigurationErrorKind::InvalidKeyLength` unless the key
    /// is 16, 24 or 32 bytes long.
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        let cipher = StateCipher::from_key(key).ok_or_else(|| {
            configuration_error(
                ConfigurationErrorKind::InvalidKeyLength(key.len()),
                "state encryption key must be 16, 24 or 32 bytes",
            )
        })?;
        Ok(Self { cipher })
    }

    /// Seal a caller token and payload into an opaque, URL-safe state string.
    pub fn seal<T: Serialize>(&self, caller_token: &str, payload: &T) -> Result<String, Error> {
        let plaintext = serde_json::to_vec(&SealedEnvelope {
            caller_token,
            payload,
        })
        .map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::State(StateErrorKind::Serialization),
        })?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(&nonce_bytes, &plaintext, CURRENT_VERSION.as_bytes())
            .map_err(|_| state_error(StateErrorKind::Encryption, "AES-GCM encryption failed"))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend(ciphertext);

        Ok(format!(
            "{}{}{}",
            CURRENT_VERSION,
            VERSION_SEPARATOR,
            URL_SAFE_NO_PAD.encode(combined)
        ))
    }

    /// Open a state produced by `seal`, returning the caller token and payload.
    pub fn open<T: DeserializeOwned>(&self, state: &str) -> Result<(String, T), Error> {
        let (version, body) = state
            .split_once(VERSION_SEPARATOR)
            .ok_or_else(decryption_err)?;

        let plaintext = match version {
            CURRENT_VERSION => self.open_v1(body)?,
            _ => return Err(decryption_err()),
        };

        let envelope: OpenedEnvelope<T> = serde_json::from_slice(&plaintext).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::State(StateErrorKind::Deserialization),
        })?;

        Ok((envelope.caller_token, envelope.payload))
    }

    fn open_v1(&self, body: &str) -> Result<Vec<u8>, Error> {
        let combined = URL_SAFE_NO_PAD.decode(body).map_err(|_| decryption_err())?;
        if combined.len() < NONCE_SIZE + TAG_SIZE {
            return Err(decryption_err());
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(nonce_bytes, ciphertext, CURRENT_VERSION.as_bytes())
            .map_err(|_| decryption_err())
    }
}

/// Seal `(caller_token, payload)` under `key`.
///
/// Fails with `StateErrorKind::Encryption` when the key length is unusable and with
/// `StateErrorKind::Serialization` when the payload cannot be encoded.
pub fn encode<T: Serialize>(key: &[u8], caller_token: &str, payload: &T) -> Result<String, Error> {
    let codec = StateCodec::new(key).map_err(|_| {
        state_error(
            StateErrorKind::Encryption,
            "state encryption key must be 16, 24 or 32 bytes",
        )
    })?;
    codec.seal(caller_token, payload)
}

/// Open a state sealed by `encode` under the same `key`.
pub fn decode<T: DeserializeOwned>(key: &[u8], state: &str) -> Result<(String, T), Error> {
    let codec = StateCodec::new(key).map_err(|_| decryption_err())?;
    codec.open(state)
}
