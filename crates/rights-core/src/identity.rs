//! Holder identities and Ed25519 signing
//!
//! A holder is identified by a hex-encoded Ed25519 public key. The private
//! key arrives with each request as part of a [`HolderCredential`] and is
//! only used to sign; nothing in this crate persists it.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, RightsError};

/// Ed25519 public key length (32 bytes)
pub const PUBLIC_KEY_LEN: usize = 32;

/// Ed25519 private key length (32 bytes)
pub const PRIVATE_KEY_LEN: usize = 32;

/// Domain separation tags for the signed messages
pub mod domain {
    /// Creation of a Right or Copyright record
    pub const CREATE: &[u8] = b"rights:create:v1\0";
    /// Assignment of a record to a new holder
    pub const ASSIGN: &[u8] = b"rights:assign:v1\0";
}

/// Hex-encoded Ed25519 public key of a holder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey(String);

impl PublicKey {
    /// Parse and normalize a hex public key.
    pub fn parse(input: &str) -> Result<Self> {
        let bytes = decode_key(input.trim(), PUBLIC_KEY_LEN, "public key")?;
        VerifyingKey::from_bytes(&bytes)
            .map_err(|e| RightsError::validation(format!("Invalid public key: {e}")))?;
        Ok(Self(hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn verifying_key(&self) -> Result<VerifyingKey> {
        let bytes = decode_key(&self.0, PUBLIC_KEY_LEN, "public key")?;
        VerifyingKey::from_bytes(&bytes)
            .map_err(|e| RightsError::validation(format!("Invalid public key: {e}")))
    }

    /// Verify a hex signature over `domain_tag || message`.
    pub fn verify(&self, domain_tag: &[u8], message: &[u8], signature_hex: &str) -> Result<()> {
        let raw = hex::decode(signature_hex)
            .map_err(|e| RightsError::Unauthorized(format!("Malformed signature: {e}")))?;
        let signature = Signature::from_slice(&raw)
            .map_err(|e| RightsError::Unauthorized(format!("Malformed signature: {e}")))?;

        self.verifying_key()?
            .verify(&signing_input(domain_tag, message), &signature)
            .map_err(|_| {
                RightsError::Unauthorized(format!("Signature does not verify for {}", self.0))
            })
    }
}

impl TryFrom<String> for PublicKey {
    type Error = RightsError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ephemeral key pair supplied by a caller for one operation.
///
/// Not serializable; `Debug` only shows the public half.
#[derive(Clone)]
pub struct HolderCredential {
    public_key: PublicKey,
    signing_key: SigningKey,
}

impl HolderCredential {
    /// Build a credential from hex keys.
    ///
    /// Both keys must be well-formed. Whether they belong together is checked
    /// separately by [`HolderCredential::ensure_key_pair`], so that a caller
    /// who is not the holder is rejected as unauthorized before anything else.
    pub fn from_hex(public_key: &str, private_key: &str) -> Result<Self> {
        let public_key = PublicKey::parse(public_key)?;
        let secret = decode_key(private_key.trim(), PRIVATE_KEY_LEN, "private key")?;
        Ok(Self {
            public_key,
            signing_key: SigningKey::from_bytes(&secret),
        })
    }

    /// Generate a fresh key pair (tooling and tests).
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key = PublicKey(hex::encode(signing_key.verifying_key().to_bytes()));
        Self {
            public_key,
            signing_key,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Hex private key, for handing a generated credential to a client.
    pub fn export_private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Fail unless the private key derives the stated public key.
    pub fn ensure_key_pair(&self) -> Result<()> {
        let derived = hex::encode(self.signing_key.verifying_key().to_bytes());
        if derived == self.public_key.as_str() {
            Ok(())
        } else {
            Err(RightsError::validation(format!(
                "Private key does not belong to public key {}",
                self.public_key
            )))
        }
    }

    /// Sign `domain_tag || message`, returning a hex signature.
    pub(crate) fn sign(&self, domain_tag: &[u8], message: &[u8]) -> String {
        let signature = self.signing_key.sign(&signing_input(domain_tag, message));
        hex::encode(signature.to_bytes())
    }
}

impl fmt::Debug for HolderCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HolderCredential")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

fn decode_key(input: &str, expected_len: usize, what: &str) -> Result<[u8; 32]> {
    let bytes =
        hex::decode(input).map_err(|e| RightsError::validation(format!("Invalid {what} hex: {e}")))?;
    if bytes.len() != expected_len {
        return Err(RightsError::validation(format!(
            "Invalid {what} length: expected {expected_len}, got {}",
            bytes.len()
        )));
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

fn signing_input(domain_tag: &[u8], message: &[u8]) -> Vec<u8> {
    let mut input = Vec::with_capacity(domain_tag.len() + message.len());
    input.extend_from_slice(domain_tag);
    input.extend_from_slice(message);
    input
}

/// Deterministic JSON encoding with object keys sorted at every level.
pub fn canonical_json(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(Value::String(key.clone()).to_string().as_bytes());
                out.push(b':');
                write_canonical(&map[key], out);
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        scalar => out.extend_from_slice(scalar.to_string().as_bytes()),
    }
}
