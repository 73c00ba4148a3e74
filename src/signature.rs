//! secp256k1 ECDSA signing demo
//!
//! Keys and signatures travel as hex: private keys are 32 raw bytes, public
//! keys are uncompressed SEC1 (`04 || X || Y`), signatures are DER. Messages
//! are hashed with SHA-256 before signing.

use crate::errors::SignatureError;
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
}

/// Fresh random key pair
pub fn generate_keypair() -> KeyPair {
    let secp = Secp256k1::new();
    let mut bytes = [0u8; 32];
    // Out-of-range scalars are astronomically rare; draw again if one shows up
    let secret_key = loop {
        OsRng.fill_bytes(&mut bytes);
        if let Ok(sk) = SecretKey::from_slice(&bytes) {
            break sk;
        }
    };
    let public_key = PublicKey::from_secret_key(&secp, &secret_key);
    KeyPair {
        private_key: hex::encode(secret_key.secret_bytes()),
        public_key: hex::encode(public_key.serialize_uncompressed()),
    }
}

/// Public key (uncompressed hex) for a private key
pub fn public_key_for(private_hex: &str) -> Result<String, SignatureError> {
    let secp = Secp256k1::new();
    let secret_key = parse_secret_key(private_hex)?;
    Ok(hex::encode(
        PublicKey::from_secret_key(&secp, &secret_key).serialize_uncompressed(),
    ))
}

/// Sign `message` and return the DER signature as hex
pub fn sign_message(private_hex: &str, message: &str) -> Result<String, SignatureError> {
    if message.is_empty() {
        return Err(SignatureError::EmptyMessage);
    }
    let secp = Secp256k1::new();
    let secret_key = parse_secret_key(private_hex)?;
    let sig = secp.sign_ecdsa(&message_digest(message)?, &secret_key);
    Ok(hex::encode(sig.serialize_der()))
}

/// Check a DER signature. Malformed keys or signatures are errors; a
/// well-formed signature that does not match is `Ok(false)`.
pub fn verify_message(
    public_hex: &str,
    message: &str,
    signature_hex: &str,
) -> Result<bool, SignatureError> {
    let secp = Secp256k1::new();
    let pk_bytes = decode_hex("public_key", public_hex)?;
    let public_key = PublicKey::from_slice(&pk_bytes)
        .map_err(|e| SignatureError::InvalidPublicKey(e.to_string()))?;

    let sig_bytes = decode_hex("signature", signature_hex)?;
    let mut sig = Signature::from_der(&sig_bytes)
        .map_err(|e| SignatureError::InvalidSignature(e.to_string()))?;
    // libsecp256k1 only verifies low-S signatures
    sig.normalize_s();

    Ok(secp
        .verify_ecdsa(&message_digest(message)?, &sig, &public_key)
        .is_ok())
}

fn message_digest(message: &str) -> Result<Message, SignatureError> {
    let digest = Sha256::digest(message.as_bytes());
    Message::from_slice(&digest).map_err(|e| SignatureError::InvalidSignature(e.to_string()))
}

fn parse_secret_key(private_hex: &str) -> Result<SecretKey, SignatureError> {
    let bytes = decode_hex("private_key", private_hex)?;
    SecretKey::from_slice(&bytes).map_err(|e| SignatureError::InvalidPrivateKey(e.to_string()))
}

/// Strip an optional `0x`, ignore case and surrounding whitespace
fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, SignatureError> {
    let trimmed = value.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(SignatureError::MissingField(field));
    }
    hex::decode(trimmed.to_ascii_lowercase()).map_err(|e| SignatureError::InvalidHex {
        field,
        reason: e.to_string(),
    })
}
