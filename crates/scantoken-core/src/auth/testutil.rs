//! Test helpers: deterministic Ed25519 signers and hand-built tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::SigningKey;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::json;

use super::KeySet;

/// Ed25519 key pair labelled with a `kid`, derived from a one-byte seed
pub struct TestSigner {
    pub kid: String,
    signing_key: SigningKey,
}

impl TestSigner {
    pub fn new(kid: &str, seed: u8) -> Self {
        Self {
            kid: kid.to_string(),
            signing_key: SigningKey::from_bytes(&[seed; 32]),
        }
    }

    /// Private key in PKCS#8 DER, as `EncodingKey::from_ed_der` expects
    fn pkcs8_der(&self) -> Vec<u8> {
        let mut der = vec![
            0x30, 0x2e, // SEQUENCE, 46 bytes
            0x02, 0x01, 0x00, // INTEGER version 0
            0x30, 0x05, // SEQUENCE, algorithm identifier
            0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (Ed25519)
            0x04, 0x22, // OCTET STRING, 34 bytes
            0x04, 0x20, // OCTET STRING, 32 bytes
        ];
        der.extend_from_slice(&self.signing_key.to_bytes());
        der
    }

    pub fn jwk(&self) -> Jwk {
        let x = URL_SAFE_NO_PAD.encode(self.signing_key.verifying_key().to_bytes());
        serde_json::from_value(json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "use": "sig",
            "alg": "EdDSA",
            "kid": self.kid,
            "x": x,
        }))
        .expect("valid test JWK")
    }

    pub fn key_set(&self) -> KeySet {
        KeySet::new(JwkSet {
            keys: vec![self.jwk()],
        })
    }

    pub fn sign(&self, exp: i64) -> String {
        self.sign_with_kid(Some(self.kid.as_str()), exp)
    }

    pub fn sign_with_kid(&self, kid: Option<&str>, exp: i64) -> String {
        sign_token(
            self,
            kid,
            &json!({ "exp": exp, "iat": exp - 3600, "sub": "scan-user" }),
        )
    }
}

pub fn sign_token(signer: &TestSigner, kid: Option<&str>, claims: &serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::EdDSA);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_ed_der(&signer.pkcs8_der());
    jsonwebtoken::encode(&header, claims, &key).expect("Failed to encode test JWT")
}

pub fn sign_hs256(kid: &str, secret: &[u8], exp: i64) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_secret(secret);
    jsonwebtoken::encode(&header, &json!({ "exp": exp }), &key).expect("Failed to encode test JWT")
}
