use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use thiserror::Error;
use x25519_dalek::{PublicKey as DalekPublic, StaticSecret};

pub const KEY_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("key must be {} bytes, got {0}", KEY_LEN)]
    Length(usize),
}

/// Local tunnel private key. Never leaves the daemon except inside the
/// rendered interface config.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey([u8; KEY_LEN]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey([u8; KEY_LEN]);

fn to_array(bytes: &[u8]) -> Result<[u8; KEY_LEN], KeyError> {
    bytes.try_into().map_err(|_| KeyError::Length(bytes.len()))
}

impl PrivateKey {
    pub fn generate() -> Self {
        Self(StaticSecret::new(OsRng).to_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        to_array(bytes).map(Self)
    }

    pub fn public(&self) -> PublicKey {
        let secret = StaticSecret::from(self.0);
        PublicKey(DalekPublic::from(&secret).to_bytes())
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

impl PublicKey {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl From<[u8; KEY_LEN]> for PublicKey {
    fn from(k: [u8; KEY_LEN]) -> Self {
        Self(k)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}
