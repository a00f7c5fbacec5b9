use anyhow::{Result, anyhow};
use jsonwebtoken::{DecodingKey, EncodingKey};
use std::fmt;
use std::path::Path;

/// RSA signing/verification keys for one token class.
#[derive(Clone)]
pub struct KeyPair {
    pub(crate) encoding: EncodingKey,
    pub(crate) decoding: DecodingKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyPair { .. }")
    }
}

impl KeyPair {
    pub fn from_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self> {
        let encoding = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| anyhow!("invalid RSA private key: {}", e))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| anyhow!("invalid RSA public key: {}", e))?;
        Ok(KeyPair { encoding, decoding })
    }

    pub fn from_pem_files(
        private_path: impl AsRef<Path>,
        public_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let private_path = private_path.as_ref();
        let public_path = public_path.as_ref();
        let private_pem = std::fs::read(private_path)
            .map_err(|e| anyhow!("cannot read {:?}: {}", private_path, e))?;
        let public_pem = std::fs::read(public_path)
            .map_err(|e| anyhow!("cannot read {:?}: {}", public_path, e))?;
        Self::from_pem(&private_pem, &public_pem)
    }
}
