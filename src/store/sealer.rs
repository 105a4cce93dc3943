//! # 密钥封存
//!
//! 存储中的密钥材料始终以 AES-256-GCM 密文形式保存，只在单次调用时解封。
//! 进程级密钥默认随机生成，也可以通过配置提供 64 位十六进制字符串。

use std::fmt;

use aes_gcm::{
    Aes256Gcm,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use rand::RngCore;

use super::secret::SecretMaterial;
use crate::error::{GatewayError, Result};

/// 封存后的密文
#[derive(Clone, PartialEq, Eq)]
pub struct SealedSecret {
    ciphertext: Vec<u8>,
    nonce: [u8; 12],
}

impl fmt::Debug for SealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedSecret")
            .field("len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

/// 密钥封存器
#[derive(Clone)]
pub struct SecretSealer {
    cipher: Aes256Gcm,
}

impl fmt::Debug for SecretSealer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretSealer")
    }
}

impl SecretSealer {
    #[must_use]
    pub fn new(key: &[u8; 32]) -> Self {
        let key: [u8; 32] = *key;
        let cipher = Aes256Gcm::new(&key.into());
        Self { cipher }
    }

    /// 使用随机生成的进程级密钥
    #[must_use]
    pub fn ephemeral() -> Self {
        let mut key = zeroize::Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut key[..]);
        Self::new(&key)
    }

    /// 从 64 个字符的十六进制字符串创建
    pub fn from_hex_key(key_str: &str) -> Result<Self> {
        let key_str = key_str.trim();
        if key_str.len() != 64 {
            return Err(GatewayError::config(
                "sealing key must be a 64 character hex string (32 bytes)",
            ));
        }

        let key_bytes = zeroize::Zeroizing::new(
            hex::decode(key_str)
                .map_err(|e| GatewayError::config_with_source("sealing key is not valid hex", e))?,
        );

        let mut key = zeroize::Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&key_bytes);
        Ok(Self::new(&key))
    }

    /// 封存密钥材料
    pub fn seal(&self, material: &SecretMaterial) -> Result<SealedSecret> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, material.expose().as_bytes())
            .map_err(|e| {
                GatewayError::internal_with_source(
                    "failed to seal credential",
                    anyhow::anyhow!("AES-GCM encryption failed: {e}"),
                )
            })?;

        let mut nonce_bytes = [0u8; 12];
        nonce_bytes.copy_from_slice(&nonce);
        Ok(SealedSecret {
            ciphertext,
            nonce: nonce_bytes,
        })
    }

    /// 解封为明文
    pub fn open(&self, sealed: &SealedSecret) -> Result<SecretMaterial> {
        let nonce = sealed.nonce.into();
        let plaintext = zeroize::Zeroizing::new(
            self.cipher
                .decrypt(&nonce, sealed.ciphertext.as_ref())
                .map_err(|e| {
                    GatewayError::internal_with_source(
                        "failed to open sealed credential",
                        anyhow::anyhow!("AES-GCM decryption failed: {e}"),
                    )
                })?,
        );

        let text = std::str::from_utf8(&plaintext).map_err(|e| {
            GatewayError::internal_with_source("sealed credential is not valid UTF-8", e)
        })?;
        Ok(SecretMaterial::from(text))
    }

    /// 生成新的封存密钥（十六进制）
    #[must_use]
    pub fn generate_key() -> String {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        hex::encode(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_returns_material() {
        let sealer = SecretSealer::ephemeral();
        let material = SecretMaterial::from("sk-sealed-123");
        let sealed = sealer.seal(&material).unwrap();
        assert_eq!(sealer.open(&sealed).unwrap(), material);
    }

    #[test]
    fn ciphertext_does_not_contain_plaintext() {
        let sealer = SecretSealer::new(&[7u8; 32]);
        let sealed = sealer.seal(&SecretMaterial::from("plain-secret")).unwrap();
        let haystack = String::from_utf8_lossy(&sealed.ciphertext);
        assert!(!haystack.contains("plain-secret"));
        assert!(!format!("{sealed:?}").contains("plain-secret"));
    }

    #[test]
    fn another_key_cannot_open() {
        let sealed = SecretSealer::new(&[1u8; 32])
            .seal(&SecretMaterial::from("sk-1"))
            .unwrap();
        assert!(SecretSealer::new(&[2u8; 32]).open(&sealed).is_err());
    }

    #[test]
    fn hex_key_is_validated() {
        let key = SecretSealer::generate_key();
        assert_eq!(key.len(), 64);
        assert!(SecretSealer::from_hex_key(&key).is_ok());
        assert!(SecretSealer::from_hex_key("abcd").is_err());
        assert!(SecretSealer::from_hex_key(&"zz".repeat(32)).is_err());
    }
}
