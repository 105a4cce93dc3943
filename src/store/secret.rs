//! # 密钥材料
//!
//! `SecretMaterial` 是明文密钥唯一的容器类型，离开作用域时清零内存，
//! `Debug` 只输出脱敏标记。

use std::fmt;

use serde::{Deserialize, Deserializer};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// 明文密钥
#[derive(Clone, PartialEq, Eq)]
pub struct SecretMaterial(Zeroizing<String>);

impl SecretMaterial {
    /// 去除首尾空白后接管密钥文本，原始字符串会被清零
    #[must_use]
    pub fn new(raw: String) -> Self {
        let raw = Zeroizing::new(raw);
        Self(Zeroizing::new(raw.trim().to_string()))
    }

    /// 读取明文，仅限单次服务商调用内使用
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// SHA-256 指纹（十六进制），用于判断两份材料是否相同
    #[must_use]
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl From<&str> for SecretMaterial {
    fn from(raw: &str) -> Self {
        Self::new(raw.to_string())
    }
}

impl From<String> for SecretMaterial {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl<'de> Deserialize<'de> for SecretMaterial {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretMaterial([REDACTED])")
    }
}
