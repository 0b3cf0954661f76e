//! Deterministic cache-key derivation.
//!
//! A key is `namespace:part:part:…:name:value:…`. Positional parts keep
//! their order; named parts are sorted by name; sequences are sorted
//! element-wise; anything structured collapses to a short content hash.
//! Logically equal inputs therefore always yield the same key.

use sha2::{Digest, Sha256};

/// Keys longer than this collapse to `namespace:<hash>`.
pub const MAX_KEY_LEN: usize = 250;

/// Hex characters kept when hashing a structured value.
const VALUE_HASH_LEN: usize = 8;

/// Hex characters kept when hashing an over-long key.
const KEY_HASH_LEN: usize = 32;

/// One argument to a cache key.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyPart {
    /// Rendered as-is.
    Scalar(String),
    /// Rendered sorted and comma-joined.
    Seq(Vec<String>),
    /// Rendered as a content hash.
    Complex(serde_json::Value),
}

impl KeyPart {
    fn render(&self) -> String {
        match self {
            KeyPart::Scalar(s) => s.clone(),
            KeyPart::Seq(items) => {
                let mut sorted = items.clone();
                sorted.sort();
                sorted.join(",")
            }
            KeyPart::Complex(value) => {
                // serde_json maps are ordered, so this is canonical.
                let text = value.to_string();
                hash_hex(text.as_bytes(), VALUE_HASH_LEN)
            }
        }
    }
}

macro_rules! scalar_part {
    ($($t:ty),*) => {
        $(impl From<$t> for KeyPart {
            fn from(v: $t) -> Self {
                KeyPart::Scalar(v.to_string())
            }
        })*
    };
}

scalar_part!(&str, String, &String, bool, i32, i64, u8, u32, u64, usize, f64);

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => KeyPart::Scalar("none".to_string()),
        }
    }
}

impl From<Vec<String>> for KeyPart {
    fn from(v: Vec<String>) -> Self {
        KeyPart::Seq(v)
    }
}

impl From<&[String]> for KeyPart {
    fn from(v: &[String]) -> Self {
        KeyPart::Seq(v.to_vec())
    }
}

impl From<&Vec<String>> for KeyPart {
    fn from(v: &Vec<String>) -> Self {
        KeyPart::Seq(v.clone())
    }
}

impl From<serde_json::Value> for KeyPart {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::String(s) => KeyPart::Scalar(s),
            Value::Number(n) => KeyPart::Scalar(n.to_string()),
            Value::Bool(b) => KeyPart::Scalar(b.to_string()),
            Value::Null => KeyPart::Scalar("none".to_string()),
            Value::Array(items) if items.iter().all(is_scalar) => {
                KeyPart::Seq(items.iter().map(scalar_text).collect())
            }
            other => KeyPart::Complex(other),
        }
    }
}

fn is_scalar(v: &serde_json::Value) -> bool {
    !(v.is_array() || v.is_object())
}

fn scalar_text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "none".to_string(),
        other => other.to_string(),
    }
}

/// Builder for a namespaced cache key.
///
/// ```rust
/// # use souschef::cache::CacheKey;
/// let a = CacheKey::new("recipes")
///     .named("ingredients", vec!["tomato".to_string(), "basil".to_string()])
///     .named("max_results", 10usize)
///     .build();
/// let b = CacheKey::new("recipes")
///     .named("max_results", 10usize)
///     .named("ingredients", vec!["basil".to_string(), "tomato".to_string()])
///     .build();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone)]
pub struct CacheKey {
    namespace: String,
    positional: Vec<KeyPart>,
    named: Vec<(String, KeyPart)>,
}

impl CacheKey {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            positional: Vec::new(),
            named: Vec::new(),
        }
    }

    /// Append a positional argument.
    pub fn arg(mut self, part: impl Into<KeyPart>) -> Self {
        self.positional.push(part.into());
        self
    }

    /// Add a named argument. Order of calls does not matter.
    pub fn named(mut self, name: impl Into<String>, part: impl Into<KeyPart>) -> Self {
        self.named.push((name.into(), part.into()));
        self
    }

    /// Render the key.
    pub fn build(self) -> String {
        let mut parts = Vec::with_capacity(1 + self.positional.len() + self.named.len());
        parts.push(self.namespace.clone());
        parts.extend(self.positional.iter().map(KeyPart::render));

        let mut named = self.named;
        named.sort_by(|a, b| a.0.cmp(&b.0));
        parts.extend(
            named
                .iter()
                .map(|(name, part)| format!("{name}:{}", part.render())),
        );

        let key = parts.join(":");
        if key.len() > MAX_KEY_LEN {
            format!(
                "{}:{}",
                self.namespace,
                hash_hex(key.as_bytes(), KEY_HASH_LEN)
            )
        } else {
            key
        }
    }
}

/// Truncated lowercase hex SHA-256 digest.
pub fn hash_hex(data: &[u8], len: usize) -> String {
    let digest = Sha256::digest(data);
    let mut hex = hex::encode(digest);
    hex.truncate(len);
    hex
}
