use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Maximum length of a sanitized file name inside a key.
const MAX_NAME_LEN: usize = 96;

/// A validated object key relative to the store root.
///
/// Keys are `/`-separated segments made of ASCII alphanumerics, `.`, `-` and
/// `_`. No segment may be empty or start with `.`, so a key can never escape
/// the store root or land in the store's scratch directory.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Parse and validate an existing key.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        if s.is_empty() {
            return Err(StorageError::InvalidIdentifier("empty object key".into()));
        }

        for segment in s.split('/') {
            validate_segment(segment)
                .map_err(|msg| StorageError::InvalidIdentifier(format!("{msg} in key '{s}'")))?;
        }

        Ok(Self(s.to_string()))
    }

    /// Generate a fresh, collision-free key for an uploaded file.
    ///
    /// The result looks like `{folder}/{uuid}-{sanitized name}`.
    pub fn generate(folder: &str, file_name: &str) -> Result<Self, StorageError> {
        let folder = folder.trim_matches('/');
        for segment in folder.split('/') {
            validate_segment(segment)
                .map_err(|msg| StorageError::InvalidName(format!("{msg} in folder '{folder}'")))?;
        }

        let name = sanitize_file_name(file_name)
            .ok_or_else(|| StorageError::InvalidName(format!("unusable file name '{file_name}'")))?;

        Ok(Self(format!("{folder}/{}-{name}", uuid::Uuid::new_v4())))
    }

    /// Resolve a public URL produced by [`ObjectKey::to_url`] back to its key.
    pub fn from_url(base_url: &str, url: &str) -> Result<Self, StorageError> {
        let base = base_url.trim_end_matches('/');
        let key = url
            .strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                StorageError::InvalidIdentifier(format!("'{url}' is not served from '{base}'"))
            })?;
        Self::parse(key)
    }

    /// Public URL of this key under `base_url`.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path segment (the stored file name).
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

fn validate_segment(segment: &str) -> Result<(), &'static str> {
    if segment.is_empty() {
        return Err("empty path segment");
    }
    if segment.starts_with('.') {
        return Err("hidden or relative path segment");
    }
    if !segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err("illegal character");
    }
    Ok(())
}

/// Reduce an arbitrary client file name to a safe single segment.
fn sanitize_file_name(file_name: &str) -> Option<String> {
    // Browsers on Windows may send the full client path.
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);

    let mut name: String = base
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = name.trim_matches('.');
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '_') {
        return None;
    }
    name = trimmed.to_string();

    if name.len() > MAX_NAME_LEN {
        let keep_ext = name
            .rfind('.')
            .map(|i| name[i..].to_string())
            .filter(|ext| ext.len() <= 10)
            .unwrap_or_default();
        name.truncate(MAX_NAME_LEN - keep_ext.len());
        name.push_str(&keep_ext);
    }

    Some(name)
}

impl fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectKey({})", self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ObjectKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObjectKey::parse(&s).map_err(serde::de::Error::custom)
    }
}
