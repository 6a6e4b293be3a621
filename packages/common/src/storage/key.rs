use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Top-level namespace a blob lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// Inline-rendered images.
    Images,
    /// Downloadable attachments.
    Files,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Files => "files",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated storage key: a bucket plus a flat file name.
///
/// Names never contain path separators, `..`, control characters or a
/// leading dot, so a key always maps to exactly one file inside its bucket.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlobKey {
    bucket: Bucket,
    name: String,
}

impl BlobKey {
    pub fn new(bucket: Bucket, name: impl Into<String>) -> Result<Self, StorageError> {
        let name = name.into();
        if name.is_empty() || name.len() > 255 {
            return Err(StorageError::InvalidName(name));
        }
        if name.starts_with('.')
            || name.contains(['/', '\\', '\0'])
            || name.chars().any(|c| c.is_control())
        {
            return Err(StorageError::InvalidName(name));
        }
        Ok(Self { bucket, name })
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.name)
    }
}
