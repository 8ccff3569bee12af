// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The data store proper.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from data store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data key '{0}' may only contain alphanumeric characters and underscores")]
    InvalidKey(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("properties are not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Who a stored record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    Node(String),
    Package(String),
}

impl Owner {
    pub fn node(id: impl Into<String>) -> Self {
        Owner::Node(id.into())
    }

    pub fn package(id: impl Into<String>) -> Self {
        Owner::Package(id.into())
    }

    fn kind_dir(&self) -> &'static str {
        match self {
            Owner::Node(_) => "node",
            Owner::Package(_) => "package",
        }
    }

    fn id(&self) -> &str {
        match self {
            Owner::Node(id) | Owner::Package(id) => id,
        }
    }
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind_dir(), self.id())
    }
}

/// A stored data blob; the payload kind is encoded in the file suffix.
#[derive(Debug, Clone, PartialEq)]
pub enum Blob {
    Binary(Vec<u8>),
    Text(String),
}

impl Blob {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Blob::Binary(b) => b,
            Blob::Text(s) => s.as_bytes(),
        }
    }
}

/// A JSON properties document.
pub type Properties = Map<String, Value>;

/// Persists per-owner properties and data blobs under an execution folder.
#[derive(Debug, Clone)]
pub struct DataStore {
    root: PathBuf,
}

impl DataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn owner_dir(&self, owner: &Owner) -> PathBuf {
        self.root.join(owner.kind_dir()).join(owner.id())
    }

    /// Directory for opaque per-owner files; created on demand by callers.
    pub fn files_dir(&self, owner: &Owner) -> PathBuf {
        self.owner_dir(owner).join("files")
    }

    /// Load the owner's properties document. Absent records read as empty.
    pub fn properties(&self, owner: &Owner) -> Result<Properties, StoreError> {
        let path = self.owner_dir(owner).join("properties.json");
        if !path.exists() {
            return Ok(Properties::new());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Replace the owner's properties document; `None` removes it.
    pub fn set_properties(
        &self,
        owner: &Owner,
        properties: Option<&Properties>,
    ) -> Result<(), StoreError> {
        let dir = self.owner_dir(owner);
        let path = dir.join("properties.json");
        match properties {
            None => {
                if path.exists() {
                    fs::remove_file(&path)?;
                }
            }
            Some(props) => {
                fs::create_dir_all(&dir)?;
                write_atomic(&path, serde_json::to_string(props)?.as_bytes())?;
            }
        }
        Ok(())
    }

    /// Read a single property, or `None` if unset.
    pub fn property(&self, owner: &Owner, name: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.properties(owner)?.get(name).cloned())
    }

    /// Merge one property into the document; `None` removes the key.
    pub fn set_property(
        &self,
        owner: &Owner,
        name: &str,
        value: Option<Value>,
    ) -> Result<(), StoreError> {
        let mut properties = self.properties(owner)?;
        match value {
            Some(v) => {
                properties.insert(name.to_string(), v);
            }
            None => {
                properties.remove(name);
            }
        }
        self.set_properties(owner, Some(&properties))
    }

    /// Read a data blob by key, or `None` if neither suffix file exists.
    pub fn data(&self, owner: &Owner, key: &str) -> Result<Option<Blob>, StoreError> {
        check_key(key)?;
        let base = self.owner_dir(owner).join("data").join(key);
        let binary_path = suffixed(&base, "binary");
        if binary_path.exists() {
            return Ok(Some(Blob::Binary(fs::read(&binary_path)?)));
        }
        let text_path = suffixed(&base, "text");
        if text_path.exists() {
            return Ok(Some(Blob::Text(fs::read_to_string(&text_path)?)));
        }
        Ok(None)
    }

    /// Write a data blob, removing the complementary suffix file; `None`
    /// removes both.
    pub fn set_data(&self, owner: &Owner, key: &str, data: Option<Blob>) -> Result<(), StoreError> {
        check_key(key)?;
        let dir = self.owner_dir(owner).join("data");
        let base = dir.join(key);
        let binary_path = suffixed(&base, "binary");
        let text_path = suffixed(&base, "text");

        match data {
            None => {
                remove_if_present(&binary_path)?;
                remove_if_present(&text_path)?;
            }
            Some(Blob::Binary(bytes)) => {
                fs::create_dir_all(&dir)?;
                write_atomic(&binary_path, &bytes)?;
                remove_if_present(&text_path)?;
            }
            Some(Blob::Text(text)) => {
                fs::create_dir_all(&dir)?;
                write_atomic(&text_path, text.as_bytes())?;
                remove_if_present(&binary_path)?;
            }
        }
        Ok(())
    }

    /// Delete everything stored for an owner.
    pub fn remove_owner(&self, owner: &Owner) -> Result<(), StoreError> {
        let dir = self.owner_dir(owner);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}

fn check_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn suffixed(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Write to a temp sibling and rename over the destination.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = suffixed(path, "tmp");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
