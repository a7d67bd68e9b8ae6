use std::fmt;

use crate::store::error::{StoreError, StoreResult};

const SEPARATOR: char = '/';

/// Address of a part: the document key followed by the child keys leading to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartPath {
    keys: Vec<String>,
}

impl PartPath {
    /// Path of a document's root part.
    pub fn document(key: impl Into<String>) -> Self {
        Self { keys: vec![key.into()] }
    }

    pub fn from_keys<I, K>(keys: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Err(StoreError::InvalidPath("Empty path".to_string()));
        }
        Ok(Self { keys })
    }

    /// Parse `doc/a/b`. Empty segments are dropped.
    pub fn parse(path: &str) -> StoreResult<Self> {
        Self::from_keys(path.split(SEPARATOR).filter(|s| !s.is_empty()))
    }

    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut keys = self.keys.clone();
        keys.push(key.into());
        Self { keys }
    }

    /// Sibling path with the last key replaced.
    pub fn sibling(&self, key: impl Into<String>) -> Self {
        let mut keys = self.keys.clone();
        if keys.len() > 1 {
            keys.pop();
        }
        keys.push(key.into());
        Self { keys }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.keys.len() < 2 {
            return None;
        }
        Some(Self { keys: self.keys[..self.keys.len() - 1].to_vec() })
    }

    pub fn document_key(&self) -> &str {
        &self.keys[0]
    }

    /// Keys below the document root.
    pub fn relative(&self) -> &[String] {
        &self.keys[1..]
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn last(&self) -> &str {
        &self.keys[self.keys.len() - 1]
    }

    pub fn is_document(&self) -> bool {
        self.keys.len() == 1
    }

    pub fn depth(&self) -> usize {
        self.keys.len() - 1
    }
}

impl fmt::Display for PartPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keys.join("/"))
    }
}
