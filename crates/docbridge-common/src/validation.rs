//! Collection name validation
//!
//! Collection names are supplied per call, so they are checked before a
//! connection is opened.

use crate::error::{DocBridgeError, Result};

/// Collection name that can be handed to a driver
///
/// Only names no driver can address are rejected: the empty name and names
/// containing a NUL byte. Everything else (reserved prefixes, long names)
/// is left to the engine, which reports it as an engine error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCollectionName {
    name: String,
}

impl ValidatedCollectionName {
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(DocBridgeError::Validation(
                "Collection name cannot be empty".to_string(),
            ));
        }

        if name.contains('\0') {
            return Err(DocBridgeError::Validation(format!(
                "Collection name cannot contain null bytes: {:?}",
                name
            )));
        }

        Ok(ValidatedCollectionName {
            name: name.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn into_string(self) -> String {
        self.name
    }
}

impl AsRef<str> for ValidatedCollectionName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for ValidatedCollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
