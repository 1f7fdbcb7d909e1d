//! Authentication credentials for the storage API.
//!
//! Credential acquisition (token exchange, key files) is out of scope for
//! this crate; callers obtain a bearer token elsewhere and hand it over.

use serde::{Deserialize, Serialize};

/// Bearer-token credentials for the storage API.
///
/// The token is attached to every request as an `Authorization` header. It
/// is never serialized and only ever logged in masked form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageCredentials {
    /// Bearer token presented on every request.
    #[serde(skip_serializing)]
    pub token: String,
}

impl StorageCredentials {
    /// Creates credentials from a bearer token.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use strato_storage::StorageCredentials;
    ///
    /// let credentials = StorageCredentials::new("ya29.a0AfH6SMBx");
    /// ```
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Returns the bearer token.
    #[inline]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns a masked version of the token for logging.
    ///
    /// This shows only the first 4 characters followed by asterisks.
    pub fn token_masked(&self) -> String {
        if self.token.len() <= 4 {
            "*".repeat(self.token.len())
        } else {
            format!("{}***", &self.token[..4])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_new() {
        let creds = StorageCredentials::new("secret-token");
        assert_eq!(creds.token(), "secret-token");
    }

    #[test]
    fn test_credentials_masking() {
        let creds = StorageCredentials::new("ya29.a0AfH6SMBx");
        assert_eq!(creds.token_masked(), "ya29***");

        let short = StorageCredentials::new("abc");
        assert_eq!(short.token_masked(), "***");
    }

    #[test]
    fn test_token_not_serialized() {
        let creds = StorageCredentials::new("secret-token");
        let json = serde_json::to_string(&creds).unwrap();
        assert!(!json.contains("secret-token"));
    }
}
