// Bearer credential shared between the settings surface and the core.
// The core only reads it; absence means anonymous requests.

use std::fmt;
use std::sync::{Arc, RwLock};

/// Cloneable handle to an optional GitHub token.
#[derive(Clone, Default)]
pub struct Credentials {
    token: Arc<RwLock<Option<String>>>,
}

impl Credentials {
    /// Create a handle holding the given token (empty strings count as absent).
    pub fn new(token: Option<String>) -> Self {
        let creds = Self::default();
        creds.set(token);
        creds
    }

    /// Anonymous handle.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Current token, if any.
    pub fn get(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.get().is_some()
    }

    /// Replace the token.
    pub fn set(&self, token: Option<String>) {
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    pub fn clear(&self) {
        self.set(None);
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("present", &self.is_present())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_is_absent() {
        let creds = Credentials::new(Some("   ".to_string()));
        assert!(!creds.is_present());
    }

    #[test]
    fn test_set_is_visible_to_clones() {
        let creds = Credentials::anonymous();
        let other = creds.clone();
        creds.set(Some("ghp_abc".to_string()));
        assert_eq!(other.get().as_deref(), Some("ghp_abc"));

        other.clear();
        assert!(creds.get().is_none());
    }

    #[test]
    fn test_debug_hides_token() {
        let creds = Credentials::new(Some("secret".to_string()));
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("secret"));
    }
}
