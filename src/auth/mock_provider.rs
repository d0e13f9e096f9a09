//! Mock implementation of the AuthProvider trait for testing

use crate::auth::{AuthProvider, PermissionObject};
use std::collections::HashSet;
use std::sync::Mutex;

/// Scriptable oracle for tests: a default verdict plus a token deny-list,
/// with a log of every queried permission object.
pub struct MockAuthProvider {
    allow_by_default: bool,
    denied_tokens: Mutex<HashSet<String>>,
    queried: Mutex<Vec<PermissionObject>>,
}

impl MockAuthProvider {
    pub fn allow_all() -> Self {
        Self {
            allow_by_default: true,
            denied_tokens: Mutex::new(HashSet::new()),
            queried: Mutex::new(Vec::new()),
        }
    }

    pub fn deny_all() -> Self {
        Self {
            allow_by_default: false,
            denied_tokens: Mutex::new(HashSet::new()),
            queried: Mutex::new(Vec::new()),
        }
    }

    /// Deny one specific token while keeping the default verdict.
    pub fn deny_token(&self, token: &str) {
        let mut denied = self.denied_tokens.lock().unwrap();
        denied.insert(token.to_string());
    }

    /// Every permission object the oracle has been queried with, in order.
    pub fn queried_permissions(&self) -> Vec<PermissionObject> {
        let queried = self.queried.lock().unwrap();
        queried.clone()
    }

    /// Number of oracle queries made so far.
    pub fn query_count(&self) -> usize {
        let queried = self.queried.lock().unwrap();
        queried.len()
    }
}

impl AuthProvider for MockAuthProvider {
    fn check(&self, permission: &PermissionObject, token: &str) -> bool {
        let mut queried = self.queried.lock().unwrap();
        queried.push(permission.clone());

        let denied = self.denied_tokens.lock().unwrap();
        if denied.contains(token) {
            return false;
        }
        self.allow_by_default
    }

    fn personal_info(&self, token: &str) -> String {
        format!("pseudonym-for-{}", token)
    }

    fn record_partial(&self, namespace: &str, fileid: &str) -> String {
        format!(r#"{{"namespace": "{}", "fileid": "{}"}}"#, namespace, fileid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_verdicts() {
        let allow = MockAuthProvider::allow_all();
        let deny = MockAuthProvider::deny_all();
        let permission = PermissionObject::for_route("GET", "/api/files/");

        assert!(allow.check(&permission, "t1"));
        assert!(!deny.check(&permission, "t1"));
    }

    #[test]
    fn test_token_deny_list() {
        let provider = MockAuthProvider::allow_all();
        provider.deny_token("bad-token");

        let permission = PermissionObject::for_route("GET", "/api/files/");
        assert!(provider.check(&permission, "good-token"));
        assert!(!provider.check(&permission, "bad-token"));
        assert_eq!(provider.query_count(), 2);
    }
}
