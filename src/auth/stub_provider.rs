//! Stub implementation of the AuthProvider trait
//!
//! The real authprovider service does not exist yet; its query contract is
//! fixed but its decision logic is an external collaborator. This stub keeps
//! the gate wired through the whole request path while answering allow to
//! every query.

use crate::auth::{AuthProvider, PermissionObject};
use log::debug;

/// Always-allow oracle stand-in used until a real authprovider is deployed.
pub struct StubAuthProvider;

impl StubAuthProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for StubAuthProvider {
    fn check(&self, permission: &PermissionObject, _token: &str) -> bool {
        debug!("Stub oracle allowing: {}", permission.serialize());
        true
    }

    fn personal_info(&self, _token: &str) -> String {
        // Pseudonymous placeholder identity; the real annotation comes from
        // the authprovider, which alone can resolve it to a person.
        "Erkki Esimerkki".to_string()
    }

    fn record_partial(&self, _namespace: &str, _fileid: &str) -> String {
        "{}".to_string()
    }
}
