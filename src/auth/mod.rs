//! Authorization layer
//!
//! Access control is delegated to an external oracle ("authprovider"). This
//! service only decides how permission objects are associated with its
//! resources: every (HTTP method, URL) pair maps to a permission object, and
//! individual files additionally contribute a stored partial that is combined
//! with the route-level object at access time.
//!
//! Permission objects are opaque here by contract: they are JSON values that
//! serialize to a header-transportable string. The oracle, not this service,
//! interprets them. Tokens are pseudonymous; only the oracle knows who owns
//! a token and what it grants.

pub mod mock_provider;
pub mod stub_provider;

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::store::RecordStore;

/// Opaque, string-transportable description of what an attempted action
/// requires. Evaluated only by the external oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionObject(serde_json::Value);

impl PermissionObject {
    /// Permission object for a (method, path) pair. This is the whole object
    /// for collection-class resources.
    pub fn for_route(method: &str, path: &str) -> Self {
        Self(json!({ "method": method, "route": path }))
    }

    /// Combine the route-level object with a record's stored partial. An
    /// unparseable partial is carried as an opaque string rather than
    /// dropped, so the oracle still sees it.
    pub fn combine(&self, partial: &str) -> Self {
        let record_part = serde_json::from_str::<serde_json::Value>(partial)
            .unwrap_or_else(|_| json!(partial));
        Self(json!({ "route": self.0, "record": record_part }))
    }

    /// Serialize to the form sent to the oracle.
    pub fn serialize(&self) -> String {
        self.0.to_string()
    }
}

/// Resource classes the gate distinguishes. Only individual files carry a
/// stored permission partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource<'a> {
    /// The service root (admin surface).
    CollectionRoot,
    /// `/api/files/` or a namespace listing.
    Collection,
    /// One file in one namespace.
    File {
        namespace: &'a str,
        fileid: &'a str,
    },
}

/// The external authorization collaborator. Implementations answer oracle
/// queries and supply the pseudonymous metadata stored with new records.
pub trait AuthProvider: Send + Sync {
    /// Strict boolean oracle answer for (permission object, token). There are
    /// no partial or graded permissions.
    fn check(&self, permission: &PermissionObject, token: &str) -> bool;

    /// Pseudonymous identity annotation recorded when a file is saved. Only
    /// the oracle can map it back to a person.
    fn personal_info(&self, token: &str) -> String;

    /// The record-scoped permission fragment stored alongside a new file.
    fn record_partial(&self, namespace: &str, fileid: &str) -> String;
}

/// The authorization gate: resolves the permission object for a resource and
/// queries the oracle. Stateless beyond the oracle query and, for files, one
/// read of the stored partial.
pub struct AuthGate {
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn RecordStore>,
}

impl AuthGate {
    pub fn new(provider: Arc<dyn AuthProvider>, store: Arc<dyn RecordStore>) -> Self {
        Self { provider, store }
    }

    /// Clear an attempted action with the oracle. Must run before any other
    /// validation so a denial never leaks whether the resource exists.
    pub fn authorize(&self, resource: Resource, path: &str, method: &str, token: &str) -> bool {
        let route_object = PermissionObject::for_route(method, path);
        let permission = match resource {
            Resource::File { namespace, fileid } => match self.store.get(namespace, fileid) {
                Ok(record) => route_object.combine(&record.permission_partial),
                // Not-yet-created files have no partial; the route-level
                // object alone decides.
                Err(_) => route_object,
            },
            Resource::CollectionRoot | Resource::Collection => route_object,
        };
        self.provider.check(&permission, token)
    }
}
