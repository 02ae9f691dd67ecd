//! # DocDB Authorization State
//!
//! Role resolution and user acquisition for a document database.
//!
//! ## Features
//!
//! - **Role graph closure** over stored role documents, tolerant of cycles
//!   and dangling references
//! - **User materialization** for stored and externally authenticated
//!   identities, with tenant isolation
//! - **Role descriptions** with inherited roles, privileges and
//!   authentication restrictions
//! - **Cache invalidation** driven by observed operation-log writes
//! - **Per-tenant read snapshots** so a concurrent role mutation is never
//!   seen half applied
//!
//! ## Example
//!
//! ```rust
//! use docdb_authz::{AuthzConfig, AuthzState, InMemoryAuthzStore, UserCache, UserRequest};
//! use docdb_authz::privilege::ActionType;
//! use docdb_authz::types::{Namespace, UserName};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryAuthzStore::new());
//! let user = json!({
//!     "_id": "app.alice",
//!     "user": "alice",
//!     "db": "app",
//!     "credentials": {"SCRAM-SHA-256": {}},
//!     "roles": [{"role": "readWrite", "db": "app"}],
//! });
//! store.insert(&Namespace::users(None), user.as_object().cloned().unwrap_or_default());
//!
//! let config = AuthzConfig::default();
//! let cache = Arc::new(UserCache::new(&config.user_cache));
//! let state = AuthzState::new(config, store, cache)?;
//!
//! let alice = state.get_user_object(&UserRequest::new(UserName::new("alice", "app")))?;
//! assert!(alice.is_authorized_for("app", "orders", ActionType::Insert));
//! # Ok(())
//! # }
//! ```

pub mod builtin;
pub mod cache;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod privilege;
pub mod restriction;
pub mod role_graph;
pub mod state;
pub mod store;
pub mod types;
pub mod user;

// Re-export commonly used types
pub use builtin::{BuiltinRoleCatalog, StaticBuiltinRoles};
pub use cache::{UserCache, UserCacheInvalidator, UserCacheStats};
pub use config::{AuthzConfig, UserCacheConfig};
pub use error::{AuthzError, ErrorCode, Result};
pub use invalidation::{OpType, OplogEntry};
pub use privilege::{ActionType, Privilege, PrivilegeVector, ResourcePattern};
pub use restriction::{RestrictionDocument, RestrictionDocuments, RestrictionSet};
pub use role_graph::{ResolveRoleOption, ResolvedRoleData, RoleResolver};
pub use state::{AuthzState, PrivilegeDocumentsFlag, PrivilegeFormat, RestrictionsFormat};
pub use store::{AuthzStore, InMemoryAuthzStore, RolesLocks};
pub use types::{Document, Namespace, RoleName, TenantId, UserName};
pub use user::{CredentialData, User, UserRequest};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
