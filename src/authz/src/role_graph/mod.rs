//! Role graph resolution
//!
//! Computes the closure of the role-inheritance graph starting from a set
//! of role names, gathering subordinate roles, privileges and
//! authentication restrictions on the way.
//!
//! # Features
//!
//! - **Breadth-first closure**: one store fetch per distinct role reached
//! - **Cycle tolerance**: a visited set stops re-expansion, so `A -> B -> A`
//!   terminates
//! - **Missing roles are skipped**: a dangling reference drops out of the
//!   closure without an error
//! - **Malformed documents abort**: a wrongly-typed field fails the whole
//!   resolution
//!
//! # Example
//!
//! ```rust
//! use docdb_authz::builtin::StaticBuiltinRoles;
//! use docdb_authz::role_graph::{ResolveRoleOption, RoleResolver};
//! use docdb_authz::store::InMemoryAuthzStore;
//! use docdb_authz::types::{Namespace, RoleName};
//! use serde_json::json;
//!
//! let store = InMemoryAuthzStore::new();
//! let role = json!({"role": "r1", "db": "test", "roles": [{"role": "read", "db": "test"}], "privileges": []});
//! store.insert(&Namespace::roles(None), role.as_object().unwrap().clone());
//!
//! let builtins = StaticBuiltinRoles::new();
//! let resolver = RoleResolver::new(&store, &builtins);
//! let resolved = resolver
//!     .resolve_roles([RoleName::new("r1", "test")], ResolveRoleOption::ALL)
//!     .unwrap();
//!
//! assert!(resolved.roles.unwrap().contains(&RoleName::new("read", "test")));
//! ```

pub mod document;
pub mod options;
pub mod resolver;

#[cfg(test)]
mod tests;

pub use document::{parse_role_document, ParsedRoleDocument};
pub use options::ResolveRoleOption;
pub use resolver::{ResolvedRoleData, RoleResolver};
