//! Tests for role graph resolution

use super::*;
use crate::builtin::{BuiltinRoleCatalog, StaticBuiltinRoles};
use crate::error::{ErrorCode, Result};
use crate::privilege::{ActionType, PrivilegeVector};
use crate::store::{AuthzStore, InMemoryAuthzStore};
use crate::types::{Document, Namespace, RoleName, TenantId};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Store wrapper counting `find_one` calls
struct CountingStore {
    inner: InMemoryAuthzStore,
    finds: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: InMemoryAuthzStore::new(),
            finds: AtomicUsize::new(0),
        }
    }

    fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }
}

impl AuthzStore for CountingStore {
    fn find_one(&self, ns: &Namespace, filter: &Document) -> Result<Option<Document>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one(ns, filter)
    }

    fn query(
        &self,
        ns: &Namespace,
        filter: &Document,
        projection: Option<&Document>,
        each: &mut dyn FnMut(&Document) -> Result<()>,
    ) -> Result<()> {
        self.inner.query(ns, filter, projection, each)
    }
}

fn role_doc(role: &str, db: &str, subroles: &[(&str, &str)], actions: &[&str]) -> Document {
    let roles: Vec<Value> = subroles
        .iter()
        .map(|(r, d)| json!({"role": r, "db": d}))
        .collect();
    let privileges = if actions.is_empty() {
        json!([])
    } else {
        json!([{"resource": {"db": db, "collection": ""}, "actions": actions}])
    };
    json!({
        "_id": format!("{}.{}", db, role),
        "role": role,
        "db": db,
        "roles": roles,
        "privileges": privileges,
    })
    .as_object()
    .cloned()
    .unwrap()
}

fn store_with(docs: Vec<Document>) -> InMemoryAuthzStore {
    let store = InMemoryAuthzStore::new();
    for doc in docs {
        store.insert(&Namespace::roles(None), doc);
    }
    store
}

fn names(list: &[&str]) -> BTreeSet<RoleName> {
    list.iter().map(|r| RoleName::new(*r, "test")).collect()
}

#[test]
fn test_end_to_end_two_level_closure() {
    let store = store_with(vec![
        role_doc("r1", "test", &[("r2", "test")], &["find"]),
        role_doc("r2", "test", &[], &["insert"]),
    ]);
    let builtins = StaticBuiltinRoles::new();
    let resolver = RoleResolver::new(&store, &builtins);

    let resolved = resolver
        .resolve_roles([RoleName::new("r1", "test")], ResolveRoleOption::ALL)
        .unwrap();

    assert_eq!(resolved.roles.unwrap(), names(&["r2"]));
    let privileges = resolved.privileges.unwrap();
    assert!(privileges.is_authorized(None, "test", "c", ActionType::Find));
    assert!(privileges.is_authorized(None, "test", "c", ActionType::Insert));
    assert!(resolved.restrictions.unwrap().is_empty());
}

#[test]
fn test_closure_of_chain() {
    let store = store_with(vec![
        role_doc("a", "test", &[("b", "test")], &[]),
        role_doc("b", "test", &[("c", "test")], &[]),
        role_doc("c", "test", &[("d", "test")], &[]),
        role_doc("d", "test", &[], &[]),
    ]);
    let builtins = StaticBuiltinRoles::new();
    let resolver = RoleResolver::new(&store, &builtins);

    let resolved = resolver
        .resolve_roles([RoleName::new("a", "test")], ResolveRoleOption::ROLES)
        .unwrap();

    assert_eq!(resolved.roles.unwrap(), names(&["b", "c", "d"]));
    assert!(resolved.privileges.is_none());
    assert!(resolved.restrictions.is_none());
}

#[test]
fn test_cycle_terminates() {
    let store = CountingStore::new();
    store.inner.insert(&Namespace::roles(None), role_doc("a", "test", &[("b", "test")], &[]));
    store.inner.insert(&Namespace::roles(None), role_doc("b", "test", &[("a", "test")], &[]));
    let builtins = StaticBuiltinRoles::new();
    let resolver = RoleResolver::new(&store, &builtins);

    let resolved = resolver
        .resolve_roles([RoleName::new("a", "test")], ResolveRoleOption::ROLES)
        .unwrap();

    assert_eq!(resolved.roles.unwrap(), names(&["b"]));
    assert_eq!(store.finds(), 2);
}

#[test]
fn test_diamond_expands_shared_role_once() {
    let store = CountingStore::new();
    for doc in [
        role_doc("top", "test", &[("left", "test"), ("right", "test")], &[]),
        role_doc("left", "test", &[("bottom", "test")], &[]),
        role_doc("right", "test", &[("bottom", "test")], &[]),
        role_doc("bottom", "test", &[], &["find"]),
    ] {
        store.inner.insert(&Namespace::roles(None), doc);
    }
    let builtins = StaticBuiltinRoles::new();
    let resolver = RoleResolver::new(&store, &builtins);

    let resolved = resolver
        .resolve_roles([RoleName::new("top", "test")], ResolveRoleOption::ALL)
        .unwrap();

    assert_eq!(resolved.roles.unwrap(), names(&["bottom", "left", "right"]));
    assert_eq!(store.finds(), 4);
}

#[test]
fn test_builtin_roles_are_not_fetched() {
    let store = CountingStore::new();
    let builtins = StaticBuiltinRoles::new();
    let resolver = RoleResolver::new(&store, &builtins);

    let resolved = resolver
        .resolve_roles([RoleName::new("read", "test")], ResolveRoleOption::ALL)
        .unwrap();

    assert_eq!(store.finds(), 0);
    assert!(resolved.roles.unwrap().is_empty());
    assert!(resolved
        .privileges
        .unwrap()
        .is_authorized(None, "test", "orders", ActionType::Find));
}

#[test]
fn test_builtin_subrole_contributes_privileges() {
    let store = store_with(vec![role_doc("app", "test", &[("readWrite", "test")], &[])]);
    let builtins = StaticBuiltinRoles::new();
    let resolver = RoleResolver::new(&store, &builtins);

    let resolved = resolver
        .resolve_roles([RoleName::new("app", "test")], ResolveRoleOption::ALL)
        .unwrap();

    assert_eq!(resolved.roles.unwrap(), names(&["readWrite"]));
    assert!(resolved
        .privileges
        .unwrap()
        .is_authorized(None, "test", "orders", ActionType::Update));
}

#[test]
fn test_missing_role_is_skipped() {
    let store = store_with(vec![
        role_doc("a", "test", &[("ghost", "test"), ("b", "test")], &[]),
        role_doc("b", "test", &[], &["find"]),
    ]);
    let builtins = StaticBuiltinRoles::new();
    let resolver = RoleResolver::new(&store, &builtins);

    let resolved = resolver
        .resolve_roles(
            [RoleName::new("a", "test"), RoleName::new("nobody", "test")],
            ResolveRoleOption::ALL,
        )
        .unwrap();

    // A dangling reference is still reported as a subordinate name.
    assert_eq!(resolved.roles.unwrap(), names(&["b", "ghost"]));
    assert_eq!(resolved.privileges.unwrap().len(), 1);
}

#[test]
fn test_malformed_privileges_abort_resolution() {
    let mut bad = role_doc("b", "test", &[], &[]);
    bad.insert("privileges".to_string(), json!("find"));
    let store = store_with(vec![role_doc("a", "test", &[("b", "test")], &["find"]), bad]);
    let builtins = StaticBuiltinRoles::new();
    let resolver = RoleResolver::new(&store, &builtins);

    let err = resolver
        .resolve_roles([RoleName::new("a", "test")], ResolveRoleOption::ALL)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnsupportedFormat);
}

#[test]
fn test_malformed_roles_field_is_bad_value() {
    let mut bad = role_doc("a", "test", &[], &[]);
    bad.insert("roles".to_string(), json!({"role": "b", "db": "test"}));
    let store = store_with(vec![bad]);
    let builtins = StaticBuiltinRoles::new();
    let resolver = RoleResolver::new(&store, &builtins);

    let err = resolver
        .resolve_roles([RoleName::new("a", "test")], ResolveRoleOption::ROLES)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::BadValue);
}

#[test]
fn test_direct_only_stops_after_first_level() {
    let store = CountingStore::new();
    for doc in [
        role_doc("a", "test", &[("b", "test")], &["find"]),
        role_doc("b", "test", &[("c", "test")], &["insert"]),
        role_doc("c", "test", &[], &["remove"]),
    ] {
        store.inner.insert(&Namespace::roles(None), doc);
    }
    let builtins = StaticBuiltinRoles::new();
    let resolver = RoleResolver::new(&store, &builtins);

    let resolved = resolver
        .resolve_roles(
            [RoleName::new("a", "test")],
            ResolveRoleOption::ALL | ResolveRoleOption::DIRECT_ONLY,
        )
        .unwrap();

    assert_eq!(resolved.roles.unwrap(), names(&["b"]));
    let privileges = resolved.privileges.unwrap();
    assert!(privileges.is_authorized(None, "test", "c", ActionType::Find));
    assert!(!privileges.is_authorized(None, "test", "c", ActionType::Insert));
    assert_eq!(store.finds(), 1);
}

#[test]
fn test_restrictions_collected_as_alternatives() {
    let mut a = role_doc("a", "test", &[("b", "test")], &[]);
    a.insert(
        "authenticationRestrictions".to_string(),
        json!([{"clientSource": ["10.0.0.0/8"]}]),
    );
    let mut b = role_doc("b", "test", &[("c", "test")], &[]);
    b.insert(
        "authenticationRestrictions".to_string(),
        json!([{"serverAddress": ["192.168.1.1"]}]),
    );
    let mut c = role_doc("c", "test", &[], &[]);
    c.insert("authenticationRestrictions".to_string(), json!([]));
    let store = store_with(vec![a, b, c]);
    let builtins = StaticBuiltinRoles::new();
    let resolver = RoleResolver::new(&store, &builtins);

    let resolved = resolver
        .resolve_roles([RoleName::new("a", "test")], ResolveRoleOption::RESTRICTIONS)
        .unwrap();

    let restrictions = resolved.restrictions.unwrap();
    assert_eq!(restrictions.len(), 2);
    let client = "10.1.2.3".parse().unwrap();
    let elsewhere = "172.16.0.1".parse().unwrap();
    assert!(restrictions.is_satisfied_by(client, elsewhere));
    assert!(!restrictions.is_satisfied_by(elsewhere, elsewhere));
}

#[test]
fn test_tenant_propagates_to_subroles_and_privileges() {
    let tenant = TenantId::new("t1");
    let store = InMemoryAuthzStore::new();
    store.insert(
        &Namespace::roles(Some(&tenant)),
        role_doc("a", "test", &[("b", "test")], &["find"]),
    );
    store.insert(&Namespace::roles(Some(&tenant)), role_doc("b", "test", &[], &["insert"]));
    // Same names in the untenanted namespace must not leak in.
    store.insert(&Namespace::roles(None), role_doc("b", "test", &[], &["dropDatabase"]));
    let builtins = StaticBuiltinRoles::new();
    let resolver = RoleResolver::new(&store, &builtins);

    let start = RoleName::new("a", "test").with_tenant(Some(tenant.clone()));
    let resolved = resolver.resolve_roles([start], ResolveRoleOption::ALL).unwrap();

    let roles = resolved.roles.unwrap();
    assert_eq!(roles.len(), 1);
    assert!(roles.contains(&RoleName::new("b", "test").with_tenant(Some(tenant.clone()))));

    let privileges = resolved.privileges.unwrap();
    assert!(privileges.is_authorized(Some(&tenant), "test", "c", ActionType::Insert));
    assert!(!privileges.is_authorized(None, "test", "c", ActionType::Insert));
    assert!(!privileges.is_authorized(Some(&tenant), "test", "c", ActionType::DropDatabase));
}

#[test]
fn test_empty_start_resolves_to_empty_facets() {
    let store = InMemoryAuthzStore::new();
    let builtins = StaticBuiltinRoles::new();
    let resolver = RoleResolver::new(&store, &builtins);

    let resolved = resolver
        .resolve_roles(Vec::<RoleName>::new(), ResolveRoleOption::ALL)
        .unwrap();
    assert!(resolved.roles.unwrap().is_empty());
    assert!(resolved.privileges.unwrap().is_empty());
}

/// Catalog that claims `read` but cannot produce its privileges
struct BrokenCatalog;

impl BuiltinRoleCatalog for BrokenCatalog {
    fn is_builtin_role(&self, role: &RoleName) -> bool {
        role.role() == "read"
    }

    fn add_privileges_for_builtin_role(&self, _role: &RoleName, _privileges: &mut PrivilegeVector) -> bool {
        false
    }

    fn builtin_role_names_for_db(&self, _db: &str, _tenant: Option<&TenantId>) -> BTreeSet<RoleName> {
        BTreeSet::new()
    }
}

#[test]
fn test_builtin_privilege_failure_is_operation_failed() {
    let store = store_with(vec![role_doc("a", "test", &[("read", "test")], &["find"])]);
    let resolver = RoleResolver::new(&store, &BrokenCatalog);

    let err = resolver
        .resolve_roles([RoleName::new("read", "test")], ResolveRoleOption::ALL)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::OperationFailed);

    // Reached through a stored role as well.
    let err = resolver
        .resolve_roles([RoleName::new("a", "test")], ResolveRoleOption::PRIVILEGES)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::OperationFailed);

    // Without privileges requested the catalog is not asked.
    let resolved = resolver
        .resolve_roles([RoleName::new("a", "test")], ResolveRoleOption::ROLES)
        .unwrap();
    assert_eq!(resolved.roles.unwrap(), names(&["read"]));
}
