//! Shared fixtures for integration tests

#![allow(dead_code)]

use docdb_authz::{
    AuthzConfig, AuthzState, Document, InMemoryAuthzStore, Namespace, TenantId, UserCache,
};
use serde_json::{json, Value};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Install a test subscriber honoring `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// State over a fresh store and cache
pub struct Fixture {
    pub store: Arc<InMemoryAuthzStore>,
    pub cache: Arc<UserCache>,
    pub state: AuthzState,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(AuthzConfig::default())
    }

    pub fn with_config(config: AuthzConfig) -> Self {
        init_tracing();
        let store = Arc::new(InMemoryAuthzStore::new());
        let cache = Arc::new(UserCache::new(&config.user_cache));
        let state = AuthzState::new(config, store.clone(), cache.clone()).unwrap();
        Self { store, cache, state }
    }

    pub fn add_role(&self, tenant: Option<&TenantId>, doc: Document) {
        self.store.insert(&Namespace::roles(tenant), doc);
    }

    pub fn add_user(&self, tenant: Option<&TenantId>, doc: Document) {
        self.store.insert(&Namespace::users(tenant), doc);
    }
}

pub fn doc(value: Value) -> Document {
    value.as_object().cloned().expect("fixture must be a JSON object")
}

/// Role document granting `actions` on the whole of `db`
pub fn role_doc(role: &str, db: &str, subroles: &[(&str, &str)], actions: &[&str]) -> Document {
    let roles: Vec<Value> = subroles
        .iter()
        .map(|(r, d)| json!({"role": r, "db": d}))
        .collect();
    let privileges = if actions.is_empty() {
        json!([])
    } else {
        json!([{"resource": {"db": db, "collection": ""}, "actions": actions}])
    };
    doc(json!({
        "_id": format!("{}.{}", db, role),
        "role": role,
        "db": db,
        "roles": roles,
        "privileges": privileges,
    }))
}

/// User document with SCRAM credentials
pub fn user_doc(user: &str, db: &str, roles: &[(&str, &str)]) -> Document {
    let roles: Vec<Value> = roles
        .iter()
        .map(|(r, d)| json!({"role": r, "db": d}))
        .collect();
    doc(json!({
        "_id": format!("{}.{}", db, user),
        "user": user,
        "db": db,
        "credentials": {"SCRAM-SHA-256": {"iterationCount": 15000}},
        "roles": roles,
    }))
}

/// Names in an array of `{role, db}` documents, as `role@db`
pub fn role_names(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|roles| {
            roles
                .iter()
                .map(|r| format!("{}@{}", r["role"].as_str().unwrap_or(""), r["db"].as_str().unwrap_or("")))
                .collect()
        })
        .unwrap_or_default()
}
