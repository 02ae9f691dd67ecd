//! Authorization state
//!
//! [`AuthzState`] is the public face of this crate. It owns no documents:
//! every read goes through the injected [`AuthzStore`], every cache change
//! goes out through the injected [`UserCacheInvalidator`].
//!
//! Each public entry point takes one roles read snapshot for its whole
//! duration and then calls only unlocked internals. Nothing below the entry
//! points acquires a guard, so a snapshot is never taken twice on the same
//! thread.

mod oplog;
mod roles;
mod users;

pub use roles::{PrivilegeFormat, RestrictionsFormat};

use crate::builtin::{BuiltinRoleCatalog, StaticBuiltinRoles};
use crate::cache::UserCacheInvalidator;
use crate::config::AuthzConfig;
use crate::error::{AuthzError, Result};
use crate::role_graph::{ResolveRoleOption, ResolvedRoleData, RoleResolver};
use crate::store::{AuthzStore, RolesLocks, RolesReadGuard};
use crate::types::{Document, Namespace, RoleName, TenantId};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// `_id` of the schema-version document
const AUTH_SCHEMA_DOCUMENT_ID: &str = "authSchema";

/// Field holding the schema version
const AUTH_SCHEMA_VERSION_FIELD: &str = "currentVersion";

/// Shared "some user or role document exists" flag
///
/// Only ever moves from `false` to `true`. Readers may see a stale `false`.
#[derive(Debug, Clone, Default)]
pub struct PrivilegeDocumentsFlag(Arc<AtomicBool>);

impl PrivilegeDocumentsFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Role resolution and user acquisition over a document store
pub struct AuthzState {
    config: AuthzConfig,
    store: Arc<dyn AuthzStore>,
    builtins: Arc<dyn BuiltinRoleCatalog>,
    invalidator: Arc<dyn UserCacheInvalidator>,
    locks: RolesLocks,
    privilege_documents: PrivilegeDocumentsFlag,
}

impl AuthzState {
    /// Create a state backed by `store`, reporting invalidations to `invalidator`
    pub fn new(
        config: AuthzConfig,
        store: Arc<dyn AuthzStore>,
        invalidator: Arc<dyn UserCacheInvalidator>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            lock_free_reads = config.lock_free_reads,
            default_auth_schema_version = config.default_auth_schema_version,
            "Initializing authorization state"
        );

        Ok(Self {
            locks: RolesLocks::new(config.lock_free_reads),
            config,
            store,
            builtins: Arc::new(StaticBuiltinRoles::new()),
            invalidator,
            privilege_documents: PrivilegeDocumentsFlag::new(),
        })
    }

    /// Replace the builtin role catalog
    pub fn with_builtin_catalog(mut self, builtins: Arc<dyn BuiltinRoleCatalog>) -> Self {
        self.builtins = builtins;
        self
    }

    /// Share a privilege-documents flag with other components
    pub fn with_privilege_flag(mut self, flag: PrivilegeDocumentsFlag) -> Self {
        self.privilege_documents = flag;
        self
    }

    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    /// Lock table; writers take `acquire_write` around role and user mutations
    pub fn locks(&self) -> &RolesLocks {
        &self.locks
    }

    pub fn privilege_flag(&self) -> &PrivilegeDocumentsFlag {
        &self.privilege_documents
    }

    fn resolver(&self) -> RoleResolver<'_> {
        RoleResolver::new(self.store.as_ref(), self.builtins.as_ref())
    }

    /// Read snapshots over every tenant in `tenants`, taken in tenant order
    fn snapshot<'t>(&self, tenants: impl IntoIterator<Item = Option<&'t TenantId>>) -> Vec<RolesReadGuard> {
        let tenants: BTreeSet<Option<&TenantId>> = tenants.into_iter().collect();
        tenants
            .into_iter()
            .map(|tenant| self.locks.acquire_read_snapshot(tenant))
            .collect()
    }

    /// Compute the closure of `roles` under inheritance
    pub fn resolve_roles(&self, roles: &[RoleName], option: ResolveRoleOption) -> Result<ResolvedRoleData> {
        let _guards = self.snapshot(roles.iter().map(RoleName::tenant));
        self.resolver().resolve_roles(roles.iter().cloned(), option)
    }

    /// Whether every role in `roles` is builtin or stored
    pub fn roles_exist(&self, roles: &[RoleName]) -> Result<bool> {
        let _guards = self.snapshot(roles.iter().map(RoleName::tenant));
        for role in roles {
            if self.builtins.is_builtin_role(role) {
                continue;
            }
            if !self.store.has_one(&Namespace::roles(role.tenant()), &role.to_document())? {
                debug!(%role, "Role does not exist");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether any user or role document exists
    ///
    /// A positive answer is remembered; a negative one is re-checked on the
    /// next call.
    pub fn has_any_privilege_documents(&self) -> Result<bool> {
        if self.privilege_documents.is_set() {
            return Ok(true);
        }

        let _guard = self.locks.acquire_read_snapshot(None);
        let any = Document::new();
        let found = self.store.has_one(&Namespace::users(None), &any)?
            || self.store.has_one(&Namespace::roles(None), &any)?;
        if found {
            self.privilege_documents.set();
        }
        Ok(found)
    }

    /// Schema version recorded in the server configuration collection
    pub fn get_stored_authorization_version(&self) -> Result<i32> {
        let _guard = self.locks.acquire_read_snapshot(None);
        let mut filter = Document::new();
        filter.insert("_id".to_string(), json!(AUTH_SCHEMA_DOCUMENT_ID));

        let Some(doc) = self.store.find_one(&Namespace::server_configuration(), &filter)? else {
            return Ok(self.config.default_auth_schema_version);
        };

        match doc.get(AUTH_SCHEMA_VERSION_FIELD) {
            None => Err(AuthzError::NoSuchKey(format!(
                "No {} field in authorization schema document",
                AUTH_SCHEMA_VERSION_FIELD
            ))),
            Some(Value::Number(number)) => number
                .as_i64()
                .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .and_then(|version| i32::try_from(version).ok())
                .ok_or_else(|| {
                    AuthzError::TypeMismatch(format!(
                        "{} must be a 32-bit integer, got {}",
                        AUTH_SCHEMA_VERSION_FIELD, number
                    ))
                }),
            Some(other) => Err(AuthzError::TypeMismatch(format!(
                "Could not determine schema version of authorization data. {} is {}",
                AUTH_SCHEMA_VERSION_FIELD, other
            ))),
        }
    }
}
