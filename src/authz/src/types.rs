//! Core identity types: tenants, role and user names, namespaces

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Stored document representation exchanged with the store
pub type Document = Map<String, Value>;

/// Database holding the authorization collections
pub const ADMIN_DB: &str = "admin";

/// Collection of user documents
pub const USERS_COLLECTION: &str = "system.users";

/// Collection of role documents
pub const ROLES_COLLECTION: &str = "system.roles";

/// Collection holding the schema-version document
pub const VERSION_COLLECTION: &str = "system.version";

/// Pseudo-collection for commands
pub const COMMAND_COLLECTION: &str = "$cmd";

/// Isolation boundary for role and user namespaces
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role identifier: `(role, db, tenant)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoleName {
    role: String,
    db: String,
    tenant: Option<TenantId>,
}

impl RoleName {
    pub fn new(role: impl Into<String>, db: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            db: db.into(),
            tenant: None,
        }
    }

    /// Same name, scoped to the given tenant
    pub fn with_tenant(mut self, tenant: Option<TenantId>) -> Self {
        self.tenant = tenant;
        self
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn tenant(&self) -> Option<&TenantId> {
        self.tenant.as_ref()
    }

    /// `db.role`, the form used as a role document `_id`
    pub fn unambiguous_name(&self) -> String {
        format!("{}.{}", self.db, self.role)
    }

    /// Parse `{role: <string>, db: <string>}`, assigning `tenant`
    pub fn parse_from_document(value: &Value, tenant: Option<&TenantId>) -> Result<Self> {
        let (role, db) = parse_name_pair(value, "role")?;
        Ok(Self::new(role, db).with_tenant(tenant.cloned()))
    }

    /// Store lookup filter and serialized form, tenant omitted
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("role".to_string(), json!(self.role));
        doc.insert("db".to_string(), json!(self.db));
        doc
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.role, self.db)
    }
}

/// User identifier: `(user, db, tenant)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserName {
    user: String,
    db: String,
    tenant: Option<TenantId>,
}

impl UserName {
    pub fn new(user: impl Into<String>, db: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            db: db.into(),
            tenant: None,
        }
    }

    pub fn with_tenant(mut self, tenant: Option<TenantId>) -> Self {
        self.tenant = tenant;
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn tenant(&self) -> Option<&TenantId> {
        self.tenant.as_ref()
    }

    /// `db.user`, the form used as a user document `_id`
    pub fn unambiguous_name(&self) -> String {
        format!("{}.{}", self.db, self.user)
    }

    /// Parse a user document `_id` of the form `<db>.<user>`
    ///
    /// The database part ends at the first `.`; the user part may itself
    /// contain dots.
    pub fn parse_from_id(id: &str, tenant: Option<&TenantId>) -> Result<Self> {
        match id.split_once('.') {
            Some((db, user)) => Ok(Self::new(user, db).with_tenant(tenant.cloned())),
            None => Err(AuthzError::BadValue(format!(
                "_id entries for user documents must be of the form <dbname>.<username>. Found: {}",
                id
            ))),
        }
    }

    /// Parse `{user: <string>, db: <string>}`, assigning `tenant`
    pub fn parse_from_document(value: &Value, tenant: Option<&TenantId>) -> Result<Self> {
        let (user, db) = parse_name_pair(value, "user")?;
        Ok(Self::new(user, db).with_tenant(tenant.cloned()))
    }

    /// Store lookup filter and serialized form, tenant omitted
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("user".to_string(), json!(self.user));
        doc.insert("db".to_string(), json!(self.db));
        doc
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.db)
    }
}

fn parse_name_pair(value: &Value, name_field: &str) -> Result<(String, String)> {
    let obj = value.as_object().ok_or_else(|| {
        AuthzError::BadValue(format!(
            "{} name must be a document with '{}' and 'db' fields, got {}",
            name_field, name_field, value
        ))
    })?;

    let name = obj.get(name_field).and_then(Value::as_str).ok_or_else(|| {
        AuthzError::BadValue(format!("Missing or non-string '{}' field in {}", name_field, value))
    })?;

    let db = obj.get("db").and_then(Value::as_str).ok_or_else(|| {
        AuthzError::BadValue(format!("Missing or non-string 'db' field in {}", value))
    })?;

    if name.is_empty() || db.is_empty() {
        return Err(AuthzError::BadValue(format!(
            "{} name and database must be non-empty in {}",
            name_field, value
        )));
    }

    Ok((name.to_string(), db.to_string()))
}

/// Collection address, optionally tenant-scoped
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub tenant: Option<TenantId>,
    pub db: String,
    pub coll: String,
}

impl Namespace {
    pub fn new(tenant: Option<TenantId>, db: impl Into<String>, coll: impl Into<String>) -> Self {
        Self {
            tenant,
            db: db.into(),
            coll: coll.into(),
        }
    }

    /// Per-tenant user collection
    pub fn users(tenant: Option<&TenantId>) -> Self {
        Self::new(tenant.cloned(), ADMIN_DB, USERS_COLLECTION)
    }

    /// Per-tenant role collection
    pub fn roles(tenant: Option<&TenantId>) -> Self {
        Self::new(tenant.cloned(), ADMIN_DB, ROLES_COLLECTION)
    }

    /// Server configuration collection holding the schema-version document
    pub fn server_configuration() -> Self {
        Self::new(None, ADMIN_DB, VERSION_COLLECTION)
    }

    /// Admin command namespace
    pub fn admin_command(tenant: Option<&TenantId>) -> Self {
        Self::new(tenant.cloned(), ADMIN_DB, COMMAND_COLLECTION)
    }

    pub fn is_users(&self) -> bool {
        self.db == ADMIN_DB && self.coll == USERS_COLLECTION
    }

    pub fn is_roles(&self) -> bool {
        self.db == ADMIN_DB && self.coll == ROLES_COLLECTION
    }

    pub fn is_version(&self) -> bool {
        self.db == ADMIN_DB && self.coll == VERSION_COLLECTION
    }

    pub fn is_admin_command(&self) -> bool {
        self.db == ADMIN_DB && self.coll == COMMAND_COLLECTION
    }

    /// Whether writes here can change authorization data
    pub fn is_authz_namespace(&self) -> bool {
        self.is_users() || self.is_roles() || self.is_version()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tenant {
            Some(tenant) => write!(f, "{}_{}.{}", tenant, self.db, self.coll),
            None => write!(f, "{}.{}", self.db, self.coll),
        }
    }
}
