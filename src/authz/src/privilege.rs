//! Privileges: resource patterns paired with action sets

use crate::error::{AuthzError, Result};
use crate::types::TenantId;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

macro_rules! action_types {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Database action that a privilege may grant
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum ActionType {
            $($variant),+
        }

        impl ActionType {
            /// Canonical action name as stored in privilege documents
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl FromStr for ActionType {
            type Err = AuthzError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(AuthzError::BadValue(format!("Unrecognized action: {}", other))),
                }
            }
        }
    };
}

action_types! {
    AnyAction => "anyAction",
    BypassDocumentValidation => "bypassDocumentValidation",
    ChangeCustomData => "changeCustomData",
    ChangePassword => "changePassword",
    ChangeStream => "changeStream",
    CollMod => "collMod",
    CollStats => "collStats",
    Compact => "compact",
    ConvertToCapped => "convertToCapped",
    CreateCollection => "createCollection",
    CreateIndex => "createIndex",
    CreateRole => "createRole",
    CreateUser => "createUser",
    DbHash => "dbHash",
    DbStats => "dbStats",
    DropCollection => "dropCollection",
    DropDatabase => "dropDatabase",
    DropIndex => "dropIndex",
    DropRole => "dropRole",
    DropUser => "dropUser",
    EnableProfiler => "enableProfiler",
    Find => "find",
    GrantRole => "grantRole",
    Inprog => "inprog",
    Insert => "insert",
    KillCursors => "killCursors",
    Killop => "killop",
    ListCollections => "listCollections",
    ListDatabases => "listDatabases",
    ListIndexes => "listIndexes",
    LogRotate => "logRotate",
    PlanCacheRead => "planCacheRead",
    PlanCacheWrite => "planCacheWrite",
    ReIndex => "reIndex",
    Remove => "remove",
    RenameCollectionSameDb => "renameCollectionSameDB",
    ReplSetGetStatus => "replSetGetStatus",
    ReplSetConfigure => "replSetConfigure",
    RevokeRole => "revokeRole",
    ServerStatus => "serverStatus",
    SetAuthenticationRestriction => "setAuthenticationRestriction",
    Shutdown => "shutdown",
    Top => "top",
    Update => "update",
    Validate => "validate",
    ViewRole => "viewRole",
    ViewUser => "viewUser",
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of actions
pub type ActionSet = BTreeSet<ActionType>;

/// What a privilege applies to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourcePattern {
    /// Every resource, including system ones
    AnyResource,
    /// Cluster-wide operations
    Cluster,
    /// Every non-system collection in every database
    AnyNormalResource { tenant: Option<TenantId> },
    /// Every non-system collection in one database
    Database { tenant: Option<TenantId>, db: String },
    /// A collection of this name in every database
    Collection { tenant: Option<TenantId>, collection: String },
    /// One exact namespace
    ExactNamespace {
        tenant: Option<TenantId>,
        db: String,
        collection: String,
    },
}

impl ResourcePattern {
    /// Parse a `resource` sub-document, assigning `tenant` to database-scoped patterns
    pub fn parse(value: &Value, tenant: Option<&TenantId>) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            AuthzError::UnsupportedFormat(format!("Privilege resource must be a document, got {}", value))
        })?;

        if let Some(cluster) = obj.get("cluster") {
            return match (cluster.as_bool(), obj.len()) {
                (Some(true), 1) => Ok(Self::Cluster),
                _ => Err(AuthzError::UnsupportedFormat(format!(
                    "Invalid cluster resource: {}",
                    value
                ))),
            };
        }

        if let Some(any) = obj.get("anyResource") {
            return match (any.as_bool(), obj.len()) {
                (Some(true), 1) => Ok(Self::AnyResource),
                _ => Err(AuthzError::UnsupportedFormat(format!(
                    "Invalid anyResource resource: {}",
                    value
                ))),
            };
        }

        let db = obj.get("db").and_then(Value::as_str);
        let collection = obj.get("collection").and_then(Value::as_str);
        let (Some(db), Some(collection)) = (db, collection) else {
            return Err(AuthzError::UnsupportedFormat(format!(
                "Resource must have string 'db' and 'collection' fields: {}",
                value
            )));
        };
        if obj.len() != 2 {
            return Err(AuthzError::UnsupportedFormat(format!(
                "Unexpected fields in resource: {}",
                value
            )));
        }

        let tenant = tenant.cloned();
        Ok(match (db.is_empty(), collection.is_empty()) {
            (true, true) => Self::AnyNormalResource { tenant },
            (false, true) => Self::Database {
                tenant,
                db: db.to_string(),
            },
            (true, false) => Self::Collection {
                tenant,
                collection: collection.to_string(),
            },
            (false, false) => Self::ExactNamespace {
                tenant,
                db: db.to_string(),
                collection: collection.to_string(),
            },
        })
    }

    /// Serialized `resource` sub-document
    pub fn to_value(&self) -> Value {
        match self {
            Self::AnyResource => json!({"anyResource": true}),
            Self::Cluster => json!({"cluster": true}),
            Self::AnyNormalResource { .. } => json!({"db": "", "collection": ""}),
            Self::Database { db, .. } => json!({"db": db, "collection": ""}),
            Self::Collection { collection, .. } => json!({"db": "", "collection": collection}),
            Self::ExactNamespace { db, collection, .. } => {
                json!({"db": db, "collection": collection})
            }
        }
    }

    fn tenant(&self) -> Option<&TenantId> {
        match self {
            Self::AnyResource | Self::Cluster => None,
            Self::AnyNormalResource { tenant }
            | Self::Database { tenant, .. }
            | Self::Collection { tenant, .. }
            | Self::ExactNamespace { tenant, .. } => tenant.as_ref(),
        }
    }

    /// Whether this pattern covers the given exact namespace
    pub fn matches_namespace(&self, tenant: Option<&TenantId>, db: &str, collection: &str) -> bool {
        let is_system = collection.starts_with("system.");
        match self {
            Self::AnyResource => true,
            Self::Cluster => false,
            _ if self.tenant() != tenant => false,
            Self::AnyNormalResource { .. } => !is_system,
            Self::Database { db: pattern_db, .. } => pattern_db == db && !is_system,
            Self::Collection {
                collection: pattern_coll,
                ..
            } => pattern_coll == collection,
            Self::ExactNamespace {
                db: pattern_db,
                collection: pattern_coll,
                ..
            } => pattern_db == db && pattern_coll == collection,
        }
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnyResource => write!(f, "<all resources>"),
            Self::Cluster => write!(f, "<cluster>"),
            Self::AnyNormalResource { .. } => write!(f, "<all normal resources>"),
            Self::Database { db, .. } => write!(f, "{}.*", db),
            Self::Collection { collection, .. } => write!(f, "*.{}", collection),
            Self::ExactNamespace { db, collection, .. } => write!(f, "{}.{}", db, collection),
        }
    }
}

/// A resource pattern and the actions granted on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Privilege {
    resource: ResourcePattern,
    actions: ActionSet,
}

impl Privilege {
    pub fn new(resource: ResourcePattern, actions: impl IntoIterator<Item = ActionType>) -> Self {
        Self {
            resource,
            actions: actions.into_iter().collect(),
        }
    }

    pub fn resource(&self) -> &ResourcePattern {
        &self.resource
    }

    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    pub fn includes(&self, action: ActionType) -> bool {
        self.actions.contains(&ActionType::AnyAction) || self.actions.contains(&action)
    }

    /// Parse a stored privilege document, resolving resources into `tenant`
    ///
    /// Unrecognized action names are collected into `unrecognized` and left
    /// out of the resulting action set.
    pub fn parse(value: &Value, tenant: Option<&TenantId>, unrecognized: &mut Vec<String>) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            AuthzError::UnsupportedFormat(format!("Expected privilege document as object, got {}", value))
        })?;

        let resource = obj
            .get("resource")
            .ok_or_else(|| AuthzError::UnsupportedFormat("Privilege is missing 'resource'".to_string()))?;
        let resource = ResourcePattern::parse(resource, tenant)?;

        let actions = obj.get("actions").and_then(Value::as_array).ok_or_else(|| {
            AuthzError::UnsupportedFormat(format!("Privilege 'actions' must be an array: {}", value))
        })?;

        let mut set = ActionSet::new();
        for action in actions {
            let name = action.as_str().ok_or_else(|| {
                AuthzError::UnsupportedFormat(format!("Action names must be strings, got {}", action))
            })?;
            match name.parse::<ActionType>() {
                Ok(action) => {
                    set.insert(action);
                }
                Err(_) => unrecognized.push(name.to_string()),
            }
        }

        Ok(Self { resource, actions: set })
    }

    /// Serialized privilege document
    pub fn to_value(&self) -> Value {
        let actions: Vec<&str> = self.actions.iter().map(ActionType::as_str).collect();
        json!({
            "resource": self.resource.to_value(),
            "actions": actions,
        })
    }
}

/// Privileges with at most one entry per resource pattern
///
/// Adding a privilege for a pattern already present unions the action sets
/// in place, so privileges reached along several inheritance paths appear
/// once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivilegeVector {
    privileges: Vec<Privilege>,
}

impl PrivilegeVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one privilege in
    pub fn add(&mut self, privilege: Privilege) {
        match self
            .privileges
            .iter_mut()
            .find(|existing| existing.resource == privilege.resource)
        {
            Some(existing) => existing.actions.extend(privilege.actions),
            None => self.privileges.push(privilege),
        }
    }

    /// Merge every privilege from `other`
    pub fn merge(&mut self, other: PrivilegeVector) {
        for privilege in other.privileges {
            self.add(privilege);
        }
    }

    pub fn len(&self) -> usize {
        self.privileges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.privileges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Privilege> {
        self.privileges.iter()
    }

    /// Privilege registered for exactly this pattern
    pub fn get(&self, resource: &ResourcePattern) -> Option<&Privilege> {
        self.privileges.iter().find(|p| &p.resource == resource)
    }

    /// Whether some privilege covers `action` on the exact namespace
    pub fn is_authorized(&self, tenant: Option<&TenantId>, db: &str, collection: &str, action: ActionType) -> bool {
        self.privileges
            .iter()
            .any(|p| p.resource.matches_namespace(tenant, db, collection) && p.includes(action))
    }

    /// Whether some privilege grants `action` on the cluster resource
    pub fn is_authorized_for_cluster(&self, action: ActionType) -> bool {
        self.privileges.iter().any(|p| {
            matches!(p.resource, ResourcePattern::Cluster | ResourcePattern::AnyResource) && p.includes(action)
        })
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.privileges.iter().map(Privilege::to_value).collect())
    }
}

impl FromIterator<Privilege> for PrivilegeVector {
    fn from_iter<I: IntoIterator<Item = Privilege>>(iter: I) -> Self {
        let mut vector = Self::new();
        for privilege in iter {
            vector.add(privilege);
        }
        vector
    }
}

impl<'a> IntoIterator for &'a PrivilegeVector {
    type Item = &'a Privilege;
    type IntoIter = std::slice::Iter<'a, Privilege>;

    fn into_iter(self) -> Self::IntoIter {
        self.privileges.iter()
    }
}
