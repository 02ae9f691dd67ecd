//! Builtin role catalog
//!
//! Builtin roles are compiled in rather than stored. They contribute
//! privileges but never subordinate roles, so resolving one never touches
//! the store.

use crate::privilege::{ActionType, Privilege, PrivilegeVector, ResourcePattern};
use crate::types::{RoleName, TenantId, ADMIN_DB};
use std::collections::BTreeSet;

/// Lookup interface for compiled-in roles
pub trait BuiltinRoleCatalog: Send + Sync {
    /// Whether `role` names a builtin role
    fn is_builtin_role(&self, role: &RoleName) -> bool;

    /// Merge the privileges of `role` into `privileges`
    ///
    /// Returns `false` when `role` is not builtin.
    fn add_privileges_for_builtin_role(&self, role: &RoleName, privileges: &mut PrivilegeVector) -> bool;

    /// Every builtin role valid on `db`
    fn builtin_role_names_for_db(&self, db: &str, tenant: Option<&TenantId>) -> BTreeSet<RoleName>;
}

/// Roles valid on every database
const DATABASE_ROLES: &[&str] = &["dbAdmin", "dbOwner", "read", "readWrite", "userAdmin"];

/// Roles valid only on the admin database
const ADMIN_ONLY_ROLES: &[&str] = &[
    "__system",
    "backup",
    "clusterAdmin",
    "clusterManager",
    "clusterMonitor",
    "dbAdminAnyDatabase",
    "hostManager",
    "readAnyDatabase",
    "readWriteAnyDatabase",
    "restore",
    "root",
    "userAdminAnyDatabase",
];

const READ_ACTIONS: &[ActionType] = &[
    ActionType::ChangeStream,
    ActionType::CollStats,
    ActionType::DbHash,
    ActionType::DbStats,
    ActionType::Find,
    ActionType::KillCursors,
    ActionType::ListCollections,
    ActionType::ListIndexes,
];

const WRITE_ACTIONS: &[ActionType] = &[
    ActionType::ConvertToCapped,
    ActionType::CreateCollection,
    ActionType::CreateIndex,
    ActionType::DropCollection,
    ActionType::DropIndex,
    ActionType::Insert,
    ActionType::Remove,
    ActionType::RenameCollectionSameDb,
    ActionType::Update,
];

const DB_ADMIN_ACTIONS: &[ActionType] = &[
    ActionType::BypassDocumentValidation,
    ActionType::CollMod,
    ActionType::CollStats,
    ActionType::Compact,
    ActionType::ConvertToCapped,
    ActionType::CreateCollection,
    ActionType::CreateIndex,
    ActionType::DbStats,
    ActionType::DropCollection,
    ActionType::DropDatabase,
    ActionType::DropIndex,
    ActionType::EnableProfiler,
    ActionType::ListCollections,
    ActionType::ListIndexes,
    ActionType::PlanCacheRead,
    ActionType::PlanCacheWrite,
    ActionType::ReIndex,
    ActionType::RenameCollectionSameDb,
    ActionType::Validate,
];

const USER_ADMIN_ACTIONS: &[ActionType] = &[
    ActionType::ChangeCustomData,
    ActionType::ChangePassword,
    ActionType::CreateRole,
    ActionType::CreateUser,
    ActionType::DropRole,
    ActionType::DropUser,
    ActionType::GrantRole,
    ActionType::RevokeRole,
    ActionType::SetAuthenticationRestriction,
    ActionType::ViewRole,
    ActionType::ViewUser,
];

const CLUSTER_MONITOR_ACTIONS: &[ActionType] = &[
    ActionType::Inprog,
    ActionType::ListDatabases,
    ActionType::ReplSetGetStatus,
    ActionType::ServerStatus,
    ActionType::Top,
];

const CLUSTER_MANAGER_ACTIONS: &[ActionType] = &[ActionType::ListDatabases, ActionType::ReplSetConfigure];

const HOST_MANAGER_ACTIONS: &[ActionType] = &[ActionType::Killop, ActionType::LogRotate, ActionType::Shutdown];

/// Static builtin role table
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticBuiltinRoles;

impl StaticBuiltinRoles {
    pub fn new() -> Self {
        Self
    }

    fn database(role: &RoleName) -> ResourcePattern {
        ResourcePattern::Database {
            tenant: role.tenant().cloned(),
            db: role.db().to_string(),
        }
    }

    fn any_normal(role: &RoleName) -> ResourcePattern {
        ResourcePattern::AnyNormalResource {
            tenant: role.tenant().cloned(),
        }
    }

    fn grant(privileges: &mut PrivilegeVector, resource: ResourcePattern, actions: &[ActionType]) {
        privileges.add(Privilege::new(resource, actions.iter().copied()));
    }

    fn add_for_name(name: &str, role: &RoleName, privileges: &mut PrivilegeVector) -> bool {
        match name {
            "read" => Self::grant(privileges, Self::database(role), READ_ACTIONS),
            "readWrite" => {
                Self::grant(privileges, Self::database(role), READ_ACTIONS);
                Self::grant(privileges, Self::database(role), WRITE_ACTIONS);
            }
            "dbAdmin" => Self::grant(privileges, Self::database(role), DB_ADMIN_ACTIONS),
            "userAdmin" => Self::grant(privileges, Self::database(role), USER_ADMIN_ACTIONS),
            "dbOwner" => {
                for part in ["readWrite", "dbAdmin", "userAdmin"] {
                    Self::add_for_name(part, role, privileges);
                }
            }
            "readAnyDatabase" => {
                Self::grant(privileges, Self::any_normal(role), READ_ACTIONS);
                Self::grant(privileges, ResourcePattern::Cluster, &[ActionType::ListDatabases]);
            }
            "readWriteAnyDatabase" => {
                Self::grant(privileges, Self::any_normal(role), READ_ACTIONS);
                Self::grant(privileges, Self::any_normal(role), WRITE_ACTIONS);
                Self::grant(privileges, ResourcePattern::Cluster, &[ActionType::ListDatabases]);
            }
            "dbAdminAnyDatabase" => {
                Self::grant(privileges, Self::any_normal(role), DB_ADMIN_ACTIONS);
                Self::grant(privileges, ResourcePattern::Cluster, &[ActionType::ListDatabases]);
            }
            "userAdminAnyDatabase" => {
                Self::grant(privileges, Self::any_normal(role), USER_ADMIN_ACTIONS);
                Self::grant(privileges, ResourcePattern::Cluster, &[ActionType::ListDatabases]);
            }
            "clusterMonitor" => Self::grant(privileges, ResourcePattern::Cluster, CLUSTER_MONITOR_ACTIONS),
            "clusterManager" => Self::grant(privileges, ResourcePattern::Cluster, CLUSTER_MANAGER_ACTIONS),
            "hostManager" => Self::grant(privileges, ResourcePattern::Cluster, HOST_MANAGER_ACTIONS),
            "clusterAdmin" => {
                for part in ["clusterMonitor", "clusterManager", "hostManager"] {
                    Self::add_for_name(part, role, privileges);
                }
                Self::grant(privileges, Self::any_normal(role), &[ActionType::DropDatabase]);
            }
            "backup" => {
                Self::grant(privileges, Self::any_normal(role), READ_ACTIONS);
                Self::grant(privileges, ResourcePattern::Cluster, &[ActionType::ListDatabases]);
            }
            "restore" => {
                Self::grant(privileges, Self::any_normal(role), WRITE_ACTIONS);
                Self::grant(privileges, Self::any_normal(role), &[ActionType::BypassDocumentValidation]);
            }
            "root" => {
                for part in [
                    "readWriteAnyDatabase",
                    "dbAdminAnyDatabase",
                    "userAdminAnyDatabase",
                    "clusterAdmin",
                    "backup",
                    "restore",
                ] {
                    Self::add_for_name(part, role, privileges);
                }
            }
            "__system" => Self::grant(privileges, ResourcePattern::AnyResource, &[ActionType::AnyAction]),
            _ => return false,
        }
        true
    }
}

impl BuiltinRoleCatalog for StaticBuiltinRoles {
    fn is_builtin_role(&self, role: &RoleName) -> bool {
        DATABASE_ROLES.contains(&role.role())
            || (role.db() == ADMIN_DB && ADMIN_ONLY_ROLES.contains(&role.role()))
    }

    fn add_privileges_for_builtin_role(&self, role: &RoleName, privileges: &mut PrivilegeVector) -> bool {
        if !self.is_builtin_role(role) {
            return false;
        }
        Self::add_for_name(role.role(), role, privileges)
    }

    fn builtin_role_names_for_db(&self, db: &str, tenant: Option<&TenantId>) -> BTreeSet<RoleName> {
        let admin_only: &[&str] = if db == ADMIN_DB { ADMIN_ONLY_ROLES } else { &[] };
        DATABASE_ROLES
            .iter()
            .chain(admin_only)
            .map(|name| RoleName::new(*name, db).with_tenant(tenant.cloned()))
            .collect()
    }
}
