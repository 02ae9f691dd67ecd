//! Breadth-first role closure over the store

use super::document::parse_role_document;
use super::options::ResolveRoleOption;
use crate::builtin::BuiltinRoleCatalog;
use crate::error::{AuthzError, Result};
use crate::privilege::PrivilegeVector;
use crate::restriction::RestrictionDocuments;
use crate::store::AuthzStore;
use crate::types::{Namespace, RoleName};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Result of a role resolution
///
/// Each facet is `Some` exactly when it was requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRoleData {
    pub roles: Option<BTreeSet<RoleName>>,
    pub privileges: Option<PrivilegeVector>,
    pub restrictions: Option<RestrictionDocuments>,
}

/// Walks role documents reachable from a starting set
///
/// The resolver takes no locks; callers hold a roles read snapshot for the
/// duration of [`RoleResolver::resolve_roles`].
pub struct RoleResolver<'a> {
    store: &'a dyn AuthzStore,
    builtins: &'a dyn BuiltinRoleCatalog,
}

impl<'a> RoleResolver<'a> {
    pub fn new(store: &'a dyn AuthzStore, builtins: &'a dyn BuiltinRoleCatalog) -> Self {
        Self { store, builtins }
    }

    /// Compute the closure of `starting` under role inheritance
    ///
    /// Roles missing from the store are skipped with a warning. A malformed
    /// document aborts the whole resolution.
    pub fn resolve_roles(
        &self,
        starting: impl IntoIterator<Item = RoleName>,
        option: ResolveRoleOption,
    ) -> Result<ResolvedRoleData> {
        let mut roles = BTreeSet::new();
        let mut privileges = PrivilegeVector::new();
        let mut restrictions = RestrictionDocuments::new();

        let walk_indirect = option.walks_indirect();
        // Subordinates are needed either for the result or to keep walking.
        let mut facets = option & (ResolveRoleOption::PRIVILEGES | ResolveRoleOption::RESTRICTIONS);
        if option.wants_roles() || walk_indirect {
            facets |= ResolveRoleOption::ROLES;
        }

        let mut frontier: BTreeSet<RoleName> = starting.into_iter().collect();
        let mut visited: BTreeSet<RoleName> = BTreeSet::new();
        let mut fetches = 0usize;

        while !frontier.is_empty() {
            let mut next_frontier = BTreeSet::new();

            for role in frontier {
                visited.insert(role.clone());

                if self.builtins.is_builtin_role(&role) {
                    if option.wants_privileges()
                        && !self.builtins.add_privileges_for_builtin_role(&role, &mut privileges)
                    {
                        return Err(AuthzError::OperationFailed(format!(
                            "Failed to add privileges for builtin role {}",
                            role
                        )));
                    }
                    continue;
                }

                fetches += 1;
                let ns = Namespace::roles(role.tenant());
                let Some(doc) = self.store.find_one(&ns, &role.to_document())? else {
                    warn!(%role, "Role does not exist, skipping");
                    continue;
                };

                let parsed = parse_role_document(&role, &doc, facets)?;

                for subrole in parsed.roles {
                    if visited.contains(&subrole) || next_frontier.contains(&subrole) {
                        continue;
                    }
                    if option.wants_roles() {
                        roles.insert(subrole.clone());
                    }
                    if walk_indirect {
                        next_frontier.insert(subrole);
                    }
                }

                if option.wants_privileges() {
                    privileges.merge(parsed.privileges);
                }
                if let Some(document) = parsed.restrictions {
                    restrictions.push(document);
                }
            }

            frontier = next_frontier;
        }

        debug!(
            visited = visited.len(),
            fetches,
            ?option,
            "Resolved role closure"
        );

        Ok(ResolvedRoleData {
            roles: option.wants_roles().then_some(roles),
            privileges: option.wants_privileges().then_some(privileges),
            restrictions: option.wants_restrictions().then_some(restrictions),
        })
    }
}
