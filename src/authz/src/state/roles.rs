//! Role descriptions

use super::AuthzState;
use crate::error::{AuthzError, Result};
use crate::privilege::PrivilegeVector;
use crate::restriction::RestrictionDocuments;
use crate::role_graph::{parse_role_document, ResolveRoleOption};
use crate::types::{Document, Namespace, RoleName, TenantId};
use crate::user::role_array;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use tracing::debug;

/// How privileges appear in a role description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrivilegeFormat {
    #[default]
    Omit,
    /// `privileges` and `inheritedPrivileges` on each role
    ShowSeparate,
    /// One combined document shaped like a user's role fields
    ShowAsUserFragment,
}

/// Whether restrictions appear in a role description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestrictionsFormat {
    #[default]
    Omit,
    Show,
}

impl PrivilegeFormat {
    fn shows_privileges(self) -> bool {
        self != Self::Omit
    }
}

fn describe_option(privileges: PrivilegeFormat, restrictions: RestrictionsFormat) -> ResolveRoleOption {
    let mut option = ResolveRoleOption::ROLES;
    if privileges.shows_privileges() {
        option |= ResolveRoleOption::PRIVILEGES;
    }
    if restrictions == RestrictionsFormat::Show {
        option |= ResolveRoleOption::RESTRICTIONS;
    }
    option
}

/// Copy `doc`, dropping facets not selected by `option`
///
/// With `lift_restrictions` a stored `authenticationRestrictions` array is
/// wrapped into a one-element array of restriction documents. When
/// restrictions are selected an absent field reads as `[]`.
pub(super) fn filter_document(doc: &Document, option: ResolveRoleOption, lift_restrictions: bool) -> Document {
    let mut out = Document::new();
    for (key, value) in doc {
        match key.as_str() {
            "privileges" if !option.wants_privileges() => {}
            "authenticationRestrictions" if !option.wants_restrictions() => {}
            "authenticationRestrictions" if lift_restrictions => {
                out.insert(key.clone(), Value::Array(vec![value.clone()]));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    if option.wants_restrictions() && !out.contains_key("authenticationRestrictions") {
        out.insert("authenticationRestrictions".to_string(), json!([]));
    }
    out
}

impl AuthzState {
    /// Combined `{roles, inheritedRoles, inheritedPrivileges}` view of `roles`
    pub fn get_roles_as_user_fragment(
        &self,
        roles: &[RoleName],
        restrictions: RestrictionsFormat,
    ) -> Result<Document> {
        let _guards = self.snapshot(roles.iter().map(RoleName::tenant));
        self.roles_as_user_fragment(roles, restrictions)
    }

    /// Describe each role in `roles`
    ///
    /// Missing roles are left out. A malformed role document fails the
    /// whole call.
    pub fn get_roles_description(
        &self,
        roles: &[RoleName],
        privileges: PrivilegeFormat,
        restrictions: RestrictionsFormat,
    ) -> Result<Vec<Document>> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let _guards = self.snapshot(roles.iter().map(RoleName::tenant));
        if privileges == PrivilegeFormat::ShowAsUserFragment {
            return Ok(vec![self.roles_as_user_fragment(roles, restrictions)?]);
        }

        let option = describe_option(privileges, restrictions);
        let mut descriptions = Vec::with_capacity(roles.len());
        for role in roles {
            if self.builtins.is_builtin_role(role) {
                descriptions.push(self.builtin_role_description(role, option)?);
                continue;
            }

            let ns = Namespace::roles(role.tenant());
            let Some(doc) = self.store.find_one(&ns, &role.to_document())? else {
                debug!(%role, "Skipping description of missing role");
                continue;
            };
            descriptions.push(self.stored_role_description(role, &doc, option)?);
        }
        Ok(descriptions)
    }

    /// Describe every role defined on `db`
    ///
    /// # Errors
    ///
    /// `IllegalOperation` for [`PrivilegeFormat::ShowAsUserFragment`], before
    /// any read.
    pub fn get_role_descriptions_for_db(
        &self,
        db: &str,
        tenant: Option<&TenantId>,
        privileges: PrivilegeFormat,
        restrictions: RestrictionsFormat,
        show_builtin_roles: bool,
    ) -> Result<Vec<Document>> {
        if privileges == PrivilegeFormat::ShowAsUserFragment {
            return Err(AuthzError::IllegalOperation(
                "Cannot get user fragment for all roles in a database".to_string(),
            ));
        }

        let _guard = self.locks.acquire_read_snapshot(tenant);
        let option = describe_option(privileges, restrictions);
        let mut descriptions = Vec::new();

        if show_builtin_roles {
            for role in self.builtins.builtin_role_names_for_db(db, tenant) {
                descriptions.push(self.builtin_role_description(&role, option)?);
            }
        }

        let mut filter = Document::new();
        filter.insert("db".to_string(), json!(db));
        self.store
            .query(&Namespace::roles(tenant), &filter, None, &mut |doc| {
                let role = RoleName::parse_from_document(&Value::Object(doc.clone()), tenant)?;
                descriptions.push(self.stored_role_description(&role, doc, option)?);
                Ok(())
            })?;

        Ok(descriptions)
    }

    pub(super) fn roles_as_user_fragment(
        &self,
        roles: &[RoleName],
        restrictions: RestrictionsFormat,
    ) -> Result<Document> {
        let option = describe_option(PrivilegeFormat::ShowAsUserFragment, restrictions);
        let resolved = self.resolver().resolve_roles(roles.iter().cloned(), option)?;

        let mut inherited = resolved.roles.unwrap_or_default();
        inherited.extend(roles.iter().cloned());

        let mut fragment = Document::new();
        fragment.insert("roles".to_string(), role_array(roles));
        fragment.insert("inheritedRoles".to_string(), role_array(&inherited));
        fragment.insert(
            "inheritedPrivileges".to_string(),
            resolved.privileges.unwrap_or_default().to_value(),
        );
        if let Some(restrictions) = resolved.restrictions {
            fragment.insert(
                "inheritedAuthenticationRestrictions".to_string(),
                restrictions.to_value(),
            );
        }
        Ok(fragment)
    }

    fn builtin_role_description(&self, role: &RoleName, option: ResolveRoleOption) -> Result<Document> {
        let mut doc = Document::new();
        doc.insert("_id".to_string(), json!(role.unambiguous_name()));
        doc.insert("role".to_string(), json!(role.role()));
        doc.insert("db".to_string(), json!(role.db()));
        doc.insert("roles".to_string(), json!([]));
        doc.insert("inheritedRoles".to_string(), json!([]));
        doc.insert("isBuiltin".to_string(), json!(true));

        if option.wants_privileges() {
            let mut privileges = PrivilegeVector::new();
            if !self.builtins.add_privileges_for_builtin_role(role, &mut privileges) {
                return Err(AuthzError::OperationFailed(format!(
                    "Failed to generate privileges for builtin role {}",
                    role
                )));
            }
            doc.insert("privileges".to_string(), privileges.to_value());
            doc.insert("inheritedPrivileges".to_string(), privileges.to_value());
        }
        if option.wants_restrictions() {
            doc.insert("authenticationRestrictions".to_string(), json!([]));
            doc.insert("inheritedAuthenticationRestrictions".to_string(), json!([]));
        }
        Ok(doc)
    }

    fn stored_role_description(
        &self,
        role: &RoleName,
        doc: &Document,
        option: ResolveRoleOption,
    ) -> Result<Document> {
        let own = parse_role_document(role, doc, option)?;
        let mut description = filter_document(doc, option, true);

        let resolved = self.resolver().resolve_roles(own.roles.iter().cloned(), option)?;

        let mut inherited: BTreeSet<RoleName> = resolved.roles.unwrap_or_default();
        inherited.extend(own.roles);
        description.insert("inheritedRoles".to_string(), role_array(&inherited));

        if option.wants_privileges() {
            let mut privileges = own.privileges;
            privileges.merge(resolved.privileges.unwrap_or_default());
            description.insert("inheritedPrivileges".to_string(), privileges.to_value());
        }

        if option.wants_restrictions() {
            let mut restrictions = RestrictionDocuments::new();
            if let Some(document) = own.restrictions {
                restrictions.push(document);
            }
            restrictions.extend(resolved.restrictions.unwrap_or_default());
            description.insert(
                "inheritedAuthenticationRestrictions".to_string(),
                restrictions.to_value(),
            );
        }

        description.insert("isBuiltin".to_string(), json!(false));
        Ok(description)
    }
}
