//! User acquisition

use super::roles::filter_document;
use super::AuthzState;
use crate::error::{AuthzError, Result};
use crate::restriction::RestrictionDocuments;
use crate::role_graph::{ResolveRoleOption, ResolvedRoleData};
use crate::types::{Document, Namespace, RoleName, UserName};
use crate::user::{role_array, CredentialData, User, UserRequest};
use serde_json::json;
use std::collections::BTreeSet;
use tracing::debug;

impl AuthzState {
    /// Materialize the user named by `request` with its full role closure
    ///
    /// # Errors
    ///
    /// - `BadValue` if a tenant-scoped name comes with supplied roles
    /// - `UserNotFound` if no user document exists
    /// - any malformed-document error from the user or its roles
    pub fn get_user_object(&self, request: &UserRequest) -> Result<User> {
        check_request(request)?;
        let _guard = self.locks.acquire_read_snapshot(request.name.tenant());

        let mut user = match &request.roles {
            Some(roles) => {
                let mut user = User::new(request.name.clone());
                user.set_credentials(CredentialData::external());
                user.set_roles(roles.iter().cloned());
                user
            }
            None => {
                let doc = self.find_user_document(&request.name)?;
                User::from_document(request.name.clone(), &doc)?
            }
        };

        let direct = direct_roles_for(&request.name, user.roles().iter().cloned());
        user.set_roles(direct.iter().cloned());

        let resolved = self.resolver().resolve_roles(direct.iter().cloned(), ResolveRoleOption::ALL)?;
        let ResolvedRoleData {
            roles,
            privileges,
            restrictions,
        } = resolved;

        let mut indirect = roles.unwrap_or_default();
        indirect.extend(direct);
        user.set_indirect_roles(indirect);
        user.set_privileges(privileges.unwrap_or_default());
        user.set_indirect_restrictions(restrictions.unwrap_or_default());

        debug!(
            user = %request.name,
            roles = user.indirect_roles().len(),
            privileges = user.privileges().len(),
            "Acquired user"
        );
        Ok(user)
    }

    /// Describe the user named by `request` as a document
    ///
    /// Stored fields are kept as stored, `authenticationRestrictions`
    /// included. The resolved closure is added as `inheritedRoles`,
    /// `inheritedPrivileges` and `inheritedAuthenticationRestrictions`; the
    /// last starts with the user's own restriction document when non-empty.
    pub fn get_user_description(&self, request: &UserRequest) -> Result<Document> {
        check_request(request)?;
        let _guard = self.locks.acquire_read_snapshot(request.name.tenant());

        let (mut description, direct, own_restrictions) = match &request.roles {
            Some(roles) => {
                let mut doc = Document::new();
                doc.insert("_id".to_string(), json!(request.name.unambiguous_name()));
                doc.insert("user".to_string(), json!(request.name.user()));
                doc.insert("db".to_string(), json!(request.name.db()));
                doc.insert("credentials".to_string(), CredentialData::external().to_value());
                doc.insert("roles".to_string(), role_array(roles));
                doc.insert("authenticationRestrictions".to_string(), json!([]));
                (doc, roles.clone(), None)
            }
            None => {
                let doc = self.find_user_document(&request.name)?;
                let stored = User::from_document(request.name.clone(), &doc)?;
                let description = filter_document(&doc, ResolveRoleOption::ALL, false);
                let roles = stored.roles().iter().cloned().collect();
                (description, roles, stored.restrictions().cloned())
            }
        };

        let direct = direct_roles_for(&request.name, direct);
        let resolved = self.resolver().resolve_roles(direct.iter().cloned(), ResolveRoleOption::ALL)?;

        let mut inherited = resolved.roles.unwrap_or_default();
        inherited.extend(direct);
        description.insert("inheritedRoles".to_string(), role_array(&inherited));
        description.insert(
            "inheritedPrivileges".to_string(),
            resolved.privileges.unwrap_or_default().to_value(),
        );

        // The user's own document precedes those of its roles.
        let mut restrictions = RestrictionDocuments::new();
        if let Some(document) = own_restrictions {
            restrictions.push(document);
        }
        restrictions.extend(resolved.restrictions.unwrap_or_default());
        description.insert(
            "inheritedAuthenticationRestrictions".to_string(),
            restrictions.to_value(),
        );
        Ok(description)
    }

    fn find_user_document(&self, name: &UserName) -> Result<Document> {
        self.store
            .find_one(&Namespace::users(name.tenant()), &name.to_document())?
            .ok_or_else(|| AuthzError::UserNotFound {
                user: name.user().to_string(),
                db: name.db().to_string(),
            })
    }
}

/// Supplied roles cannot be attributed to a tenant-scoped identity
fn check_request(request: &UserRequest) -> Result<()> {
    if request.roles.is_some() && request.name.tenant().is_some() {
        return Err(AuthzError::BadValue(format!(
            "Mixing tenant {} with externally supplied roles is not allowed for user {}",
            request.name.tenant().map_or("", |t| t.as_str()),
            request.name
        )));
    }
    Ok(())
}

/// Direct roles scoped to the user's tenant
fn direct_roles_for(name: &UserName, roles: impl IntoIterator<Item = RoleName>) -> BTreeSet<RoleName> {
    match name.tenant() {
        Some(tenant) => roles
            .into_iter()
            .map(|role| role.with_tenant(Some(tenant.clone())))
            .collect(),
        None => roles.into_iter().collect(),
    }
}
