//! Materialized users
//!
//! A [`User`] is the product of one acquisition: the stored (or externally
//! supplied) identity plus the closure of its roles.

use crate::error::{AuthzError, Result};
use crate::privilege::{ActionType, PrivilegeVector};
use crate::restriction::{RestrictionDocument, RestrictionDocuments};
use crate::role_graph::document::type_name;
use crate::types::{Document, RoleName, UserName};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::net::IpAddr;

/// Request to acquire a user
///
/// With `roles` set the identity is external: no user document is read and
/// the supplied roles are the direct roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRequest {
    pub name: UserName,
    pub roles: Option<Vec<RoleName>>,
}

impl UserRequest {
    /// Stored-user lookup
    pub fn new(name: UserName) -> Self {
        Self { name, roles: None }
    }

    /// External identity with caller-supplied roles
    pub fn with_roles(name: UserName, roles: Vec<RoleName>) -> Self {
        Self {
            name,
            roles: Some(roles),
        }
    }

    pub fn is_external(&self) -> bool {
        self.roles.is_some()
    }
}

/// Credential mechanisms present on a user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialData {
    mechanisms: BTreeSet<String>,
    external: bool,
}

impl CredentialData {
    /// Credentials of an externally authenticated identity
    pub fn external() -> Self {
        Self {
            mechanisms: BTreeSet::new(),
            external: true,
        }
    }

    /// Parse the `credentials` field of a user document
    pub fn parse(value: Option<&Value>) -> Result<Self> {
        let obj = match value {
            Some(Value::Object(obj)) => obj,
            other => {
                return Err(AuthzError::UnsupportedFormat(format!(
                    "User document needs 'credentials' object, found {}",
                    type_name(other)
                )))
            }
        };

        let mut credentials = Self::default();
        for (key, value) in obj {
            if key == "external" {
                credentials.external = value.as_bool().unwrap_or(false);
            } else {
                credentials.mechanisms.insert(key.clone());
            }
        }
        Ok(credentials)
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn mechanisms(&self) -> impl Iterator<Item = &str> {
        self.mechanisms.iter().map(String::as_str)
    }

    pub fn has_mechanism(&self, mechanism: &str) -> bool {
        self.mechanisms.contains(mechanism)
    }

    /// Mechanism names only; secrets never leave the store
    pub fn to_value(&self) -> Value {
        if self.external {
            return json!({"external": true});
        }
        let mechanisms: Vec<&str> = self.mechanisms().collect();
        json!({ "mechanisms": mechanisms })
    }
}

/// A user with its role closure resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    name: UserName,
    credentials: CredentialData,
    roles: BTreeSet<RoleName>,
    indirect_roles: BTreeSet<RoleName>,
    privileges: PrivilegeVector,
    restrictions: Option<RestrictionDocument>,
    indirect_restrictions: RestrictionDocuments,
}

impl User {
    pub fn new(name: UserName) -> Self {
        Self {
            name,
            credentials: CredentialData::default(),
            roles: BTreeSet::new(),
            indirect_roles: BTreeSet::new(),
            privileges: PrivilegeVector::new(),
            restrictions: None,
            indirect_restrictions: RestrictionDocuments::new(),
        }
    }

    /// Identity fields of a stored user document
    ///
    /// Direct roles take the user's tenant. Resolved fields start empty.
    pub fn from_document(name: UserName, doc: &Document) -> Result<Self> {
        let mut user = Self::new(name);
        user.credentials = CredentialData::parse(doc.get("credentials"))?;

        let roles = match doc.get("roles") {
            Some(Value::Array(roles)) => roles,
            other => {
                return Err(AuthzError::BadValue(format!(
                    "User document for {} needs a 'roles' array, found {}",
                    user.name,
                    type_name(other)
                )))
            }
        };
        for role in roles {
            user.roles
                .insert(RoleName::parse_from_document(role, user.name.tenant())?);
        }

        match doc.get("authenticationRestrictions") {
            None => {}
            Some(value) => {
                let document = RestrictionDocument::parse(value)?;
                if !document.is_empty() {
                    user.restrictions = Some(document);
                }
            }
        }
        Ok(user)
    }

    pub fn name(&self) -> &UserName {
        &self.name
    }

    pub fn credentials(&self) -> &CredentialData {
        &self.credentials
    }

    /// Directly assigned roles
    pub fn roles(&self) -> &BTreeSet<RoleName> {
        &self.roles
    }

    /// Direct roles and everything they inherit
    pub fn indirect_roles(&self) -> &BTreeSet<RoleName> {
        &self.indirect_roles
    }

    pub fn privileges(&self) -> &PrivilegeVector {
        &self.privileges
    }

    /// The user document's own restrictions
    pub fn restrictions(&self) -> Option<&RestrictionDocument> {
        self.restrictions.as_ref()
    }

    /// Restrictions inherited through roles
    pub fn indirect_restrictions(&self) -> &RestrictionDocuments {
        &self.indirect_restrictions
    }

    pub fn set_credentials(&mut self, credentials: CredentialData) {
        self.credentials = credentials;
    }

    pub fn set_roles(&mut self, roles: impl IntoIterator<Item = RoleName>) {
        self.roles = roles.into_iter().collect();
    }

    pub fn set_indirect_roles(&mut self, roles: BTreeSet<RoleName>) {
        self.indirect_roles = roles;
    }

    pub fn set_privileges(&mut self, privileges: PrivilegeVector) {
        self.privileges = privileges;
    }

    pub fn set_indirect_restrictions(&mut self, restrictions: RestrictionDocuments) {
        self.indirect_restrictions = restrictions;
    }

    pub fn is_external(&self) -> bool {
        self.credentials.is_external()
    }

    /// Whether `role` is held directly or through inheritance
    pub fn has_role(&self, role: &RoleName) -> bool {
        self.roles.contains(role) || self.indirect_roles.contains(role)
    }

    /// Whether the user may perform `action` on `db.collection`
    ///
    /// An empty `collection` asks about the database itself.
    pub fn is_authorized_for(&self, db: &str, collection: &str, action: ActionType) -> bool {
        self.privileges
            .is_authorized(self.name.tenant(), db, collection, action)
    }

    /// Check a connection against the user's own and inherited restrictions
    pub fn validate_restrictions(&self, client: IpAddr, server: IpAddr) -> Result<()> {
        if let Some(own) = &self.restrictions {
            own.validate(client, server)?;
        }
        self.indirect_restrictions.validate(client, server)
    }

    /// Render the user as a `usersInfo` entry
    pub fn report_for_users_info(
        &self,
        show_credentials: bool,
        show_privileges: bool,
        show_restrictions: bool,
    ) -> Document {
        let mut doc = Document::new();
        doc.insert("_id".to_string(), json!(self.name.unambiguous_name()));
        doc.insert("user".to_string(), json!(self.name.user()));
        doc.insert("db".to_string(), json!(self.name.db()));
        if show_credentials {
            doc.insert("credentials".to_string(), self.credentials.to_value());
        }
        doc.insert("roles".to_string(), role_array(&self.roles));
        doc.insert("inheritedRoles".to_string(), role_array(&self.indirect_roles));

        if show_privileges {
            doc.insert("inheritedPrivileges".to_string(), self.privileges.to_value());
        }
        if show_restrictions {
            let own = self
                .restrictions
                .as_ref()
                .map_or_else(|| json!([]), RestrictionDocument::to_value);
            doc.insert("authenticationRestrictions".to_string(), own);
            doc.insert(
                "inheritedAuthenticationRestrictions".to_string(),
                self.indirect_restrictions.to_value(),
            );
        }
        doc
    }
}

/// `[{role, db}, ...]` in name order
pub(crate) fn role_array<'a>(roles: impl IntoIterator<Item = &'a RoleName>) -> Value {
    Value::Array(
        roles
            .into_iter()
            .map(|role| Value::Object(role.to_document()))
            .collect(),
    )
}
