//! Role document parsing
//!
//! Both the resolver and the description builder go through
//! [`parse_role_document`], so field type checks live in one place.

use super::options::ResolveRoleOption;
use crate::error::{AuthzError, Result};
use crate::privilege::{Privilege, PrivilegeVector};
use crate::restriction::RestrictionDocument;
use crate::types::{Document, RoleName};
use serde_json::Value;
use tracing::warn;

/// Facets extracted from one stored role document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRoleDocument {
    /// Direct subordinate roles, in document order
    pub roles: Vec<RoleName>,
    /// The role's own privileges, merged per resource
    pub privileges: PrivilegeVector,
    /// The role's own restrictions, when present and non-empty
    pub restrictions: Option<RestrictionDocument>,
}

/// Extract the facets selected by `facets` from the document for `role`
///
/// Subordinate names and privilege resources inherit `role`'s tenant.
///
/// # Errors
///
/// - `BadValue` if `roles` is not an array or holds a malformed name
/// - `UnsupportedFormat` if `privileges` is not an array of privilege
///   documents, or `authenticationRestrictions` is present but not an array
/// - `BadValue` if a restriction entry cannot be parsed
pub fn parse_role_document(
    role: &RoleName,
    doc: &Document,
    facets: ResolveRoleOption,
) -> Result<ParsedRoleDocument> {
    let mut parsed = ParsedRoleDocument::default();

    if facets.wants_roles() {
        let elems = match doc.get("roles") {
            Some(Value::Array(elems)) => elems,
            other => {
                return Err(AuthzError::BadValue(format!(
                    "Invalid 'roles' field in role document '{}', expected an array but found {}",
                    role,
                    type_name(other)
                )))
            }
        };
        for elem in elems {
            parsed.roles.push(RoleName::parse_from_document(elem, role.tenant())?);
        }
    }

    if facets.wants_privileges() {
        let elems = match doc.get("privileges") {
            Some(Value::Array(elems)) => elems,
            other => {
                return Err(AuthzError::UnsupportedFormat(format!(
                    "Invalid 'privileges' field in role document '{}', expected an array but found {}",
                    role,
                    type_name(other)
                )))
            }
        };

        let mut unrecognized = Vec::new();
        for elem in elems {
            if !elem.is_object() {
                return Err(AuthzError::UnsupportedFormat(format!(
                    "Expected privilege document as object in role '{}', got {}",
                    role,
                    type_name(Some(elem))
                )));
            }
            parsed
                .privileges
                .add(Privilege::parse(elem, role.tenant(), &mut unrecognized)?);
        }
        if !unrecognized.is_empty() {
            warn!(%role, actions = ?unrecognized, "Ignoring unrecognized actions in role privileges");
        }
    }

    if facets.wants_restrictions() {
        match doc.get("authenticationRestrictions") {
            None => {}
            Some(value @ Value::Array(elems)) => {
                if !elems.is_empty() {
                    parsed.restrictions = Some(RestrictionDocument::parse(value)?);
                }
            }
            Some(other) => {
                return Err(AuthzError::UnsupportedFormat(format!(
                    "Invalid 'authenticationRestrictions' field in role document '{}', expected an array but found {}",
                    role,
                    type_name(Some(other))
                )))
            }
        }
    }

    Ok(parsed)
}

/// Human-readable JSON type name for error messages
pub(crate) fn type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "missing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "bool",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::types::TenantId;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_all_facets() {
        let tenant = TenantId::new("t1");
        let role = RoleName::new("r1", "test").with_tenant(Some(tenant.clone()));
        let parsed = parse_role_document(
            &role,
            &doc(json!({
                "role": "r1",
                "db": "test",
                "roles": [{"role": "r2", "db": "test"}],
                "privileges": [{"resource": {"db": "test", "collection": ""}, "actions": ["find"]}],
                "authenticationRestrictions": [{"clientSource": ["10.0.0.0/8"]}]
            })),
            ResolveRoleOption::ALL,
        )
        .unwrap();

        assert_eq!(
            parsed.roles,
            vec![RoleName::new("r2", "test").with_tenant(Some(tenant))]
        );
        assert_eq!(parsed.privileges.len(), 1);
        assert!(parsed.restrictions.is_some());
    }

    #[test]
    fn test_unrequested_facets_are_not_checked() {
        let role = RoleName::new("r1", "test");
        let parsed = parse_role_document(
            &role,
            &doc(json!({"roles": [], "privileges": "bogus"})),
            ResolveRoleOption::ROLES,
        )
        .unwrap();
        assert!(parsed.privileges.is_empty());
    }

    #[test]
    fn test_roles_field_errors_are_bad_value() {
        let role = RoleName::new("r1", "test");
        for bad in [json!({"privileges": []}), json!({"roles": "r2"}), json!({"roles": [5]})] {
            let err = parse_role_document(&role, &doc(bad), ResolveRoleOption::ROLES).unwrap_err();
            assert_eq!(err.code(), ErrorCode::BadValue);
        }
    }

    #[test]
    fn test_privileges_field_errors_are_unsupported_format() {
        let role = RoleName::new("r1", "test");
        for bad in [json!({}), json!({"privileges": "find"}), json!({"privileges": ["find"]})] {
            let err = parse_role_document(&role, &doc(bad), ResolveRoleOption::PRIVILEGES).unwrap_err();
            assert_eq!(err.code(), ErrorCode::UnsupportedFormat);
        }
    }

    #[test]
    fn test_restrictions_optional_but_typed() {
        let role = RoleName::new("r1", "test");
        let parsed =
            parse_role_document(&role, &doc(json!({})), ResolveRoleOption::RESTRICTIONS).unwrap();
        assert!(parsed.restrictions.is_none());

        let parsed = parse_role_document(
            &role,
            &doc(json!({"authenticationRestrictions": []})),
            ResolveRoleOption::RESTRICTIONS,
        )
        .unwrap();
        assert!(parsed.restrictions.is_none());

        let err = parse_role_document(
            &role,
            &doc(json!({"authenticationRestrictions": {"clientSource": []}})),
            ResolveRoleOption::RESTRICTIONS,
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedFormat);
    }
}
