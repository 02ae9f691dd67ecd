//! Cache invalidation on observed writes

use super::AuthzState;
use crate::invalidation::{OpType, OplogEntry};
use crate::types::UserName;
use serde_json::Value;
use tracing::{debug, warn};

impl AuthzState {
    /// React to one write observed on the operation log
    ///
    /// Never fails. When the affected user cannot be pinned down the
    /// invalidation widens to the tenant, or to the whole cache when no
    /// tenant is known.
    pub fn log_op(&self, entry: &OplogEntry) {
        if entry.creates_privilege_document() && !self.privilege_documents.is_set() {
            debug!(ns = %entry.ns, "First privilege document observed");
            self.privilege_documents.set();
        }

        if !entry.applies_to_authz_data() {
            return;
        }

        let tenant = entry.ns.tenant.as_ref();
        if entry.ns.is_users() && matches!(entry.op, OpType::Insert | OpType::Update | OpType::Delete) {
            match entry.document_id() {
                Some(Value::String(id)) => match UserName::parse_from_id(id, tenant) {
                    Ok(name) => {
                        debug!(op = %entry.op, user = %name, "Invalidating user after write");
                        self.invalidator.invalidate_user_by_name(&name);
                        return;
                    }
                    Err(err) => {
                        warn!(ns = %entry.ns, error = %err, "Invalidating broadly after write to malformed user id");
                    }
                },
                other => {
                    warn!(ns = %entry.ns, id = ?other, "Invalidating broadly after write without a user id");
                }
            }
        }

        match tenant {
            Some(tenant) => {
                debug!(op = %entry.op, ns = %entry.ns, %tenant, "Invalidating tenant users after write");
                self.invalidator.invalidate_users_by_tenant(tenant);
            }
            None => {
                debug!(op = %entry.op, ns = %entry.ns, "Invalidating entire user cache after write");
                self.invalidator.invalidate_entire_cache();
            }
        }
    }
}
