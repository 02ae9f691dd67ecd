//! Per-tenant roles locks
//!
//! A resolution holds one read guard for its whole duration, so a role
//! mutation performed under the matching write guard is seen either
//! entirely or not at all.

use crate::types::TenantId;
use dashmap::DashMap;
use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock, RwLock};
use std::sync::Arc;
use tracing::trace;

/// Scoped read snapshot over one tenant's user and role collections
///
/// Released on drop.
#[must_use = "the snapshot is released as soon as the guard is dropped"]
pub struct RolesReadGuard {
    guard: Option<ArcRwLockReadGuard<RawRwLock, ()>>,
}

impl RolesReadGuard {
    /// Whether this guard actually holds a shared lock
    pub fn is_locked(&self) -> bool {
        self.guard.is_some()
    }
}

/// Exclusive access for mutating one tenant's roles and users
#[must_use = "exclusive access ends as soon as the guard is dropped"]
pub struct RolesWriteGuard {
    _guard: ArcRwLockWriteGuard<RawRwLock, ()>,
}

/// Lock table keyed by tenant
pub struct RolesLocks {
    locks: DashMap<Option<TenantId>, Arc<RwLock<()>>>,
    lock_free_reads: bool,
}

impl RolesLocks {
    /// Create a lock table
    ///
    /// With `lock_free_reads` the store is trusted to provide snapshot reads
    /// and read guards take no lock.
    pub fn new(lock_free_reads: bool) -> Self {
        Self {
            locks: DashMap::new(),
            lock_free_reads,
        }
    }

    fn lock_for(&self, tenant: Option<&TenantId>) -> Arc<RwLock<()>> {
        self.locks
            .entry(tenant.cloned())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Acquire a read snapshot for `tenant`
    pub fn acquire_read_snapshot(&self, tenant: Option<&TenantId>) -> RolesReadGuard {
        if self.lock_free_reads {
            trace!(?tenant, "lock-free roles snapshot");
            return RolesReadGuard { guard: None };
        }
        trace!(?tenant, "acquiring shared roles lock");
        RolesReadGuard {
            guard: Some(self.lock_for(tenant).read_arc()),
        }
    }

    /// Acquire exclusive access for `tenant`
    pub fn acquire_write(&self, tenant: Option<&TenantId>) -> RolesWriteGuard {
        trace!(?tenant, "acquiring exclusive roles lock");
        RolesWriteGuard {
            _guard: self.lock_for(tenant).write_arc(),
        }
    }
}

impl Default for RolesLocks {
    fn default() -> Self {
        Self::new(false)
    }
}
