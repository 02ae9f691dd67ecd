//! User cache and its invalidation interface
//!
//! The authorization state never populates the cache. It only tells it
//! what to drop through [`UserCacheInvalidator`] when identity or role
//! documents change.

use crate::config::UserCacheConfig;
use crate::types::{TenantId, UserName};
use crate::user::User;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Sink for cache invalidations triggered by document changes
pub trait UserCacheInvalidator: Send + Sync {
    /// Drop one cached user
    fn invalidate_user_by_name(&self, name: &UserName);

    /// Drop every cached user of `tenant`
    fn invalidate_users_by_tenant(&self, tenant: &TenantId);

    /// Drop everything
    fn invalidate_entire_cache(&self);
}

/// Cached entry with TTL
#[derive(Clone)]
struct CachedUser {
    user: Arc<User>,
    cached_at: Instant,
}

impl CachedUser {
    fn new(user: Arc<User>) -> Self {
        Self {
            user,
            cached_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

/// In-process user cache keyed by user name
///
/// Provides:
/// - DashMap storage safe to share across request threads
/// - TTL-based expiration on read
/// - A capacity bound evicting the oldest entry
pub struct UserCache {
    users: DashMap<UserName, CachedUser>,
    capacity: usize,
    ttl: Duration,
    stats: DashMap<&'static str, usize>,
}

impl UserCache {
    pub fn new(config: &UserCacheConfig) -> Self {
        Self {
            users: DashMap::new(),
            capacity: config.capacity,
            ttl: config.ttl(),
            stats: DashMap::new(),
        }
    }

    /// Get a cached user
    pub fn get(&self, name: &UserName) -> Option<Arc<User>> {
        if let Some(entry) = self.users.get(name) {
            if entry.is_expired(self.ttl) {
                drop(entry);
                self.users.remove(name);
                self.increment_stat("expirations");
                return None;
            }

            self.increment_stat("hits");
            return Some(Arc::clone(&entry.user));
        }

        self.increment_stat("misses");
        None
    }

    /// Store a user under its own name
    pub fn insert(&self, user: Arc<User>) {
        let name = user.name().clone();
        if !self.users.contains_key(&name) && self.users.len() >= self.capacity {
            self.evict_oldest();
        }
        self.users.insert(name, CachedUser::new(user));
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> UserCacheStats {
        UserCacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            expirations: self.get_stat("expirations"),
            invalidations: self.get_stat("invalidations"),
            entries: self.users.len(),
            max_entries: self.capacity,
        }
    }

    fn evict_oldest(&self) {
        let oldest = self
            .users
            .iter()
            .min_by_key(|entry| entry.value().cached_at)
            .map(|entry| entry.key().clone());
        if let Some(name) = oldest {
            self.users.remove(&name);
        }
    }

    fn increment_stat(&self, key: &'static str) {
        self.increment_stat_by(key, 1);
    }

    fn increment_stat_by(&self, key: &'static str, amount: usize) {
        self.stats
            .entry(key)
            .and_modify(|count| *count += amount)
            .or_insert(amount);
    }

    fn get_stat(&self, key: &str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

impl UserCacheInvalidator for UserCache {
    fn invalidate_user_by_name(&self, name: &UserName) {
        if self.users.remove(name).is_some() {
            self.increment_stat("invalidations");
        }
        debug!(user = %name, "Invalidated cached user");
    }

    fn invalidate_users_by_tenant(&self, tenant: &TenantId) {
        let before = self.users.len();
        self.users.retain(|name, _| name.tenant() != Some(tenant));
        self.increment_stat_by("invalidations", before.saturating_sub(self.users.len()));
        debug!(%tenant, "Invalidated cached users for tenant");
    }

    fn invalidate_entire_cache(&self) {
        let removed = self.users.len();
        self.users.clear();
        self.increment_stat_by("invalidations", removed);
        debug!(removed, "Invalidated entire user cache");
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct UserCacheStats {
    pub hits: usize,
    pub misses: usize,
    pub expirations: usize,
    pub invalidations: usize,
    pub entries: usize,
    pub max_entries: usize,
}

impl UserCacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, tenant: Option<&str>) -> Arc<User> {
        Arc::new(User::new(
            UserName::new(name, "test").with_tenant(tenant.map(TenantId::new)),
        ))
    }

    fn cache(capacity: usize, ttl_secs: u64) -> UserCache {
        UserCache::new(&UserCacheConfig { capacity, ttl_secs })
    }

    #[test]
    fn test_cache_insert_get() {
        let cache = cache(10, 60);
        let alice = user("alice", None);

        assert!(cache.get(alice.name()).is_none());
        cache.insert(Arc::clone(&alice));
        assert_eq!(cache.get(alice.name()).unwrap().name(), alice.name());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_cache_ttl() {
        let cache = cache(10, 0);
        let alice = user("alice", None);
        cache.insert(Arc::clone(&alice));

        std::thread::sleep(Duration::from_millis(20));

        assert!(cache.get(alice.name()).is_none());
        assert_eq!(cache.stats().expirations, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = cache(2, 60);
        let first = user("first", None);
        cache.insert(Arc::clone(&first));
        std::thread::sleep(Duration::from_millis(5));
        cache.insert(user("second", None));
        cache.insert(user("third", None));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(first.name()).is_none());
    }

    #[test]
    fn test_invalidation_scopes() {
        let cache = cache(10, 60);
        let a = user("a", Some("t1"));
        let b = user("b", Some("t1"));
        let c = user("c", Some("t2"));
        let d = user("d", None);
        for u in [&a, &b, &c, &d] {
            cache.insert(Arc::clone(u));
        }

        cache.invalidate_user_by_name(a.name());
        assert_eq!(cache.len(), 3);

        cache.invalidate_users_by_tenant(&TenantId::new("t1"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(c.name()).is_some());

        cache.invalidate_entire_cache();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 4);
    }
}
