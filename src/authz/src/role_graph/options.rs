//! Facet selection for role resolution

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Bitmask selecting which facets a resolution gathers
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResolveRoleOption(u8);

impl ResolveRoleOption {
    /// Gather the subordinate role set
    pub const ROLES: Self = Self(0x1);
    /// Gather merged privileges
    pub const PRIVILEGES: Self = Self(0x2);
    /// Gather authentication restriction documents
    pub const RESTRICTIONS: Self = Self(0x4);
    /// Stop after the starting roles' direct subordinates
    pub const DIRECT_ONLY: Self = Self(0x8);

    /// Every facet, walking indirect roles
    pub const ALL: Self = Self(0x1 | 0x2 | 0x4);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn wants_roles(self) -> bool {
        self.contains(Self::ROLES)
    }

    pub fn wants_privileges(self) -> bool {
        self.contains(Self::PRIVILEGES)
    }

    pub fn wants_restrictions(self) -> bool {
        self.contains(Self::RESTRICTIONS)
    }

    /// Whether traversal continues past direct subordinates
    pub fn walks_indirect(self) -> bool {
        !self.contains(Self::DIRECT_ONLY)
    }
}

impl BitOr for ResolveRoleOption {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ResolveRoleOption {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ResolveRoleOption {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Debug for ResolveRoleOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::ROLES, "ROLES"),
            (Self::PRIVILEGES, "PRIVILEGES"),
            (Self::RESTRICTIONS, "RESTRICTIONS"),
            (Self::DIRECT_ONLY, "DIRECT_ONLY"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "ResolveRoleOption({})", set.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_walks_indirect() {
        let all = ResolveRoleOption::ALL;
        assert!(all.wants_roles() && all.wants_privileges() && all.wants_restrictions());
        assert!(all.walks_indirect());
    }

    #[test]
    fn test_combinations() {
        let option = ResolveRoleOption::PRIVILEGES | ResolveRoleOption::DIRECT_ONLY;
        assert!(!option.wants_roles());
        assert!(option.wants_privileges());
        assert!(!option.walks_indirect());
        assert_eq!(
            format!("{:?}", option),
            "ResolveRoleOption(PRIVILEGES | DIRECT_ONLY)"
        );
        assert_eq!((option & ResolveRoleOption::PRIVILEGES), ResolveRoleOption::PRIVILEGES);
    }
}
