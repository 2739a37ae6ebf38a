//! Identity allowlist injected at construction time.

use crate::config::MemberConfig;

/// Static identity table: who may use the ledger, their display names and
/// capability flags. Order is the rotation tie-break order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    members: Vec<MemberConfig>,
}

impl Roster {
    #[must_use]
    pub fn new(members: Vec<MemberConfig>) -> Self {
        Self { members }
    }

    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&MemberConfig> {
        self.members.iter().find(|m| m.identity == identity)
    }

    #[must_use]
    pub fn contains(&self, identity: &str) -> bool {
        self.get(identity).is_some()
    }

    /// Display name, falling back to the identity itself.
    #[must_use]
    pub fn display_name<'a>(&'a self, identity: &'a str) -> &'a str {
        self.get(identity).map_or(identity, |m| m.name.as_str())
    }

    #[must_use]
    pub fn is_admin(&self, identity: &str) -> bool {
        self.get(identity).is_some_and(|m| m.admin)
    }

    #[must_use]
    pub fn can_always_confirm(&self, identity: &str) -> bool {
        self.get(identity).is_some_and(|m| m.can_always_confirm)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemberConfig> {
        self.members.iter()
    }
}
