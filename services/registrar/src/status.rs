//! Identifier lifecycle status and the transition table.
//!
//! Remote registries distinguish "intent recorded locally, remote call not
//! yet confirmed" (`ToBe*`, `Update*`) from "confirmed remote effect"
//! (`Is*`, `Deleted`). Every status change goes through
//! [`Status::can_transition_to`]; anything outside the table is an
//! [`IllegalTransition`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of one identifier record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Created locally, no further context known.
    Minted,
    /// Waiting for a filter check or manual approval.
    Pending,
    ToBeReserved,
    IsReserved,
    ToBeRegistered,
    IsRegistered,
    /// Reserved; an updated metadata record must be sent.
    UpdateReserved,
    /// Registered; an updated metadata record must be sent.
    UpdateRegistered,
    /// Metadata must be updated before registration proceeds.
    UpdateBeforeRegistration,
    ToBeDeleted,
    Deleted,
}

/// Statuses whose remote effect has not been confirmed yet.
pub const INTENT_STATES: [Status; 6] = [
    Status::ToBeReserved,
    Status::ToBeRegistered,
    Status::UpdateReserved,
    Status::UpdateRegistered,
    Status::UpdateBeforeRegistration,
    Status::ToBeDeleted,
];

/// A status change that the transition table does not allow.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("illegal status transition: {from} -> {to}")]
pub struct IllegalTransition {
    pub from: Status,
    pub to: Status,
}

impl Status {
    pub const ALL: [Status; 11] = [
        Status::Minted,
        Status::Pending,
        Status::ToBeReserved,
        Status::IsReserved,
        Status::ToBeRegistered,
        Status::IsRegistered,
        Status::UpdateReserved,
        Status::UpdateRegistered,
        Status::UpdateBeforeRegistration,
        Status::ToBeDeleted,
        Status::Deleted,
    ];

    /// Targets reachable from this status in one step.
    pub fn legal_targets(&self) -> &'static [Status] {
        use Status::*;
        match self {
            Minted => &[Pending, ToBeRegistered, ToBeReserved],
            Pending => &[ToBeRegistered, ToBeReserved, ToBeDeleted],
            ToBeReserved => &[IsReserved, ToBeDeleted],
            IsReserved => &[UpdateReserved, ToBeRegistered, ToBeDeleted],
            UpdateReserved => &[IsReserved, ToBeDeleted],
            ToBeRegistered => &[IsRegistered, ToBeDeleted],
            IsRegistered => &[UpdateRegistered, ToBeDeleted],
            UpdateRegistered => &[IsRegistered, ToBeDeleted],
            UpdateBeforeRegistration => &[ToBeRegistered],
            ToBeDeleted => &[Deleted],
            Deleted => &[],
        }
    }

    pub fn can_transition_to(&self, target: Status) -> bool {
        self.legal_targets().contains(&target)
    }

    /// Validates a single step, returning the target on success.
    pub fn transition(self, target: Status) -> Result<Status, IllegalTransition> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(IllegalTransition {
                from: self,
                to: target,
            })
        }
    }

    /// Storage tag.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minted => "minted",
            Self::Pending => "pending",
            Self::ToBeReserved => "to_be_reserved",
            Self::IsReserved => "is_reserved",
            Self::ToBeRegistered => "to_be_registered",
            Self::IsRegistered => "is_registered",
            Self::UpdateReserved => "update_reserved",
            Self::UpdateRegistered => "update_registered",
            Self::UpdateBeforeRegistration => "update_before_registration",
            Self::ToBeDeleted => "to_be_deleted",
            Self::Deleted => "deleted",
        }
    }

    /// Parses a storage tag. Unknown tags yield `None`; callers must treat
    /// that as corruption rather than picking a default.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == tag)
    }

    /// Human-readable label for display surfaces.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Minted => "Minted",
            Self::Pending => "Pending approval",
            Self::ToBeReserved => "Queued for reservation",
            Self::IsReserved => "Reserved",
            Self::ToBeRegistered => "Queued for registration",
            Self::IsRegistered => "Registered",
            Self::UpdateReserved => "Reserved, metadata update queued",
            Self::UpdateRegistered => "Registered, metadata update queued",
            Self::UpdateBeforeRegistration => "Metadata update queued before registration",
            Self::ToBeDeleted => "Queued for deletion",
            Self::Deleted => "Deleted",
        }
    }

    pub fn is_minted(&self) -> bool {
        matches!(self, Self::Minted)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_to_be_reserved(&self) -> bool {
        matches!(self, Self::ToBeReserved)
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::IsReserved)
    }

    pub fn is_to_be_registered(&self) -> bool {
        matches!(self, Self::ToBeRegistered)
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, Self::IsRegistered)
    }

    pub fn is_update_reserved(&self) -> bool {
        matches!(self, Self::UpdateReserved)
    }

    pub fn is_update_registered(&self) -> bool {
        matches!(self, Self::UpdateRegistered)
    }

    pub fn is_update_before_registration(&self) -> bool {
        matches!(self, Self::UpdateBeforeRegistration)
    }

    pub fn is_to_be_deleted(&self) -> bool {
        matches!(self, Self::ToBeDeleted)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }

    /// True while a remote effect is requested but unconfirmed.
    pub fn is_intent(&self) -> bool {
        INTENT_STATES.contains(self)
    }

    /// The confirmed status an intent status resolves to once the remote
    /// call succeeds. `UpdateBeforeRegistration` has none: it must first
    /// move to `ToBeRegistered`.
    pub const fn confirmed(&self) -> Option<Status> {
        match self {
            Self::ToBeReserved | Self::UpdateReserved => Some(Self::IsReserved),
            Self::ToBeRegistered | Self::UpdateRegistered => Some(Self::IsRegistered),
            Self::ToBeDeleted => Some(Self::Deleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TABLE: &[(Status, Status)] = &[
        (Status::Minted, Status::Pending),
        (Status::Minted, Status::ToBeRegistered),
        (Status::Minted, Status::ToBeReserved),
        (Status::Pending, Status::ToBeRegistered),
        (Status::Pending, Status::ToBeReserved),
        (Status::Pending, Status::ToBeDeleted),
        (Status::ToBeReserved, Status::IsReserved),
        (Status::ToBeReserved, Status::ToBeDeleted),
        (Status::IsReserved, Status::UpdateReserved),
        (Status::IsReserved, Status::ToBeRegistered),
        (Status::IsReserved, Status::ToBeDeleted),
        (Status::UpdateReserved, Status::IsReserved),
        (Status::UpdateReserved, Status::ToBeDeleted),
        (Status::ToBeRegistered, Status::IsRegistered),
        (Status::ToBeRegistered, Status::ToBeDeleted),
        (Status::IsRegistered, Status::UpdateRegistered),
        (Status::IsRegistered, Status::ToBeDeleted),
        (Status::UpdateRegistered, Status::IsRegistered),
        (Status::UpdateRegistered, Status::ToBeDeleted),
        (Status::UpdateBeforeRegistration, Status::ToBeRegistered),
        (Status::ToBeDeleted, Status::Deleted),
    ];

    fn any_status() -> impl Strategy<Value = Status> {
        (0..Status::ALL.len()).prop_map(|i| Status::ALL[i])
    }

    #[test]
    fn test_table_edges_are_legal() {
        for (from, to) in TABLE {
            assert!(from.can_transition_to(*to), "{from} -> {to} should be legal");
        }
    }

    #[test]
    fn test_edge_count_matches_table() {
        let count: usize = Status::ALL.iter().map(|s| s.legal_targets().len()).sum();
        assert_eq!(count, TABLE.len());
    }

    #[test]
    fn test_deleted_is_terminal() {
        assert!(Status::Deleted.legal_targets().is_empty());
    }

    #[test]
    fn test_no_self_transitions() {
        for status in Status::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_tag_roundtrip() {
        for status in Status::ALL {
            assert_eq!(Status::from_tag(status.as_str()), Some(status));
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert_eq!(Status::from_tag("registered"), None);
        assert_eq!(Status::from_tag("111"), None);
    }

    #[test]
    fn test_is_minted_checks_minted_exactly() {
        assert!(Status::Minted.is_minted());
        assert!(!Status::Pending.is_minted());
    }

    #[test]
    fn test_confirmed_pairs() {
        assert_eq!(Status::ToBeReserved.confirmed(), Some(Status::IsReserved));
        assert_eq!(Status::UpdateRegistered.confirmed(), Some(Status::IsRegistered));
        assert_eq!(Status::ToBeDeleted.confirmed(), Some(Status::Deleted));
        assert_eq!(Status::UpdateBeforeRegistration.confirmed(), None);
        assert_eq!(Status::IsRegistered.confirmed(), None);

        for intent in INTENT_STATES {
            if let Some(confirmed) = intent.confirmed() {
                assert!(intent.can_transition_to(confirmed));
            }
        }
    }

    proptest! {
        #[test]
        fn prop_transition_matches_table(from in any_status(), to in any_status()) {
            let in_table = TABLE.contains(&(from, to));
            match from.transition(to) {
                Ok(next) => {
                    prop_assert!(in_table);
                    prop_assert_eq!(next, to);
                }
                Err(err) => {
                    prop_assert!(!in_table);
                    prop_assert_eq!(err, IllegalTransition { from, to });
                }
            }
        }
    }
}
