use bitflags::bitflags;

/// Lifecycle state of an aura instance.
///
/// ```text
/// Inactive -> Applying -> Active -> (Refreshing | StackChanging) -> Active
///                           |
///                           v
///                        Removing -> Removed
/// ```
///
/// `Removed` is terminal: any transition out of it is an invariant violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuraState {
    Inactive,
    Applying,
    Active,
    Refreshing,
    StackChanging,
    Removing,
    Removed,
}

impl AuraState {
    pub fn can_transition_to(self, next: AuraState) -> bool {
        use AuraState::*;
        matches!(
            (self, next),
            (Inactive, Applying)
                | (Applying, Active)
                | (Applying, Removing)
                | (Active, Refreshing)
                | (Active, StackChanging)
                | (Active, Removing)
                | (Refreshing, Active)
                | (StackChanging, Active)
                | (StackChanging, Removing)
                | (Removing, Removed)
        )
    }

    /// Whether the instance currently participates in event dispatch.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            AuraState::Active | AuraState::Refreshing | AuraState::StackChanging
        )
    }

    pub fn is_terminal(self) -> bool {
        self == AuraState::Removed
    }
}

/// Why an aura left its actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum RemoveReason {
    /// Duration ran out.
    Expired,
    /// Cancelled by a script, the host or the player.
    ExplicitCancel,
    /// Displaced by another member of the same exclusive group.
    ReplacedByExclusive,
    /// The owning actor died.
    TargetDied,
    /// Stack count dropped to zero.
    StacksDepleted,
}

impl RemoveReason {
    pub fn as_filter(self) -> RemovalFilter {
        match self {
            Self::Expired => RemovalFilter::EXPIRED,
            Self::ExplicitCancel => RemovalFilter::CANCELLED,
            Self::ReplacedByExclusive => RemovalFilter::REPLACED,
            Self::TargetDied => RemovalFilter::TARGET_DIED,
            Self::StacksDepleted => RemovalFilter::STACKS_DEPLETED,
        }
    }
}

bitflags! {
    /// Removal reasons an on-remove registration wants to observe.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct RemovalFilter: u8 {
        const EXPIRED         = 1 << 0;
        const CANCELLED       = 1 << 1;
        const REPLACED        = 1 << 2;
        const TARGET_DIED     = 1 << 3;
        const STACKS_DEPLETED = 1 << 4;

        /// Every way an aura can end except natural expiry.
        const EARLY = Self::CANCELLED.bits()
            | Self::REPLACED.bits()
            | Self::TARGET_DIED.bits()
            | Self::STACKS_DEPLETED.bits();
        const ALL = Self::EXPIRED.bits() | Self::EARLY.bits();
    }
}

impl RemovalFilter {
    pub fn allows(self, reason: RemoveReason) -> bool {
        self.contains(reason.as_filter())
    }
}

/// Whether an apply is the first one or a reapplication onto a live instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ApplyKind {
    Real,
    Reapply,
}

/// Which kinds of apply an on-apply registration observes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ApplyMode {
    #[default]
    RealOnly,
    ReapplyOnly,
    RealOrReapply,
}

impl ApplyMode {
    pub fn observes(self, kind: ApplyKind) -> bool {
        matches!(
            (self, kind),
            (ApplyMode::RealOnly, ApplyKind::Real)
                | (ApplyMode::ReapplyOnly, ApplyKind::Reapply)
                | (ApplyMode::RealOrReapply, _)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn removed_is_terminal() {
        use AuraState::*;
        for next in [Inactive, Applying, Active, Refreshing, StackChanging, Removing, Removed] {
            assert!(!Removed.can_transition_to(next));
        }
    }

    #[test]
    fn happy_path_is_allowed() {
        use AuraState::*;
        let path = [Inactive, Applying, Active, Refreshing, Active, StackChanging, Active, Removing, Removed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(!Inactive.can_transition_to(Active));
        assert!(!Refreshing.can_transition_to(StackChanging));
    }

    #[test]
    fn filter_all_admits_every_reason() {
        for reason in RemoveReason::iter() {
            assert!(RemovalFilter::ALL.allows(reason));
        }
        assert!(RemovalFilter::EXPIRED.allows(RemoveReason::Expired));
        assert!(!RemovalFilter::EXPIRED.allows(RemoveReason::ExplicitCancel));
        assert!(!RemovalFilter::EARLY.allows(RemoveReason::Expired));
    }

    #[test]
    fn apply_mode_observation() {
        assert!(ApplyMode::RealOnly.observes(ApplyKind::Real));
        assert!(!ApplyMode::RealOnly.observes(ApplyKind::Reapply));
        assert!(ApplyMode::ReapplyOnly.observes(ApplyKind::Reapply));
        assert!(!ApplyMode::ReapplyOnly.observes(ApplyKind::Real));
        assert!(ApplyMode::RealOrReapply.observes(ApplyKind::Real));
        assert!(ApplyMode::RealOrReapply.observes(ApplyKind::Reapply));
    }
}
