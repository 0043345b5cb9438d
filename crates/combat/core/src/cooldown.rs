//! Cooldown and charge bookkeeping.
//!
//! Two timers live side by side and must never be conflated:
//!
//! - the **usage cooldown** of an entry (`ready_at`), which is what
//!   [`CooldownManager::modify_cooldown`] and [`CooldownManager::reset_cooldown`]
//!   touch, and
//! - the **charge recovery** timer of a charge-based entry, which is what
//!   [`CooldownManager::modify_charge_recovery`] and
//!   [`CooldownManager::restore_charge`] touch.
//!
//! Time is passed in explicitly. Charge recovery is evaluated lazily against
//! the supplied `now`, so read-only queries never mutate state.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::{AbilityId, CategoryId, Tick};

/// What a cooldown entry is keyed by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CooldownKey {
    /// The cooldown of one specific ability.
    Ability(AbilityId),
    /// A cooldown or charge pool shared by a category of abilities.
    Category(CategoryId),
}

impl fmt::Display for CooldownKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ability(id) => write!(f, "{id}"),
            Self::Category(id) => write!(f, "{id}"),
        }
    }
}

/// Errors returned when trying to use an entry.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CooldownError {
    #[error("{key} is on cooldown for another {remaining}ms")]
    NotReady { key: CooldownKey, remaining: u64 },

    #[error("{key} has no charges available")]
    NoCharges { key: CooldownKey },
}

/// Charge pool of a charge-based entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChargeState {
    available: u32,
    maximum: u32,
    /// Time to recover one charge, in milliseconds.
    recovery: u64,
    /// When the charge currently recovering becomes available.
    recovery_ready_at: Option<Tick>,
}

impl ChargeState {
    /// Creates a full charge pool.
    pub fn new(maximum: u32, recovery: u64) -> Self {
        Self {
            available: maximum,
            maximum,
            recovery,
            recovery_ready_at: None,
        }
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    pub fn maximum(&self) -> u32 {
        self.maximum
    }

    pub fn recovery(&self) -> u64 {
        self.recovery
    }

    pub fn recovery_ready_at(&self) -> Option<Tick> {
        self.recovery_ready_at
    }

    /// The pool as it looks at `now`, without mutating `self`.
    pub fn projected(&self, now: Tick) -> ChargeState {
        let mut copy = *self;
        copy.sync(now);
        copy
    }

    /// Credits every charge whose recovery completed at or before `now`.
    fn sync(&mut self, now: Tick) {
        while let Some(at) = self.recovery_ready_at {
            if at > now {
                break;
            }
            self.available = (self.available + 1).min(self.maximum);
            self.recovery_ready_at = if self.available < self.maximum {
                Some(at + self.recovery)
            } else {
                None
            };
        }
    }

    fn start_recovery_if_idle(&mut self, now: Tick) {
        if self.available < self.maximum && self.recovery_ready_at.is_none() {
            self.recovery_ready_at = Some(now + self.recovery);
        }
    }

    fn consume(&mut self, now: Tick) -> bool {
        self.sync(now);
        if self.available == 0 {
            return false;
        }
        self.available -= 1;
        self.start_recovery_if_idle(now);
        true
    }

    fn restore(&mut self, now: Tick) {
        self.sync(now);
        if self.available < self.maximum {
            self.available += 1;
        }
        if self.available >= self.maximum {
            self.recovery_ready_at = None;
        } else {
            self.start_recovery_if_idle(now);
        }
    }

    fn modify_recovery(&mut self, delta: i64, now: Tick) {
        self.sync(now);
        if let Some(at) = self.recovery_ready_at {
            self.recovery_ready_at = Some(at.offset(delta).max(now));
            self.sync(now);
        }
    }
}

/// One cooldown entry, optionally charge-based.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CooldownEntry {
    /// Cooldown started by [`CooldownManager::try_use`], in milliseconds.
    pub base_duration: u64,
    ready_at: Tick,
    charges: Option<ChargeState>,
}

impl CooldownEntry {
    /// Remaining usage cooldown at `now`. Never negative.
    pub fn remaining(&self, now: Tick) -> u64 {
        self.ready_at.since(now)
    }

    pub fn ready_at(&self) -> Tick {
        self.ready_at
    }

    /// Charge pool as seen at `now`, if the entry is charge-based.
    pub fn charges(&self, now: Tick) -> Option<ChargeState> {
        self.charges.map(|c| c.projected(now))
    }

    /// A charge-based entry is usable whenever a charge is available, even if
    /// the usage cooldown is still running.
    pub fn is_ready(&self, now: Tick) -> bool {
        match self.charges {
            Some(charges) => charges.projected(now).available > 0,
            None => self.remaining(now) == 0,
        }
    }
}

/// Per-actor cooldown and charge table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CooldownManager {
    entries: BTreeMap<CooldownKey, CooldownEntry>,
}

impl CooldownManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `key` as charge-based with a full pool.
    pub fn define_charges(&mut self, key: CooldownKey, maximum: u32, recovery: u64) {
        self.entries.entry(key).or_default().charges = Some(ChargeState::new(maximum, recovery));
    }

    /// Starts (or restarts) the usage cooldown of `key`.
    pub fn start_cooldown(&mut self, key: CooldownKey, duration: u64, now: Tick) {
        let entry = self.entries.entry(key).or_default();
        entry.base_duration = duration;
        entry.ready_at = now + duration;
    }

    /// Uses `key` once: consumes a charge for charge-based entries, otherwise
    /// requires the usage cooldown to be over and restarts it.
    ///
    /// Entries that were never tracked are always usable.
    pub fn try_use(&mut self, key: CooldownKey, now: Tick) -> Result<(), CooldownError> {
        let Some(entry) = self.entries.get_mut(&key) else {
            return Ok(());
        };

        if let Some(charges) = entry.charges.as_mut() {
            return if charges.consume(now) {
                Ok(())
            } else {
                Err(CooldownError::NoCharges { key })
            };
        }

        let remaining = entry.remaining(now);
        if remaining > 0 {
            return Err(CooldownError::NotReady { key, remaining });
        }
        entry.ready_at = now + entry.base_duration;
        Ok(())
    }

    /// Shifts the remaining usage cooldown by `delta` milliseconds.
    ///
    /// The result is floored at zero, and reaching zero makes the entry ready
    /// immediately. Returns the new remaining cooldown, or `None` for an
    /// untracked key.
    pub fn modify_cooldown(&mut self, key: CooldownKey, delta: i64, now: Tick) -> Option<u64> {
        let entry = self.entries.get_mut(&key)?;
        let remaining = (entry.remaining(now) as i64).saturating_add(delta).max(0) as u64;
        entry.ready_at = now + remaining;
        Some(remaining)
    }

    /// Clears the usage cooldown of `key`. When `restore_charge` is set and the
    /// entry is charge-based, one charge is restored as well.
    ///
    /// Returns false for an untracked key.
    pub fn reset_cooldown(&mut self, key: CooldownKey, now: Tick, restore_charge: bool) -> bool {
        let Some(entry) = self.entries.get_mut(&key) else {
            return false;
        };
        entry.ready_at = now;
        if restore_charge && let Some(charges) = entry.charges.as_mut() {
            charges.restore(now);
        }
        true
    }

    /// Adds one charge (capped at the maximum) and starts recovery for any
    /// charge still missing. Returns the available charges afterwards, or
    /// `None` if `key` is not charge-based.
    pub fn restore_charge(&mut self, key: CooldownKey, now: Tick) -> Option<u32> {
        let charges = self.entries.get_mut(&key)?.charges.as_mut()?;
        charges.restore(now);
        Some(charges.available)
    }

    /// Shifts the charge-recovery timer of `key` by `delta` milliseconds.
    ///
    /// This never touches the usage cooldown. Returns the available charges
    /// afterwards, or `None` if `key` is not charge-based.
    pub fn modify_charge_recovery(&mut self, key: CooldownKey, delta: i64, now: Tick) -> Option<u32> {
        let charges = self.entries.get_mut(&key)?.charges.as_mut()?;
        charges.modify_recovery(delta, now);
        Some(charges.available)
    }

    /// Remaining usage cooldown of `key` (zero when untracked).
    pub fn remaining(&self, key: CooldownKey, now: Tick) -> u64 {
        self.entries.get(&key).map_or(0, |e| e.remaining(now))
    }

    /// Available charges of `key` at `now`, if it is charge-based.
    pub fn charges(&self, key: CooldownKey, now: Tick) -> Option<u32> {
        self.entries.get(&key)?.charges(now).map(|c| c.available)
    }

    pub fn is_ready(&self, key: CooldownKey, now: Tick) -> bool {
        self.entries.get(&key).is_none_or(|e| e.is_ready(now))
    }

    pub fn entry(&self, key: CooldownKey) -> Option<&CooldownEntry> {
        self.entries.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CooldownKey, &CooldownEntry)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SPELL: CooldownKey = CooldownKey::Ability(AbilityId(100));
    const CHARGES: CooldownKey = CooldownKey::Category(CategoryId(7));

    #[test]
    fn negative_delta_beyond_remaining_makes_entry_ready() {
        let mut cds = CooldownManager::new();
        cds.start_cooldown(SPELL, 8_000, Tick(0));

        assert_eq!(cds.modify_cooldown(SPELL, -3_000, Tick(1_000)), Some(4_000));
        assert_eq!(cds.modify_cooldown(SPELL, -10_000, Tick(1_000)), Some(0));
        assert!(cds.is_ready(SPELL, Tick(1_000)));
        assert!(cds.try_use(SPELL, Tick(1_000)).is_ok());
    }

    #[test]
    fn positive_delta_extends_from_now() {
        let mut cds = CooldownManager::new();
        cds.start_cooldown(SPELL, 1_000, Tick(0));
        assert_eq!(cds.modify_cooldown(SPELL, 500, Tick(2_000)), Some(500));
        assert_eq!(cds.remaining(SPELL, Tick(2_200)), 300);
    }

    #[test]
    fn try_use_restarts_base_cooldown() {
        let mut cds = CooldownManager::new();
        cds.start_cooldown(SPELL, 6_000, Tick(0));

        assert_eq!(
            cds.try_use(SPELL, Tick(5_000)),
            Err(CooldownError::NotReady {
                key: SPELL,
                remaining: 1_000
            })
        );
        assert!(cds.try_use(SPELL, Tick(6_000)).is_ok());
        assert_eq!(cds.remaining(SPELL, Tick(6_000)), 6_000);
    }

    #[test]
    fn charges_recover_one_at_a_time() {
        let mut cds = CooldownManager::new();
        cds.define_charges(CHARGES, 2, 10_000);

        assert!(cds.try_use(CHARGES, Tick(0)).is_ok());
        assert!(cds.try_use(CHARGES, Tick(1_000)).is_ok());
        assert_eq!(
            cds.try_use(CHARGES, Tick(2_000)),
            Err(CooldownError::NoCharges { key: CHARGES })
        );

        // First recovery started at the first use.
        assert_eq!(cds.charges(CHARGES, Tick(9_999)), Some(0));
        assert_eq!(cds.charges(CHARGES, Tick(10_000)), Some(1));
        assert_eq!(cds.charges(CHARGES, Tick(20_000)), Some(2));
    }

    #[test]
    fn charge_entry_is_usable_during_usage_cooldown() {
        let mut cds = CooldownManager::new();
        cds.define_charges(CHARGES, 2, 10_000);
        cds.start_cooldown(CHARGES, 3_000, Tick(0));

        assert!(cds.remaining(CHARGES, Tick(0)) > 0);
        assert!(cds.is_ready(CHARGES, Tick(0)));
        assert!(cds.try_use(CHARGES, Tick(0)).is_ok());
    }

    #[test]
    fn restore_charge_caps_and_keeps_recovering_missing_charges() {
        let mut cds = CooldownManager::new();
        cds.define_charges(CHARGES, 3, 9_000);
        for _ in 0..3 {
            cds.try_use(CHARGES, Tick(0)).unwrap();
        }

        assert_eq!(cds.restore_charge(CHARGES, Tick(1_000)), Some(1));
        let entry = cds.entry(CHARGES).unwrap();
        assert_eq!(
            entry.charges(Tick(1_000)).unwrap().recovery_ready_at(),
            Some(Tick(9_000))
        );

        assert_eq!(cds.restore_charge(CHARGES, Tick(1_000)), Some(2));
        assert_eq!(cds.restore_charge(CHARGES, Tick(1_000)), Some(3));
        assert_eq!(cds.restore_charge(CHARGES, Tick(1_000)), Some(3));
        assert_eq!(
            cds.entry(CHARGES).unwrap().charges(Tick(1_000)).unwrap().recovery_ready_at(),
            None
        );
    }

    #[test]
    fn charge_recovery_and_usage_cooldown_are_independent() {
        let mut cds = CooldownManager::new();
        cds.define_charges(CHARGES, 2, 10_000);
        cds.start_cooldown(CHARGES, 4_000, Tick(0));
        cds.try_use(CHARGES, Tick(0)).unwrap();

        cds.modify_charge_recovery(CHARGES, -6_000, Tick(1_000));
        assert_eq!(cds.remaining(CHARGES, Tick(1_000)), 3_000);
        assert_eq!(cds.charges(CHARGES, Tick(3_999)), Some(1));
        assert_eq!(cds.charges(CHARGES, Tick(4_000)), Some(2));

        cds.try_use(CHARGES, Tick(5_000)).unwrap();
        cds.reset_cooldown(CHARGES, Tick(5_000), false);
        assert_eq!(cds.remaining(CHARGES, Tick(5_000)), 0);
        assert_eq!(cds.charges(CHARGES, Tick(5_000)), Some(1));
    }

    #[test]
    fn reset_can_restore_a_charge() {
        let mut cds = CooldownManager::new();
        cds.define_charges(CHARGES, 2, 10_000);
        cds.try_use(CHARGES, Tick(0)).unwrap();
        assert!(cds.reset_cooldown(CHARGES, Tick(100), true));
        assert_eq!(cds.charges(CHARGES, Tick(100)), Some(2));
    }

    #[test]
    fn untracked_keys_are_ready_and_unmodified() {
        let mut cds = CooldownManager::new();
        assert!(cds.is_ready(SPELL, Tick(0)));
        assert_eq!(cds.modify_cooldown(SPELL, 1_000, Tick(0)), None);
        assert_eq!(cds.restore_charge(SPELL, Tick(0)), None);
        assert!(!cds.reset_cooldown(SPELL, Tick(0), true));
    }

    #[derive(Clone, Debug)]
    enum ChargeOp {
        Use(u64),
        Restore(u64),
        Recovery(u64, i64),
    }

    fn charge_op() -> impl Strategy<Value = ChargeOp> {
        prop_oneof![
            (0u64..2_000).prop_map(ChargeOp::Use),
            (0u64..2_000).prop_map(ChargeOp::Restore),
            (0u64..2_000, -20_000i64..20_000).prop_map(|(t, d)| ChargeOp::Recovery(t, d)),
        ]
    }

    proptest! {
        #[test]
        fn charges_stay_within_bounds(
            maximum in 1u32..5,
            recovery in 0u64..15_000,
            ops in proptest::collection::vec(charge_op(), 0..60),
        ) {
            let mut cds = CooldownManager::new();
            cds.define_charges(CHARGES, maximum, recovery);
            let mut now = Tick::ZERO;

            for op in ops {
                match op {
                    ChargeOp::Use(step) => {
                        now = now + step;
                        let _ = cds.try_use(CHARGES, now);
                    }
                    ChargeOp::Restore(step) => {
                        now = now + step;
                        cds.restore_charge(CHARGES, now);
                    }
                    ChargeOp::Recovery(step, delta) => {
                        now = now + step;
                        cds.modify_charge_recovery(CHARGES, delta, now);
                    }
                }
                let available = cds.charges(CHARGES, now).unwrap();
                prop_assert!(available <= maximum);
            }
        }

        #[test]
        fn remaining_cooldown_is_floored(
            start in 0u64..30_000,
            deltas in proptest::collection::vec(-40_000i64..40_000, 0..30),
        ) {
            let mut cds = CooldownManager::new();
            cds.start_cooldown(SPELL, start, Tick::ZERO);
            let mut expected = start as i64;
            for delta in deltas {
                let remaining = cds.modify_cooldown(SPELL, delta, Tick::ZERO).unwrap();
                expected = (expected + delta).max(0);
                prop_assert_eq!(remaining as i64, expected);
                prop_assert_eq!(cds.is_ready(SPELL, Tick::ZERO), expected == 0);
            }
        }
    }
}
