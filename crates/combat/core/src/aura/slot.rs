//! Effect slots: the typed behavior units inside an aura.

use crate::proc::ProcSpec;
use crate::types::{AbilityId, Tick};

/// Host stats a [`EffectKind::StatModifier`] slot can adjust.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum StatKind {
    Strength,
    Agility,
    Intellect,
    Stamina,
    Armor,
    AttackPower,
    SpellPower,
    Haste,
    CriticalStrike,
    MovementSpeed,
    DamageTakenPercent,
    HealingDonePercent,
}

/// What a slot does when left to its built-in behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectKind {
    /// Casts the trigger ability as a heal on every period.
    PeriodicHeal,
    /// Casts the trigger ability as damage on every period.
    PeriodicDamage,
    /// Casts the trigger ability on every period.
    PeriodicTrigger,
    /// Holds an absorb amount for the host to consume. No built-in reaction.
    Absorb,
    /// Casts the trigger ability whenever the slot procs.
    ProcTrigger,
    /// Adjusts a host stat by the slot amount while the aura is present.
    StatModifier(StatKind),
    /// Collects `percent` of each proc's magnitude; flushes on its period by
    /// casting the trigger ability with the collected amount.
    Accumulate { percent: u32 },
    /// No built-in behavior; scripts supply everything.
    Dummy,
}

impl EffectKind {
    /// Kinds whose built-in behavior needs a period.
    pub fn requires_period(self) -> bool {
        matches!(
            self,
            Self::PeriodicHeal | Self::PeriodicDamage | Self::PeriodicTrigger | Self::Accumulate { .. }
        )
    }

    /// Kinds whose built-in behavior casts the slot's trigger ability.
    pub fn requires_trigger(self) -> bool {
        matches!(
            self,
            Self::PeriodicHeal
                | Self::PeriodicDamage
                | Self::PeriodicTrigger
                | Self::ProcTrigger
                | Self::Accumulate { .. }
        )
    }

    /// Kinds whose built-in behavior reacts to procs.
    pub fn requires_proc(self) -> bool {
        matches!(self, Self::ProcTrigger | Self::Accumulate { .. })
    }
}

/// How a slot amount scales with the stack count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StackScaling {
    #[default]
    None,
    Linear,
}

/// Static description of one effect slot.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotDefinition {
    pub kind: EffectKind,
    pub base_amount: i32,
    /// Tick period in milliseconds for periodic slots.
    pub period: Option<u64>,
    pub trigger: Option<AbilityId>,
    pub proc: Option<ProcSpec>,
    pub scaling: StackScaling,
}

impl SlotDefinition {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            base_amount: 0,
            period: None,
            trigger: None,
            proc: None,
            scaling: StackScaling::None,
        }
    }

    #[must_use]
    pub fn amount(mut self, amount: i32) -> Self {
        self.base_amount = amount;
        self
    }

    #[must_use]
    pub fn period(mut self, millis: u64) -> Self {
        self.period = Some(millis);
        self
    }

    #[must_use]
    pub fn trigger(mut self, ability: AbilityId) -> Self {
        self.trigger = Some(ability);
        self
    }

    #[must_use]
    pub fn proc(mut self, spec: ProcSpec) -> Self {
        self.proc = Some(spec);
        self
    }

    #[must_use]
    pub fn scale_with_stacks(mut self) -> Self {
        self.scaling = StackScaling::Linear;
        self
    }

    /// Default amount at the given stack count. Pure: same stack, same amount.
    pub fn calculate_amount(&self, stack: u32) -> i32 {
        match self.scaling {
            StackScaling::None => self.base_amount,
            StackScaling::Linear => {
                let stack = i32::try_from(stack).unwrap_or(i32::MAX);
                self.base_amount.saturating_mul(stack)
            }
        }
    }
}

/// Two-phase collector for [`EffectKind::Accumulate`] slots.
///
/// Magnitudes are kept scaled by their percentage so that several small
/// contributions are not each truncated before being summed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Accumulator {
    scaled: i64,
}

impl Accumulator {
    pub fn add(&mut self, magnitude: u32, percent: u32) {
        self.scaled = self
            .scaled
            .saturating_add(i64::from(magnitude) * i64::from(percent));
    }

    /// Amount a flush would produce right now.
    pub fn pending(&self) -> i64 {
        self.scaled / 100
    }

    /// Returns the collected amount and resets to zero.
    pub fn flush(&mut self) -> i64 {
        let amount = self.pending();
        self.scaled = 0;
        amount
    }
}

/// Mutable per-instance state of one slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotRuntime {
    pub amount: i32,
    /// Portion of `amount` currently pushed to the host (stat modifiers).
    pub applied: i32,
    pub accumulator: Accumulator,
    /// Next periodic tick, if the slot is periodic.
    pub next_tick: Option<Tick>,
    pub ticks_fired: u32,
    /// Time of the last successful proc, for internal cooldowns.
    pub last_proc_at: Option<Tick>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_then_flush() {
        let mut acc = Accumulator::default();
        for magnitude in [100, 50, 25] {
            acc.add(magnitude, 20);
        }
        assert_eq!(acc.pending(), 35);
        assert_eq!(acc.flush(), 35);
        assert_eq!(acc.flush(), 0);
    }

    #[test]
    fn fractional_contributions_are_summed_before_truncation() {
        let mut acc = Accumulator::default();
        acc.add(3, 20);
        acc.add(3, 20);
        acc.add(3, 20);
        assert_eq!(acc.flush(), 1);
    }

    #[test]
    fn amount_calculation_is_idempotent() {
        let slot = SlotDefinition::new(EffectKind::PeriodicDamage)
            .amount(120)
            .scale_with_stacks();
        assert_eq!(slot.calculate_amount(3), 360);
        assert_eq!(slot.calculate_amount(3), slot.calculate_amount(3));

        let flat = SlotDefinition::new(EffectKind::Absorb).amount(500);
        assert_eq!(flat.calculate_amount(5), 500);
    }
}
