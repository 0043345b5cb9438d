use super::slot::SlotDefinition;
use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::types::AuraId;

/// Static description of an aura, shared by all of its instances.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuraDefinition {
    pub id: AuraId,
    pub name: String,
    /// Maximum (and initial) duration in milliseconds; `None` is permanent.
    pub max_duration: Option<u64>,
    pub max_stack: u32,
    /// Key instances by caster as well as by owner and definition.
    pub per_caster: bool,
    /// Applying this aura removes every other aura of the same group on the
    /// owner.
    pub exclusive_group: Option<u32>,
    pub slots: Vec<SlotDefinition>,
}

impl AuraDefinition {
    pub fn new(id: AuraId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            max_duration: None,
            max_stack: 1,
            per_caster: false,
            exclusive_group: None,
            slots: Vec::new(),
        }
    }

    #[must_use]
    pub fn duration(mut self, millis: u64) -> Self {
        self.max_duration = Some(millis);
        self
    }

    #[must_use]
    pub fn max_stack(mut self, max_stack: u32) -> Self {
        self.max_stack = max_stack;
        self
    }

    #[must_use]
    pub fn per_caster(mut self) -> Self {
        self.per_caster = true;
        self
    }

    #[must_use]
    pub fn exclusive_group(mut self, group: u32) -> Self {
        self.exclusive_group = Some(group);
        self
    }

    #[must_use]
    pub fn slot(mut self, slot: SlotDefinition) -> Self {
        self.slots.push(slot);
        self
    }

    pub fn slot_at(&self, index: u8) -> Option<&SlotDefinition> {
        self.slots.get(usize::from(index))
    }

    pub fn is_stackable(&self) -> bool {
        self.max_stack > 1
    }

    /// Checks the definition for internal consistency.
    ///
    /// Catalog lookups (does the trigger ability exist?) are done by the
    /// runtime registry, which knows the host.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let definition = self.id;

        if self.max_stack == 0 {
            return Err(ConfigError::ZeroMaxStack { definition });
        }
        if self.slots.len() > EngineConfig::MAX_EFFECT_SLOTS {
            return Err(ConfigError::TooManySlots {
                definition,
                count: self.slots.len(),
                limit: EngineConfig::MAX_EFFECT_SLOTS,
            });
        }

        for (index, slot) in self.slots.iter().enumerate() {
            // Bounded by MAX_EFFECT_SLOTS above.
            let slot_index = index as u8;

            let has_period = slot.period.is_some_and(|p| p > 0);
            if (slot.kind.requires_period() || slot.period.is_some()) && !has_period {
                return Err(ConfigError::MissingPeriod {
                    definition,
                    slot: slot_index,
                });
            }
            if slot.kind.requires_trigger() && slot.trigger.is_none() {
                return Err(ConfigError::MissingTriggerAbility {
                    definition,
                    slot: slot_index,
                });
            }
            if slot.kind.requires_proc() && slot.proc.is_none() {
                return Err(ConfigError::MissingProcSpec {
                    definition,
                    slot: slot_index,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::EffectKind;
    use crate::event::EventMask;
    use crate::proc::ProcSpec;
    use crate::types::AbilityId;

    #[test]
    fn valid_definition_passes() {
        let def = AuraDefinition::new(AuraId(1), "Renewing Mist")
            .duration(20_000)
            .slot(
                SlotDefinition::new(EffectKind::PeriodicHeal)
                    .amount(100)
                    .period(2_000)
                    .trigger(AbilityId(119611)),
            );
        assert_eq!(def.validate(), Ok(()));
    }

    #[test]
    fn zero_period_is_rejected() {
        let def = AuraDefinition::new(AuraId(2), "Broken")
            .slot(SlotDefinition::new(EffectKind::Dummy).period(0));
        assert_eq!(
            def.validate(),
            Err(ConfigError::MissingPeriod {
                definition: AuraId(2),
                slot: 0
            })
        );
    }

    #[test]
    fn accumulate_needs_trigger_and_proc() {
        let base = SlotDefinition::new(EffectKind::Accumulate { percent: 20 }).period(1_000);

        let no_trigger = AuraDefinition::new(AuraId(3), "Echo").slot(base.clone());
        assert!(matches!(
            no_trigger.validate(),
            Err(ConfigError::MissingTriggerAbility { slot: 0, .. })
        ));

        let no_proc =
            AuraDefinition::new(AuraId(3), "Echo").slot(base.clone().trigger(AbilityId(5)));
        assert!(matches!(
            no_proc.validate(),
            Err(ConfigError::MissingProcSpec { slot: 0, .. })
        ));

        let ok = AuraDefinition::new(AuraId(3), "Echo").slot(
            base.trigger(AbilityId(5))
                .proc(ProcSpec::on(EventMask::DAMAGE_DEALT)),
        );
        assert_eq!(ok.validate(), Ok(()));
    }

    #[test]
    fn slot_and_stack_limits() {
        let mut def = AuraDefinition::new(AuraId(4), "Wide").max_stack(0);
        assert_eq!(
            def.validate(),
            Err(ConfigError::ZeroMaxStack {
                definition: AuraId(4)
            })
        );

        def.max_stack = 1;
        for _ in 0..=EngineConfig::MAX_EFFECT_SLOTS {
            def.slots.push(SlotDefinition::new(EffectKind::Dummy));
        }
        assert!(matches!(
            def.validate(),
            Err(ConfigError::TooManySlots { .. })
        ));
    }
}
