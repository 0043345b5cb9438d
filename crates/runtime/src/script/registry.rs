//! Definition and script registry with registration-time validation.

use std::collections::BTreeMap;

use combat_core::{AbilityCatalog, AuraDefinition, AuraId, ConfigError, EngineError};
use tracing::{debug, error};

use super::{
    ApplyHook, AuraScript, CalcAmountHook, CheckProcHook, PeriodicHook, ProcHook, RemoveHook,
    SlotHook,
};

/// A definition or script refused at registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    pub name: String,
    pub error: ConfigError,
}

/// Owns every aura definition and the scripts attached to them.
///
/// Nothing registered here changes while events are being dispatched, so the
/// dispatcher holds it by shared reference for the whole pass.
#[derive(Default)]
pub struct ScriptRegistry {
    definitions: BTreeMap<AuraId, AuraDefinition>,
    scripts: BTreeMap<AuraId, Vec<AuraScript>>,
    catalog: Option<Box<dyn AbilityCatalog>>,
    rejected: Vec<Rejection>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables ability lookups during validation.
    pub fn with_catalog(mut self, catalog: impl AbilityCatalog + 'static) -> Self {
        self.catalog = Some(Box::new(catalog));
        self
    }

    pub(crate) fn set_catalog(&mut self, catalog: Box<dyn AbilityCatalog>) {
        self.catalog = Some(catalog);
    }

    pub fn register_definition(&mut self, definition: AuraDefinition) -> Result<(), ConfigError> {
        let name = definition.name.clone();
        match self.validate_definition(&definition) {
            Ok(()) => {
                debug!(
                    target: "runtime::scripts",
                    definition = %definition.id,
                    name = %name,
                    slots = definition.slots.len(),
                    "registered aura definition"
                );
                self.definitions.insert(definition.id, definition);
                Ok(())
            }
            Err(e) => Err(self.reject(name, e)),
        }
    }

    pub fn register_script(&mut self, script: AuraScript) -> Result<(), ConfigError> {
        match self.validate_script(&script) {
            Ok(()) => {
                debug!(
                    target: "runtime::scripts",
                    script = script.name(),
                    definition = %script.definition(),
                    "registered aura script"
                );
                self.scripts
                    .entry(script.definition())
                    .or_default()
                    .push(script);
                Ok(())
            }
            Err(e) => Err(self.reject(script.name().to_owned(), e)),
        }
    }

    pub fn definition(&self, id: AuraId) -> Option<&AuraDefinition> {
        self.definitions.get(&id)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &AuraDefinition> {
        self.definitions.values()
    }

    /// Scripts attached to `definition`, in registration order.
    pub fn scripts_for(&self, definition: AuraId) -> &[AuraScript] {
        self.scripts.get(&definition).map_or(&[], Vec::as_slice)
    }

    pub fn rejected(&self) -> &[Rejection] {
        &self.rejected
    }

    pub(crate) fn apply_hooks(
        &self,
        definition: AuraId,
        slot: u8,
    ) -> impl Iterator<Item = (&AuraScript, &ApplyHook)> {
        self.hooks(definition, slot, |s| &s.apply)
    }

    pub(crate) fn remove_hooks(
        &self,
        definition: AuraId,
        slot: u8,
    ) -> impl Iterator<Item = (&AuraScript, &RemoveHook)> {
        self.hooks(definition, slot, |s| &s.remove)
    }

    pub(crate) fn periodic_hooks(
        &self,
        definition: AuraId,
        slot: u8,
    ) -> impl Iterator<Item = (&AuraScript, &PeriodicHook)> {
        self.hooks(definition, slot, |s| &s.periodic)
    }

    pub(crate) fn proc_hooks(
        &self,
        definition: AuraId,
        slot: u8,
    ) -> impl Iterator<Item = (&AuraScript, &ProcHook)> {
        self.hooks(definition, slot, |s| &s.proc)
    }

    pub(crate) fn check_proc_hooks(
        &self,
        definition: AuraId,
        slot: u8,
    ) -> impl Iterator<Item = (&AuraScript, &CheckProcHook)> {
        self.hooks(definition, slot, |s| &s.check_proc)
    }

    pub(crate) fn calc_amount_hooks(
        &self,
        definition: AuraId,
        slot: u8,
    ) -> impl Iterator<Item = (&AuraScript, &CalcAmountHook)> {
        self.hooks(definition, slot, |s| &s.calc_amount)
    }

    fn hooks<'a, H: SlotHook + 'a>(
        &'a self,
        definition: AuraId,
        slot: u8,
        select: impl Fn(&'a AuraScript) -> &'a Vec<H> + 'a,
    ) -> impl Iterator<Item = (&'a AuraScript, &'a H)> + 'a {
        self.scripts_for(definition)
            .iter()
            .flat_map(move |script| select(script).iter().map(move |hook| (script, hook)))
            .filter(move |(_, hook)| hook.slot() == slot)
    }

    fn validate_definition(&self, definition: &AuraDefinition) -> Result<(), ConfigError> {
        if self.definitions.contains_key(&definition.id) {
            return Err(ConfigError::DuplicateDefinition {
                definition: definition.id,
            });
        }
        definition.validate()?;

        for slot in &definition.slots {
            if let Some(ability) = slot.trigger {
                self.check_ability(definition.id, ability)?;
            }
            if let Some(spec) = &slot.proc {
                for ability in &spec.abilities {
                    self.check_ability(definition.id, *ability)?;
                }
            }
        }
        Ok(())
    }

    fn validate_script(&self, script: &AuraScript) -> Result<(), ConfigError> {
        let definition = script.definition();
        let def = self
            .definitions
            .get(&definition)
            .ok_or(ConfigError::UnknownDefinition { definition })?;

        if let Some(slot) = script
            .slots()
            .find(|slot| usize::from(*slot) >= def.slots.len())
        {
            return Err(ConfigError::SlotOutOfRange { definition, slot });
        }

        for ability in script.referenced_abilities() {
            self.check_ability(definition, *ability)?;
        }
        Ok(())
    }

    fn check_ability(
        &self,
        definition: AuraId,
        ability: combat_core::AbilityId,
    ) -> Result<(), ConfigError> {
        match &self.catalog {
            Some(catalog) if !catalog.contains(ability) => {
                Err(ConfigError::UnknownAbility {
                    definition,
                    ability,
                })
            }
            _ => Ok(()),
        }
    }

    fn reject(&mut self, name: String, error: ConfigError) -> ConfigError {
        error!(
            target: "runtime::scripts",
            name = %name,
            code = error.error_code(),
            error = %error,
            "registration rejected"
        );
        self.rejected.push(Rejection {
            name,
            error: error.clone(),
        });
        error
    }
}

impl std::fmt::Debug for ScriptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRegistry")
            .field("definitions", &self.definitions.len())
            .field("scripts", &self.scripts)
            .field("rejected", &self.rejected)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use combat_core::{AbilityId, ApplyMode, EffectKind, EventMask, ProcSpec, SlotDefinition};

    fn periodic_def(id: u32, trigger: u32) -> AuraDefinition {
        AuraDefinition::new(AuraId(id), "Renew").duration(15_000).slot(
            SlotDefinition::new(EffectKind::PeriodicHeal)
                .amount(50)
                .period(3_000)
                .trigger(AbilityId(trigger)),
        )
    }

    fn catalog() -> BTreeSet<AbilityId> {
        [AbilityId(100), AbilityId(101)].into_iter().collect()
    }

    #[test]
    fn unknown_trigger_ability_is_rejected() {
        let mut registry = ScriptRegistry::new().with_catalog(catalog());
        assert!(registry.register_definition(periodic_def(1, 100)).is_ok());
        assert_eq!(
            registry.register_definition(periodic_def(2, 999)),
            Err(ConfigError::UnknownAbility {
                definition: AuraId(2),
                ability: AbilityId(999)
            })
        );
        assert_eq!(registry.rejected().len(), 1);
        assert!(registry.definition(AuraId(2)).is_none());
    }

    #[test]
    fn unknown_proc_filter_ability_is_rejected() {
        let filtered = |id: u32, ability: u32| {
            AuraDefinition::new(AuraId(id), "Focus").slot(
                SlotDefinition::new(EffectKind::Dummy).proc(
                    ProcSpec::on(EventMask::CAST_COMPLETE).only_abilities([AbilityId(ability)]),
                ),
            )
        };
        let mut registry = ScriptRegistry::new().with_catalog(catalog());

        assert!(registry.register_definition(filtered(1, 101)).is_ok());
        assert_eq!(
            registry.register_definition(filtered(2, 404)),
            Err(ConfigError::UnknownAbility {
                definition: AuraId(2),
                ability: AbilityId(404)
            })
        );
        assert!(registry.definition(AuraId(2)).is_none());
    }

    #[test]
    fn duplicate_definition_is_rejected() {
        let mut registry = ScriptRegistry::new();
        registry.register_definition(periodic_def(1, 100)).unwrap();
        assert_eq!(
            registry.register_definition(periodic_def(1, 100)),
            Err(ConfigError::DuplicateDefinition {
                definition: AuraId(1)
            })
        );
    }

    #[test]
    fn script_validation() {
        let mut registry = ScriptRegistry::new().with_catalog(catalog());
        registry.register_definition(periodic_def(1, 100)).unwrap();

        let orphan = AuraScript::new("orphan", AuraId(42));
        assert_eq!(
            registry.register_script(orphan),
            Err(ConfigError::UnknownDefinition {
                definition: AuraId(42)
            })
        );

        let wide = AuraScript::new("wide", AuraId(1)).on_periodic(3, |_| Ok(()));
        assert_eq!(
            registry.register_script(wide),
            Err(ConfigError::SlotOutOfRange {
                definition: AuraId(1),
                slot: 3
            })
        );

        let stray = AuraScript::new("stray", AuraId(1)).references([AbilityId(555)]);
        assert!(matches!(
            registry.register_script(stray),
            Err(ConfigError::UnknownAbility { .. })
        ));

        let good = AuraScript::new("good", AuraId(1))
            .references([AbilityId(101)])
            .on_apply(0, ApplyMode::RealOnly, |_, _| Ok(()));
        assert!(registry.register_script(good).is_ok());

        assert_eq!(registry.scripts_for(AuraId(1)).len(), 1);
        assert_eq!(registry.apply_hooks(AuraId(1), 0).count(), 1);
        assert_eq!(registry.apply_hooks(AuraId(1), 1).count(), 0);
        let rejected: Vec<&str> = registry.rejected().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(rejected, vec!["orphan", "wide", "stray"]);
    }
}
