//! Registration, secondary effects and cooldown bookkeeping.
mod common;

use std::collections::BTreeSet;

use combat_core::{
    AbilityId, AuraDefinition, AuraId, CastFailure, CombatEvent, ConfigError, CooldownKey,
    EffectKind, EventMask, FixedRolls, ProcSpec, ResourceKind, SlotDefinition, Tick,
};
use combat_runtime::{
    AuraScript, DispatchOutcome, DispatchRequest, ProcEngine, ReactionError, RuntimeConfig,
    RuntimeError,
};

use common::{ENEMY, Journal, PLAYER, RecordingHost, actors, engine};

const SEAL: AuraId = AuraId(30);
const TAP: AuraId = AuraId(31);
const STRIKE: AbilityId = AbilityId(300);
const SURGE: AbilityId = AbilityId(301);

fn seal() -> AuraDefinition {
    AuraDefinition::new(SEAL, "Seal").slot(
        SlotDefinition::new(EffectKind::ProcTrigger)
            .trigger(STRIKE)
            .proc(ProcSpec::on(EventMask::DAMAGE_DEALT)),
    )
}

fn on_cast(id: AuraId) -> AuraDefinition {
    AuraDefinition::new(id, "On cast").slot(
        SlotDefinition::new(EffectKind::Dummy).proc(ProcSpec::on(EventMask::CAST_COMPLETE)),
    )
}

#[test]
fn builder_rejects_invalid_registrations_one_by_one() {
    let (host, _log) = RecordingHost::new();
    let catalog: BTreeSet<AbilityId> = [STRIKE].into_iter().collect();
    let unknown_trigger = AuraDefinition::new(TAP, "Tap").slot(
        SlotDefinition::new(EffectKind::ProcTrigger)
            .trigger(AbilityId(999))
            .proc(ProcSpec::on(EventMask::DAMAGE)),
    );

    let engine = ProcEngine::builder()
        .config(RuntimeConfig::default().with_strict_invariants(false))
        .host(host)
        .catalog(catalog)
        .definition(seal())
        .definition(seal())
        .definition(unknown_trigger)
        .script(AuraScript::new("orphan", AuraId(404)))
        .script(AuraScript::new("bad_slot", SEAL).on_proc(3, |_, _| Ok(())))
        .script(AuraScript::new("bad_reference", SEAL).references([SURGE]))
        .script(AuraScript::new("fine", SEAL).references([STRIKE]))
        .build()
        .unwrap();

    let rejected: Vec<(&str, &ConfigError)> = engine
        .rejected_scripts()
        .iter()
        .map(|r| (r.name.as_str(), &r.error))
        .collect();
    assert_eq!(
        rejected,
        vec![
            ("Seal", &ConfigError::DuplicateDefinition { definition: SEAL }),
            (
                "Tap",
                &ConfigError::UnknownAbility {
                    definition: TAP,
                    ability: AbilityId(999)
                }
            ),
            (
                "orphan",
                &ConfigError::UnknownDefinition {
                    definition: AuraId(404)
                }
            ),
            (
                "bad_slot",
                &ConfigError::SlotOutOfRange {
                    definition: SEAL,
                    slot: 3
                }
            ),
            (
                "bad_reference",
                &ConfigError::UnknownAbility {
                    definition: SEAL,
                    ability: SURGE
                }
            ),
        ]
    );
    assert_eq!(engine.registry().scripts_for(SEAL).len(), 1);
    assert!(engine.registry().definition(TAP).is_none());
}

#[test]
fn build_requires_a_host() {
    let result = ProcEngine::builder().build();
    assert!(matches!(result, Err(RuntimeError::MissingHost)));
}

#[test]
fn duplicate_actors_are_refused() {
    let (mut engine, _log) = engine([seal()], []);
    let [player, _] = actors();
    assert!(matches!(
        engine.add_actor(player),
        Err(RuntimeError::DuplicateActor(id)) if id == PLAYER
    ));
}

#[test]
fn proc_cast_carries_its_origin() {
    let (mut engine, log) = engine([seal()], []);
    let handle = engine.apply_aura(PLAYER, SEAL, None).unwrap();

    engine
        .publish(PLAYER, CombatEvent::damage_dealt(PLAYER, ENEMY, 100))
        .unwrap();

    let casts = log.casts_of(STRIKE);
    assert_eq!(casts.len(), 1);
    let origin = casts[0].options.origin.unwrap();
    assert_eq!(origin.aura, Some(SEAL));
    assert_eq!(origin.handle, Some(handle));
    assert_eq!(origin.ability, None);
    // No base point when the slot amount is zero.
    assert_eq!(casts[0].options.base_point(0), None);

    const FIREBALL: AbilityId = AbilityId(302);
    engine
        .publish(
            PLAYER,
            CombatEvent::damage_dealt(PLAYER, ENEMY, 100).with_ability(FIREBALL),
        )
        .unwrap();
    let casts = log.casts_of(STRIKE);
    assert_eq!(casts.len(), 2);
    assert_eq!(casts[1].options.origin.unwrap().ability, Some(FIREBALL));
}

#[test]
fn refused_cast_surfaces_as_a_reaction_error() {
    let journal = Journal::default();
    let script = {
        let journal = journal.clone();
        AuraScript::new("surge", TAP).on_proc(0, move |ctx, _| {
            match ctx.cast(ENEMY, SURGE) {
                Err(ReactionError::CastFailed { ability, failure }) => {
                    journal.push(format!("{ability}:{failure}"));
                }
                other => journal.push(format!("{other:?}")),
            }
            Ok(())
        })
    };
    let (host, log) = RecordingHost::new();
    let [player, enemy] = actors();
    let mut engine = ProcEngine::builder()
        .config(RuntimeConfig::default().with_strict_invariants(false))
        .host(host.refusing(SURGE))
        .rng(FixedRolls::new([0]))
        .definition(on_cast(TAP))
        .script(script)
        .actor(player)
        .actor(enemy)
        .build()
        .unwrap();
    engine.apply_aura(PLAYER, TAP, None).unwrap();

    engine
        .publish(PLAYER, CombatEvent::cast_complete(PLAYER, ENEMY, STRIKE))
        .unwrap();

    assert_eq!(log.casts_of(SURGE).len(), 1);
    assert_eq!(
        journal.entries(),
        vec![format!("{SURGE}:{}", CastFailure::InvalidTarget)]
    );
}

#[test]
fn reactions_adjust_other_actors_through_requests() {
    let script = AuraScript::new("siphon", TAP).on_proc(0, |ctx, event| {
        let victim = event.target.unwrap_or(ENEMY);
        ctx.dispatch(DispatchRequest::AdjustResource {
            actor: victim,
            kind: ResourceKind::Mana,
            delta: -15,
        })?;
        ctx.adjust_resource(ctx.owner(), ResourceKind::Mana, 15)?;
        Ok(())
    });
    let (mut engine, _log) = engine([on_cast(TAP)], [script]);
    engine.apply_aura(PLAYER, TAP, None).unwrap();

    engine
        .publish(PLAYER, CombatEvent::cast_complete(PLAYER, ENEMY, STRIKE))
        .unwrap();
    assert_eq!(engine.peek_resource(ENEMY, ResourceKind::Mana), Some(5));
    assert_eq!(engine.peek_resource(PLAYER, ResourceKind::Mana), Some(65));

    // The ledger clamps: only 5 mana was left to take.
    engine
        .publish(PLAYER, CombatEvent::cast_complete(PLAYER, ENEMY, STRIKE))
        .unwrap();
    assert_eq!(engine.peek_resource(ENEMY, ResourceKind::Mana), Some(0));
}

#[test]
fn dispatch_reports_each_kind_of_answer() {
    let (mut engine, _log) = engine([seal()], []);
    let key = CooldownKey::Ability(STRIKE);

    let applied = engine
        .dispatch(DispatchRequest::ApplyAura {
            target: PLAYER,
            definition: SEAL,
            caster: None,
        })
        .unwrap();
    assert!(matches!(applied, DispatchOutcome::Applied(_)));

    engine.start_cooldown(PLAYER, key, 8_000).unwrap();
    assert_eq!(
        engine
            .dispatch(DispatchRequest::ModifyCooldown {
                actor: PLAYER,
                key,
                delta: -3_000,
            })
            .unwrap(),
        DispatchOutcome::Remaining(Some(5_000))
    );
    assert_eq!(
        engine
            .dispatch(DispatchRequest::AdjustResource {
                actor: PLAYER,
                kind: ResourceKind::Rage,
                delta: 10,
            })
            .unwrap(),
        DispatchOutcome::Adjusted(0)
    );
    assert!(matches!(
        engine.dispatch(DispatchRequest::AdjustResource {
            actor: combat_core::ActorId(77),
            kind: ResourceKind::Mana,
            delta: 1,
        }),
        Err(RuntimeError::Precondition(_))
    ));
}

#[test]
fn reactions_shorten_and_reset_cooldowns() {
    let key = CooldownKey::Ability(STRIKE);
    let script = AuraScript::new("readiness", TAP).on_proc(0, move |ctx, event| {
        if event.magnitude >= 100 {
            ctx.reset_cooldown(ctx.owner(), key, false)?;
        } else {
            ctx.modify_cooldown(ctx.owner(), key, -2_000)?;
        }
        Ok(())
    });
    let definition = AuraDefinition::new(TAP, "Readiness").slot(
        SlotDefinition::new(EffectKind::Dummy).proc(ProcSpec::on(EventMask::DAMAGE_DEALT)),
    );
    let (mut engine, _log) = engine([definition], [script]);
    engine.apply_aura(PLAYER, TAP, None).unwrap();

    engine.start_cooldown(PLAYER, key, 10_000).unwrap();
    engine.advance_to(Tick(1_000));
    assert_eq!(engine.remaining_cooldown(PLAYER, key), Some(9_000));

    engine
        .publish(PLAYER, CombatEvent::damage_dealt(PLAYER, ENEMY, 10))
        .unwrap();
    assert_eq!(engine.remaining_cooldown(PLAYER, key), Some(7_000));

    for _ in 0..5 {
        engine
            .publish(PLAYER, CombatEvent::damage_dealt(PLAYER, ENEMY, 10))
            .unwrap();
    }
    // Floored at zero.
    assert_eq!(engine.remaining_cooldown(PLAYER, key), Some(0));

    engine.start_cooldown(PLAYER, key, 10_000).unwrap();
    engine
        .publish(PLAYER, CombatEvent::damage_dealt(PLAYER, ENEMY, 150))
        .unwrap();
    assert_eq!(engine.remaining_cooldown(PLAYER, key), Some(0));
    assert!(engine.try_use(PLAYER, key).is_ok());
}

#[test]
fn charges_recover_and_can_be_restored() {
    let key = CooldownKey::Ability(SURGE);
    let (mut engine, _log) = engine([seal()], []);
    engine.define_charges(PLAYER, key, 2, 5_000).unwrap();

    engine.try_use(PLAYER, key).unwrap();
    engine.try_use(PLAYER, key).unwrap();
    assert!(matches!(
        engine.try_use(PLAYER, key),
        Err(RuntimeError::Cooldown(_))
    ));
    assert_eq!(engine.charges(PLAYER, key), Some(0));

    engine.advance_to(Tick(5_000));
    assert_eq!(engine.charges(PLAYER, key), Some(1));

    assert_eq!(engine.restore_charge(PLAYER, key).unwrap(), Some(2));
    engine.try_use(PLAYER, key).unwrap();

    // Recovery restarted at 5 000 and is pulled in by 4 000.
    assert_eq!(
        engine.modify_charge_recovery(PLAYER, key, -4_000).unwrap(),
        Some(1)
    );
    engine.advance_to(Tick(6_000));
    assert_eq!(engine.charges(PLAYER, key), Some(2));
}

#[test]
fn untracked_cooldowns_are_ready() {
    let key = CooldownKey::Ability(AbilityId(12));
    let (mut engine, _log) = engine([seal()], []);

    assert_eq!(engine.remaining_cooldown(PLAYER, key), Some(0));
    assert_eq!(engine.modify_cooldown(PLAYER, key, 5_000).unwrap(), None);
    assert_eq!(engine.charges(PLAYER, key), None);
    assert!(engine.try_use(PLAYER, key).is_ok());
}
