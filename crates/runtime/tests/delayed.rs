//! Delayed effects and the clock.
mod common;

use combat_core::{
    AbilityId, ApplyMode, AuraDefinition, AuraId, AuraQuery, EffectKind, FixedRolls,
    RemovalFilter, RemoveReason, SlotDefinition, Tick,
};
use combat_runtime::{
    AuraScript, DispatchRequest, Liveness, RuntimeConfig, TraceOutcome, TracePhase, TraceSource,
};

use common::{ENEMY, Journal, PLAYER, engine, engine_with};

const CURSE: AuraId = AuraId(20);
const DEBUFF: AuraId = AuraId(21);
const RENEW: AuraId = AuraId(22);

fn curse_scheduling(liveness: Liveness) -> AuraScript {
    AuraScript::new("delayed_curse", CURSE).on_apply(
        0,
        ApplyMode::RealOnly,
        move |ctx, _| {
            ctx.schedule_after(
                300,
                liveness,
                DispatchRequest::ApplyAura {
                    target: ENEMY,
                    definition: DEBUFF,
                    caster: Some(ctx.owner()),
                },
            );
            Ok(())
        },
    )
}

fn definitions() -> [AuraDefinition; 2] {
    [
        AuraDefinition::new(CURSE, "Curse").slot(SlotDefinition::new(EffectKind::Dummy)),
        AuraDefinition::new(DEBUFF, "Debuff").slot(SlotDefinition::new(EffectKind::Dummy)),
    ]
}

#[test]
fn fire_always_outlives_its_aura() {
    let (mut engine, _log) = engine(definitions(), [curse_scheduling(Liveness::FireAlways)]);
    let curse = engine.apply_aura(PLAYER, CURSE, None).unwrap();
    assert_eq!(engine.pending_delayed(), 1);

    engine.advance_to(Tick(100));
    engine
        .remove_aura(curse, RemoveReason::ExplicitCancel)
        .unwrap();
    engine.advance_to(Tick(300));

    assert_eq!(engine.pending_delayed(), 0);
    let debuffs = engine
        .world()
        .auras_on(ENEMY)
        .filter(|a| a.definition() == DEBUFF)
        .count();
    assert_eq!(debuffs, 1);
}

#[test]
fn require_owner_is_dropped_with_its_aura() {
    let (mut engine, _log) = engine(definitions(), [curse_scheduling(Liveness::RequireOwner)]);
    let curse = engine.apply_aura(PLAYER, CURSE, None).unwrap();

    engine.advance_to(Tick(100));
    engine
        .remove_aura(curse, RemoveReason::ExplicitCancel)
        .unwrap();
    engine.clear_trace();
    engine.advance_to(Tick(300));

    assert_eq!(engine.world().auras_on(ENEMY).count(), 0);
    let skipped: Vec<_> = engine
        .trace()
        .entries()
        .filter(|e| e.phase == TracePhase::Delayed)
        .map(|e| (e.source, e.outcome, e.aura))
        .collect();
    assert_eq!(
        skipped,
        vec![(TraceSource::Scheduler, TraceOutcome::Skipped, Some(curse))]
    );
}

#[test]
fn require_owner_fires_while_the_aura_lives() {
    let (mut engine, _log) = engine(definitions(), [curse_scheduling(Liveness::RequireOwner)]);
    engine.apply_aura(PLAYER, CURSE, None).unwrap();

    engine.advance_to(Tick(299));
    assert_eq!(engine.world().auras_on(ENEMY).count(), 0);
    engine.advance_to(Tick(300));
    assert_eq!(engine.world().auras_on(ENEMY).count(), 1);
}

#[test]
fn same_instant_effects_run_in_schedule_order() {
    let journal = Journal::default();
    let (mut engine, _log) = engine(definitions(), []);

    for label in ["first", "second", "third"] {
        let journal = journal.clone();
        engine.schedule_after(
            PLAYER,
            500,
            Liveness::FireAlways,
            combat_runtime::DelayedAction::callback(move |_| {
                journal.push(label);
                Ok(())
            }),
        );
    }
    let early = journal.clone();
    engine.schedule_after(
        PLAYER,
        200,
        Liveness::FireAlways,
        combat_runtime::DelayedAction::callback(move |_| {
            early.push("early");
            Ok(())
        }),
    );

    engine.advance_to(Tick(1_000));
    assert_eq!(journal.entries(), vec!["early", "first", "second", "third"]);
}

#[test]
fn cancelled_effects_never_run() {
    let journal = Journal::default();
    let (mut engine, _log) = engine(definitions(), []);
    let handle = {
        let journal = journal.clone();
        engine.schedule_after(
            PLAYER,
            100,
            Liveness::FireAlways,
            combat_runtime::DelayedAction::callback(move |_| {
                journal.push("ran");
                Ok(())
            }),
        )
    };

    assert!(engine.cancel(handle));
    assert!(!engine.cancel(handle));
    engine.advance_to(Tick(1_000));
    assert!(journal.entries().is_empty());
}

#[test]
fn actor_owned_effect_needs_a_living_actor() {
    let (mut engine, log) = engine(definitions(), []);
    engine.schedule_after(
        ENEMY,
        250,
        Liveness::RequireOwner,
        DispatchRequest::Despawn { actor: ENEMY },
    );
    engine.actor_died(ENEMY).unwrap();
    engine.advance_by(250);
    assert!(log.calls().is_empty());
}

#[test]
fn callbacks_chain_through_the_clock() {
    let journal = Journal::default();
    let script = {
        let journal = journal.clone();
        AuraScript::new("echo", CURSE).on_apply(0, ApplyMode::RealOnly, move |ctx, _| {
            let journal = journal.clone();
            ctx.schedule_callback(100, Liveness::RequireOwner, move |ctx| {
                journal.push(format!("tick@{}", ctx.now().as_millis()));
                let journal = journal.clone();
                ctx.schedule_callback(100, Liveness::RequireOwner, move |ctx| {
                    journal.push(format!("tock@{}", ctx.now().as_millis()));
                    Ok(())
                });
                Ok(())
            });
            Ok(())
        })
    };
    let (mut engine, _log) = engine(definitions(), [script]);
    engine.apply_aura(PLAYER, CURSE, None).unwrap();

    // Both run within one advance: the second is scheduled while the clock
    // is still catching up.
    engine.advance_to(Tick(500));
    assert_eq!(journal.entries(), vec!["tick@100", "tock@200"]);
    assert_eq!(engine.now(), Tick(500));
}

#[test]
fn time_never_moves_backwards() {
    let (mut engine, _log) = engine(definitions(), []);
    engine.advance_to(Tick(1_000));
    engine.advance_to(Tick(400));
    assert_eq!(engine.now(), Tick(1_000));
}

#[test]
fn periodic_heal_ticks_through_its_duration() {
    const HEAL: AbilityId = AbilityId(139);
    let renew = AuraDefinition::new(RENEW, "Renew").duration(15_000).slot(
        SlotDefinition::new(EffectKind::PeriodicHeal)
            .amount(45)
            .period(3_000)
            .trigger(HEAL),
    );
    let (mut engine, log) = engine([renew], []);
    let handle = engine.apply_aura(ENEMY, RENEW, Some(PLAYER)).unwrap();

    engine.advance_to(Tick(20_000));

    let heals = log.casts_of(HEAL);
    assert_eq!(heals.len(), 5);
    assert!(heals.iter().all(|cast| cast.caster == PLAYER && cast.target == ENEMY));
    assert!(heals.iter().all(|cast| cast.options.base_point(0) == Some(45)));
    assert!(engine.world().aura(handle).is_none());
}

#[test]
fn expiry_hook_may_remove_a_sibling_due_at_the_same_instant() {
    const TWIN: AuraId = AuraId(23);
    let journal = Journal::default();
    let elder = {
        let journal = journal.clone();
        AuraScript::new("elder", CURSE).on_remove(0, RemovalFilter::all(), move |ctx, reason| {
            journal.push(format!("curse:{reason}"));
            if let Some(twin) = ctx.world().find_aura(ctx.owner(), TWIN) {
                ctx.remove_aura(twin, RemoveReason::ExplicitCancel)?;
            }
            Ok(())
        })
    };
    let younger = {
        let journal = journal.clone();
        AuraScript::new("younger", TWIN).on_remove(0, RemovalFilter::all(), move |_, reason| {
            journal.push(format!("twin:{reason}"));
            Ok(())
        })
    };
    let slot = || SlotDefinition::new(EffectKind::Dummy);
    let (mut engine, _log) = engine_with(
        RuntimeConfig::default().with_strict_invariants(true),
        FixedRolls::new([0]),
        [
            AuraDefinition::new(CURSE, "Curse").duration(1_000).slot(slot()),
            AuraDefinition::new(TWIN, "Twin").duration(1_000).slot(slot()),
        ],
        [elder, younger],
    );
    engine.apply_aura(PLAYER, CURSE, None).unwrap();
    engine.apply_aura(PLAYER, TWIN, None).unwrap();

    engine.advance_to(Tick(1_000));

    assert_eq!(journal.entries(), vec!["curse:expired", "twin:explicit_cancel"]);
    assert_eq!(engine.world().auras_on(PLAYER).count(), 0);
    assert_eq!(engine.world().aura_count(), 0);
}
