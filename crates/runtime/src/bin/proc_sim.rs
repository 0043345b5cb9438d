//! Small scripted combat run for eyeballing engine behavior.
//!
//! ```text
//! RUST_LOG=runtime=debug PROC_ENGINE_RNG_SEED=7 cargo run -p combat-runtime --bin proc-sim
//! ```
use anyhow::Result;
use combat_core::{
    AbilityId, ActorId, ActorState, AuraDefinition, AuraId, CastOutcome, CastRequest, CombatEvent,
    EffectKind, EventMask, HostWorld, ProcChance, ProcSpec, ResourceKind, ResourceLedger,
    SlotDefinition, StatKind,
};
use combat_runtime::telemetry::init_tracing;
use combat_runtime::{AuraScript, ProcEngine, RuntimeConfig, TraceSource};
use tracing::info;

const PLAYER: ActorId = ActorId(1);
const DUMMY: ActorId = ActorId(2);

const RENEW: AuraId = AuraId(139);
const SEAL: AuraId = AuraId(31_892);
const WARD: AuraId = AuraId(47_509);

const RENEW_HEAL: AbilityId = AbilityId(139);
const SEAL_STRIKE: AbilityId = AbilityId(31_893);
const WARD_SHIELD: AbilityId = AbilityId(47_753);

/// Host that accepts every cast and only logs.
#[derive(Default)]
struct LoggingHost {
    casts: usize,
}

impl HostWorld for LoggingHost {
    fn cast_ability(&mut self, request: &CastRequest) -> CastOutcome {
        self.casts += 1;
        info!(
            target: "proc_sim::host",
            caster = %request.caster,
            target_actor = %request.target,
            ability = %request.ability,
            base_point = ?request.options.base_point(0),
            total = self.casts,
            "cast"
        );
        CastOutcome::Cast
    }

    fn modify_stat(&mut self, actor: ActorId, stat: StatKind, delta: i32) {
        info!(target: "proc_sim::host", actor = %actor, stat = %stat, delta, "stat");
    }

    fn despawn(&mut self, actor: ActorId) {
        info!(target: "proc_sim::host", actor = %actor, "despawn");
    }
}

fn definitions() -> Vec<AuraDefinition> {
    vec![
        AuraDefinition::new(RENEW, "Renew").duration(15_000).slot(
            SlotDefinition::new(EffectKind::PeriodicHeal)
                .amount(45)
                .period(3_000)
                .trigger(RENEW_HEAL),
        ),
        AuraDefinition::new(SEAL, "Seal of Blood")
            .duration(30_000)
            .slot(
                SlotDefinition::new(EffectKind::ProcTrigger)
                    .amount(25)
                    .trigger(SEAL_STRIKE)
                    .proc(
                        ProcSpec::on(EventMask::DAMAGE_DEALT)
                            .chance(ProcChance::percent(30))
                            .internal_cooldown(1_000),
                    ),
            )
            .slot(SlotDefinition::new(EffectKind::StatModifier(StatKind::AttackPower)).amount(40)),
        AuraDefinition::new(WARD, "Divine Ward").slot(
            SlotDefinition::new(EffectKind::Accumulate { percent: 20 })
                .period(2_000)
                .trigger(WARD_SHIELD)
                .proc(ProcSpec::on(EventMask::HEAL_DEALT)),
        ),
    ]
}

fn scripts() -> Vec<AuraScript> {
    vec![AuraScript::new("seal_of_blood_refund", SEAL).on_proc(0, |ctx, _event| {
        let owner = ctx.owner();
        ctx.adjust_resource(owner, ResourceKind::Mana, 5)?;
        Ok(())
    })]
}

fn main() -> Result<()> {
    init_tracing();

    let config = RuntimeConfig::from_env();
    let mut engine = ProcEngine::builder()
        .config(config)
        .host(LoggingHost::default())
        .catalog(
            [RENEW_HEAL, SEAL_STRIKE, WARD_SHIELD]
                .into_iter()
                .collect::<std::collections::BTreeSet<_>>(),
        )
        .definitions(definitions())
        .scripts(scripts())
        .actor(
            ActorState::new(PLAYER)
                .with_resources(ResourceLedger::new().with_pool(ResourceKind::Mana, 60, 100)),
        )
        .actor(ActorState::new(DUMMY))
        .build()?;

    engine.apply_aura(PLAYER, SEAL, Some(PLAYER))?;
    engine.apply_aura(PLAYER, WARD, Some(PLAYER))?;
    engine.apply_aura(PLAYER, RENEW, Some(PLAYER))?;

    for step in 0..20u32 {
        engine.advance_by(500);
        engine.publish(PLAYER, CombatEvent::damage_dealt(PLAYER, DUMMY, 100 + step * 10))?;
        if step % 3 == 0 {
            engine.publish(PLAYER, CombatEvent::heal_dealt(PLAYER, PLAYER, 80))?;
        }
    }

    let scripted = engine
        .trace()
        .entries()
        .filter(|e| matches!(e.source, TraceSource::Script(_)))
        .count();
    info!(
        target: "proc_sim",
        now = %engine.now(),
        mana = ?engine.peek_resource(PLAYER, ResourceKind::Mana),
        auras = engine.world().aura_count(),
        trace_entries = engine.trace().len(),
        scripted,
        "simulation finished"
    );
    Ok(())
}
