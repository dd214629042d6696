//! One round of combat: a breath technique, a timed debuff and its expiry.
//!
//! Run with `RUST_LOG=breathe_effects=debug` to see the engine's logs.

use breathe_effects::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), EffectError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::default();
    let mut engine = EffectEngine::new(config.clone(), SeededDice::new(42));
    let resolver = BreathSpecialResolver::new(&config);

    let mut giyu = CharacterSheet::new("giyu", "Giyu", ActorKind::Slayer)
        .with_breath(BreathKey::Snow, &["dentsDeKatana"]);
    giyu.level = 4.0;
    giyu.stats.vitesse = 3.0;
    DerivedRules::for_kind(ActorKind::Slayer).apply(&mut giyu)?;
    giyu.resources.endurance = Pool::full(giyu.resources.endurance.max);

    let mut rui = CharacterSheet::new("rui", "Rui", ActorKind::Demon);
    rui.level = 3.0;
    rui.stats.vitesse = 2.0;
    DerivedRules::for_kind(ActorKind::Demon).apply(&mut rui)?;
    rui.resources.hp = Pool::full(rui.resources.hp.max);

    let mut world: World<CharacterSheet> = [giyu, rui].into_iter().collect();
    let giyu = CharacterId::new("giyu");
    let rui = CharacterId::new("rui");

    println!("=== Turn: Giyu ===");
    let technique = Technique::new("Crocs du katana", Some("Souffle de la Neige"), 4, "1d8+2");
    let pre = world.use_technique(&resolver, &giyu, &rui, &technique)?;
    println!("Cost: {}  Damage: {}", pre.cost, pre.damage);
    for note in &pre.notes {
        println!("  - {}", note);
    }

    let damage = engine.resolve(&Magnitude::Roll {
        formula: DiceFormula::parse(&pre.damage)?,
        negate: true,
    });
    world.update(&rui, |sheet| adjust(sheet, &SheetAttribute::Hp.path(), damage))?;

    let directives = {
        let attacker = world.get(&giyu).ok_or_else(|| EffectError::UnknownCharacter(giyu.clone()))?;
        let target = world.get(&rui).ok_or_else(|| EffectError::UnknownCharacter(rui.clone()))?;
        resolver.on_hit(attacker, target, &technique, &pre, HitOutcome { took_damage: true })
    };
    world.resolve_hit(&mut engine, &giyu, &rui, directives)?;
    print_state(&world, &rui);

    println!("\n=== End of turn ===");
    for report in world.end_turn() {
        println!("{}: {} effect(s) expired", report.character, report.expired.len());
    }
    print_state(&world, &rui);

    println!("\n=== End of round ===");
    for report in world.end_round() {
        for record in &report.expired {
            println!("{}: expired {}", report.character, record.description());
        }
    }
    print_state(&world, &rui);

    Ok(())
}

fn print_state(world: &World<CharacterSheet>, id: &CharacterId) {
    if let Some(sheet) = world.get(id) {
        println!(
            "{}: hp {}/{}  AC {}  active effects {}",
            sheet.name,
            sheet.resources.hp.value,
            sheet.resources.hp.max,
            sheet.resources.armor_class,
            sheet.effects.ledger().len()
        );
    }
}
