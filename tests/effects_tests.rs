use breathe_effects::*;

fn fixed_engine() -> EffectEngine<impl FnMut(&DiceFormula) -> i64> {
    EffectEngine::new(EngineConfig::default(), |f: &DiceFormula| f.max())
}

fn path(s: &str) -> AttributePath {
    AttributePath::from_str(s)
}

/// Base entries exist exactly for the paths the ledger touches.
fn assert_invariant<C: CharacterRecord>(character: &C) {
    let state = character.effects();
    assert_eq!(state.base().paths(), state.ledger().paths());
    assert!(state.validate().is_ok());
}

/// Armor class 12, -4 until end of round, back to 12.
#[test]
fn test_armor_class_penalty_until_round_end() {
    let mut engine = fixed_engine();
    let mut sheet = CharacterSheet::new("nezuko", "Nezuko", ActorKind::Demon);
    sheet.resources.armor_class = 12.0;
    let ac = SheetAttribute::ArmorClass.path();

    engine
        .apply(
            &mut sheet,
            EffectRequest::add(ac.clone(), -4.0).lasting(EffectDuration::EndOfRound),
        )
        .unwrap();
    assert_eq!(sheet.resources.armor_class, 8.0);
    assert_invariant(&sheet);

    let report = on_round_boundary(&mut sheet);
    assert_eq!(report.restored, vec![ac.clone()]);
    assert_eq!(sheet.resources.armor_class, 12.0);
    assert_eq!(sheet.effects.ledger().for_path(&ac).count(), 0);
    assert!(!sheet.effects.base().contains(&ac));
    assert_invariant(&sheet);
}

/// Two +1 until end of turn on endurance 10 expire together.
#[test]
fn test_simultaneous_expiry_on_same_path() {
    let mut engine = fixed_engine();
    let mut sheet = CharacterSheet::new("zenitsu", "Zenitsu", ActorKind::Slayer);
    sheet.resources.endurance = Pool::full(10.0);
    let endurance = SheetAttribute::Endurance.path();

    for _ in 0..2 {
        engine
            .apply(
                &mut sheet,
                EffectRequest::add(endurance.clone(), 1.0).lasting(EffectDuration::EndOfTurn),
            )
            .unwrap();
    }
    assert_eq!(sheet.resources.endurance.value, 12.0);

    let report = on_turn_boundary(&mut sheet);
    assert_eq!(report.expired.len(), 2);
    assert_eq!(report.restored, vec![endurance]);
    assert_eq!(sheet.resources.endurance.value, 10.0);
    assert_invariant(&sheet);
}

#[test]
fn test_countdown_survives_exactly_one_turn() {
    let mut engine = fixed_engine();
    let mut c = DynamicRecord::new("a").with("x", 4.0);
    engine
        .apply(&mut c, EffectRequest::add("x", 3.0).lasting(EffectDuration::Countdown(2)))
        .unwrap();

    assert!(on_turn_boundary(&mut c).is_empty());
    assert_eq!(c.number("x"), Some(7.0));
    let remaining = c.effects().ledger().iter().next().unwrap().duration();
    assert_eq!(remaining, EffectDuration::Countdown(1));

    assert_eq!(on_turn_boundary(&mut c).expired.len(), 1);
    assert_eq!(c.number("x"), Some(4.0));
    assert_invariant(&c);
}

#[test]
fn test_countdown_ignores_round_boundaries() {
    let mut engine = fixed_engine();
    let mut c = DynamicRecord::new("a").with("x", 4.0);
    engine
        .apply(&mut c, EffectRequest::add("x", 3.0).lasting(EffectDuration::Countdown(1)))
        .unwrap();
    for _ in 0..5 {
        on_round_boundary(&mut c);
    }
    assert_eq!(c.number("x"), Some(7.0));
    on_turn_boundary(&mut c);
    assert_eq!(c.number("x"), Some(4.0));
}

#[test]
fn test_turn_and_round_effects_are_isolated() {
    let mut engine = fixed_engine();
    let mut c = DynamicRecord::new("a").with("turn", 1.0).with("round", 1.0);
    engine
        .apply(&mut c, EffectRequest::add("turn", 1.0).lasting(EffectDuration::EndOfTurn))
        .unwrap();
    engine
        .apply(&mut c, EffectRequest::add("round", 1.0).lasting(EffectDuration::EndOfRound))
        .unwrap();

    for _ in 0..3 {
        on_round_boundary(&mut c);
    }
    assert_eq!(c.number("turn"), Some(2.0));
    assert_eq!(c.number("round"), Some(1.0));

    engine
        .apply(&mut c, EffectRequest::add("round", 1.0).lasting(EffectDuration::EndOfRound))
        .unwrap();
    on_turn_boundary(&mut c);
    on_turn_boundary(&mut c);
    assert_eq!(c.number("turn"), Some(1.0));
    assert_eq!(c.number("round"), Some(2.0));
    assert_invariant(&c);
}

#[test]
fn test_application_order_decides_result() {
    let mut engine = fixed_engine();
    let mut forward = DynamicRecord::new("a").with("x", 5.0);
    engine.apply(&mut forward, EffectRequest::add("x", 2.0)).unwrap();
    engine.apply(&mut forward, EffectRequest::multiply("x", 3.0)).unwrap();

    let mut reverse = DynamicRecord::new("b").with("x", 5.0);
    engine.apply(&mut reverse, EffectRequest::multiply("x", 3.0)).unwrap();
    engine.apply(&mut reverse, EffectRequest::add("x", 2.0)).unwrap();

    assert_eq!(forward.number("x"), Some(21.0));
    assert_eq!(reverse.number("x"), Some(17.0));
}

#[test]
fn test_recompute_twice_gives_same_value() {
    let mut engine = fixed_engine();
    let mut c = DynamicRecord::new("a").with("x", 5.0);
    engine.apply(&mut c, EffectRequest::add("x", 2.0)).unwrap();
    engine.apply(&mut c, EffectRequest::set("x", 9.0)).unwrap();
    engine.apply(&mut c, EffectRequest::multiply("x", 0.5)).unwrap();

    let first = recompute(&mut c, &path("x"));
    let second = recompute(&mut c, &path("x"));
    assert_eq!(first.value, AttributeValue::Number(4.5));
    assert_eq!(first, second);
    assert_eq!(first.steps.len(), 3);
}

#[test]
fn test_add_round_trip_restores_integer_exactly() {
    let mut engine = fixed_engine();
    for (start, delta) in [(0.0, 7.0), (13.0, -20.0), (-3.0, 3.0)] {
        let mut c = DynamicRecord::new("a").with("x", start);
        engine
            .apply(&mut c, EffectRequest::add("x", delta).lasting(EffectDuration::EndOfTurn))
            .unwrap();
        on_turn_boundary(&mut c);
        assert_eq!(c.number("x"), Some(start));
    }
}

#[test]
fn test_middle_expiry_reverts_set_without_touching_later_effects() {
    let mut engine = fixed_engine();
    let mut c = DynamicRecord::new("a").with("x", 10.0);
    engine
        .apply(&mut c, EffectRequest::add("x", 1.0).lasting(EffectDuration::EndOfRound))
        .unwrap();
    engine
        .apply(&mut c, EffectRequest::set("x", 0.0).lasting(EffectDuration::EndOfTurn))
        .unwrap();
    engine
        .apply(&mut c, EffectRequest::add("x", 2.0).lasting(EffectDuration::EndOfRound))
        .unwrap();
    assert_eq!(c.number("x"), Some(2.0));

    let report = on_turn_boundary(&mut c);
    assert_eq!(report.recomputed, vec![path("x")]);
    assert_eq!(c.number("x"), Some(13.0));
    assert_invariant(&c);
}

#[test]
fn test_effects_on_one_character_leave_others_alone() {
    let mut engine = fixed_engine();
    let mut world = World::new();
    world.insert(DynamicRecord::new("a").with("x", 1.0));
    world.insert(DynamicRecord::new("b").with("x", 1.0));
    let a = CharacterId::new("a");
    let b = CharacterId::new("b");

    world
        .apply_effect(&mut engine, &a, EffectRequest::add("x", 5.0).lasting(EffectDuration::EndOfTurn))
        .unwrap();
    world
        .apply_effect(&mut engine, &b, EffectRequest::add("x", 1.0).lasting(EffectDuration::EndOfRound))
        .unwrap();

    // A turn boundary reaches every character under effects.
    let reports = world.end_turn();
    assert_eq!(reports.len(), 1);
    assert_eq!(world.get(&a).unwrap().number("x"), Some(1.0));
    assert_eq!(world.get(&b).unwrap().number("x"), Some(2.0));
    assert_eq!(world.active_characters().collect::<Vec<_>>(), vec![&b]);
}

#[test]
fn test_rolled_magnitude_frozen_across_recomputes() {
    let mut engine = EffectEngine::new(EngineConfig::default(), SeededDice::new(7));
    let mut c = DynamicRecord::new("a").with("resources.armorClass", 15.0);
    let request = EffectRequest::rolled("resources.armorClass", EffectMode::Add, "1d4")
        .unwrap()
        .negated();
    engine.apply(&mut c, request).unwrap();

    let after_apply = c.number("resources.armorClass").unwrap();
    assert!((11.0..=14.0).contains(&after_apply));
    for _ in 0..3 {
        recompute(&mut c, &path("resources.armorClass"));
        assert_eq!(c.number("resources.armorClass"), Some(after_apply));
    }
}

#[test]
fn test_unknown_sheet_path_rejected() {
    let mut engine = fixed_engine();
    let mut sheet = CharacterSheet::new("a", "A", ActorKind::Slayer);
    let result = engine.apply(&mut sheet, EffectRequest::add("resources.armour", 2.0));
    assert_eq!(
        result,
        Err(EffectError::UnknownAttribute(path("resources.armour")))
    );
    assert!(sheet.effects.ledger().is_empty());
    assert!(sheet.effects.base().is_empty());
}

#[test]
fn test_spending_under_effect_survives_expiry() {
    let mut engine = fixed_engine();
    let mut sheet = CharacterSheet::new("a", "A", ActorKind::Slayer);
    sheet.resources.endurance = Pool::full(10.0);
    let endurance = SheetAttribute::Endurance.path();
    engine
        .apply(
            &mut sheet,
            EffectRequest::add(endurance.clone(), 2.0).lasting(EffectDuration::EndOfTurn),
        )
        .unwrap();

    adjust(&mut sheet, &endurance, -4.0);
    assert_eq!(sheet.resources.endurance.value, 8.0);
    on_turn_boundary(&mut sheet);
    assert_eq!(sheet.resources.endurance.value, 6.0);
}

#[test]
fn test_state_persists_and_resumes() {
    let mut engine = fixed_engine();
    let mut sheet = CharacterSheet::new("a", "A", ActorKind::Slayer);
    sheet.resources.armor_class = 12.0;
    engine
        .apply(
            &mut sheet,
            EffectRequest::add(SheetAttribute::ArmorClass, -2.0)
                .lasting(EffectDuration::Countdown(2))
                .labelled("Smoke")
                .from_origin("Kyogai"),
        )
        .unwrap();

    let json = serde_json::to_string(&sheet).unwrap();
    let mut restored: CharacterSheet = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, sheet);
    let record = restored.effects.ledger().iter().next().unwrap();
    assert_eq!(record.label(), "Smoke");
    assert_eq!(record.origin(), Some("Kyogai"));

    on_turn_boundary(&mut restored);
    on_turn_boundary(&mut restored);
    assert_eq!(restored.resources.armor_class, 12.0);
    assert_invariant(&restored);
}

#[test]
fn test_leaked_base_entry_is_detected() {
    let json = r#"{"ledger":[],"base":{"x":1.0},"stacks":{}}"#;
    assert!(matches!(
        EffectState::from_json(json),
        Err(EffectError::InconsistentState { .. })
    ));
}

#[test]
fn test_sheet_with_stale_base_is_rejected_on_load() {
    let mut sheet = CharacterSheet::new("a", "A", ActorKind::Slayer);
    sheet.resources.armor_class = 12.0;
    let mut value = serde_json::to_value(&sheet).unwrap();
    value["effects"]["base"] = serde_json::json!({ "resources.armorClass": 99.0 });

    let loaded: Result<CharacterSheet, _> = serde_json::from_value(value);
    let err = loaded.unwrap_err().to_string();
    assert!(err.contains("resources.armorClass"), "{}", err);
}

#[test]
fn test_record_with_orphan_effect_is_rejected_on_load() {
    let mut engine = fixed_engine();
    let mut c = DynamicRecord::new("a").with("x", 5.0);
    engine.apply(&mut c, EffectRequest::add("x", 2.0)).unwrap();

    let mut value = serde_json::to_value(&c).unwrap();
    value["effects"]["base"] = serde_json::json!({});
    assert!(serde_json::from_value::<DynamicRecord>(value).is_err());

    // The untouched record still loads and reverts cleanly into a world.
    let json = serde_json::to_string(&c).unwrap();
    let restored: DynamicRecord = serde_json::from_str(&json).unwrap();
    let mut world = World::new();
    world.insert(restored);
    world.end_round();
    let id = CharacterId::new("a");
    assert_eq!(world.get(&id).unwrap().number("x"), Some(5.0));
    assert_invariant(world.get(&id).unwrap());
}

#[test]
fn test_apply_all_skips_rejected_requests() {
    let mut engine = fixed_engine();
    let mut sheet = CharacterSheet::new("a", "A", ActorKind::Slayer);
    let ids = engine.apply_all(
        &mut sheet,
        vec![
            EffectRequest::add(SheetAttribute::Force, 1.0),
            EffectRequest::add("stats.strength", 1.0),
            EffectRequest::add(SheetAttribute::Courage, 2.0),
        ],
    );
    assert_eq!(ids.len(), 2);
    assert_eq!(sheet.stats.force, 1.0);
    assert_eq!(sheet.stats.courage, 2.0);
    assert_invariant(&sheet);
}

/// Vitesse 2 gives AC 12; a +2 Vitesse buff lifts AC to 14 only while it lasts.
#[test]
fn test_derived_defence_follows_input_buff_and_its_expiry() {
    let mut engine = fixed_engine();
    let rules = DerivedRules::for_kind(ActorKind::Slayer);
    let mut sheet = CharacterSheet::new("tanjiro", "Tanjiro", ActorKind::Slayer);
    sheet.stats.vitesse = 2.0;
    rules.apply(&mut sheet).unwrap();
    assert_eq!(sheet.resources.armor_class, 12.0);

    engine
        .apply(
            &mut sheet,
            EffectRequest::add(SheetAttribute::Vitesse, 2.0).lasting(EffectDuration::EndOfTurn),
        )
        .unwrap();
    assert_eq!(sheet.resources.armor_class, 14.0);
    assert_eq!(sheet.derived.reflexes, 5.0);

    // A full re-derive in the middle of the buff changes nothing.
    rules.apply(&mut sheet).unwrap();
    assert_eq!(sheet.resources.armor_class, 14.0);

    let report = on_turn_boundary(&mut sheet);
    assert_eq!(report.restored, vec![SheetAttribute::Vitesse.path()]);
    assert!(report.rederived.contains(&SheetAttribute::ArmorClass.path()));
    assert_eq!(sheet.stats.vitesse, 2.0);
    assert_eq!(sheet.resources.armor_class, 12.0);
    assert_eq!(sheet.derived.reflexes, 3.0);
    assert_invariant(&sheet);
}

#[test]
fn test_derived_refresh_keeps_effects_on_the_derived_path() {
    let mut engine = fixed_engine();
    let rules = DerivedRules::for_kind(ActorKind::Slayer);
    let mut sheet = CharacterSheet::new("a", "A", ActorKind::Slayer);
    sheet.stats.vitesse = 2.0;
    rules.apply(&mut sheet).unwrap();

    engine
        .apply(
            &mut sheet,
            EffectRequest::add(SheetAttribute::ArmorClass, -4.0).lasting(EffectDuration::EndOfRound),
        )
        .unwrap();
    engine
        .apply(
            &mut sheet,
            EffectRequest::add(SheetAttribute::Vitesse, 2.0).lasting(EffectDuration::EndOfTurn),
        )
        .unwrap();
    assert_eq!(sheet.resources.armor_class, 10.0);

    on_turn_boundary(&mut sheet);
    assert_eq!(sheet.resources.armor_class, 8.0);
    on_round_boundary(&mut sheet);
    assert_eq!(sheet.resources.armor_class, 12.0);
    assert_invariant(&sheet);
}
