use combat_engine::core::battle::{simulate, summarize, Combatant, IterationStatus, Side, Team};
use combat_engine::core::config::{EngineConfig, ResolutionMode};
use combat_engine::core::error::EngineError;
use combat_engine::core::replay::replay_iteration;
use combat_engine::core::state::{CreatureSnapshot, StatBlock, Stats};
use combat_engine::data::moves::{MoveClass, MoveDatabase, MoveDescriptor};
use combat_engine::data::type_chart::TypeChart;

fn creature(id: &str, types: &[&str], stat: i32, hp: i32, moves: &[&str]) -> CreatureSnapshot {
    CreatureSnapshot::new(id, id, types.iter().map(|t| t.to_string()).collect(), Stats::uniform(stat), hp)
        .with_moves(moves)
}

fn moves_with(extra: Vec<MoveDescriptor>) -> MoveDatabase {
    let mut moves = MoveDatabase::minimal();
    for descriptor in extra {
        moves.insert(descriptor);
    }
    moves
}

fn mixed_teams() -> (Team, Team) {
    let team_a = Team::from_snapshots(
        "Alpha",
        vec![
            creature("sprout", &["grass"], 10, 36, &["vine_whip", "tackle"]),
            creature("puddle", &["water"], 9, 42, &["water_gun", "quick_attack"]),
        ],
    );
    let team_b = Team::from_snapshots(
        "Beta",
        vec![
            creature("cinder", &["fire"], 11, 36, &["ember", "tackle"]),
            creature("brawler", &["fighting"], 10, 40, &["double_kick", "growl"]),
        ],
    );
    (team_a, team_b)
}

#[test]
fn test_guaranteed_knockout_every_iteration() {
    let mut smash = MoveDescriptor::new("smash", MoveClass::Physical, "normal", "2d6+@atk");
    smash.accuracy = 0.0;
    let moves = moves_with(vec![smash]);
    let chart = TypeChart::new();
    let config = EngineConfig::default()
        .with_mode(ResolutionMode::Tactical)
        .with_iterations(1000)
        .with_seed(7);

    let mut striker = creature("striker", &["water"], 10, 60, &["smash"]);
    striker.stats.atk = StatBlock::new(40);
    let mut target = creature("target", &["normal"], 1, 10, &["smash"]);
    target.stats.spd = StatBlock::new(1);

    let team_a = Team::new("Alpha").with(Combatant::with_move(striker, "smash"));
    let team_b = Team::new("Beta").with(Combatant::with_move(target, "smash"));
    let summary = simulate(&team_a, &team_b, &moves, &chart, &config).unwrap();

    assert_eq!(summary.iterations, 1000);
    assert_eq!(summary.completed, 1000);
    assert_eq!(summary.team_a.wins, 1000);
    assert_eq!(summary.team_b.wins, 0);
    assert_eq!(summary.team_b.losses, 1000);
    assert_eq!(summary.mean_duration, 1.0);
    assert_eq!(summary.median_duration, 1.0);
    assert_eq!(summary.duration_histogram.get(&1), Some(&1000));
    assert_eq!(summary.winner.as_deref(), Some("Alpha"));
    assert_eq!(summary.team_a.mean_accuracy, 1.0);
    // The target never gets to act.
    assert_eq!(summary.team_b.mean_accuracy, 0.0);
    assert!(summary.records.iter().all(|r| r.winner == Some(Side::A)));
}

#[test]
fn test_turn_cap_iterations_are_excluded() {
    let moves = MoveDatabase::minimal();
    let chart = TypeChart::new();
    let mut config = EngineConfig::default().with_iterations(20);
    config.turn_cap = 5;

    let team_a = Team::new("Alpha").with(Combatant::with_move(
        creature("loud", &["normal"], 10, 30, &["growl"]),
        "growl",
    ));
    let team_b = Team::new("Beta").with(Combatant::with_move(
        creature("louder", &["normal"], 10, 30, &["growl"]),
        "growl",
    ));
    let summary = simulate(&team_a, &team_b, &moves, &chart, &config).unwrap();

    assert_eq!(summary.completed, 0);
    assert_eq!(summary.exceeded, 20);
    assert_eq!(summary.mean_duration, 0.0);
    assert_eq!(summary.team_a.mean_accuracy, 0.0);
    assert!(summary.duration_histogram.is_empty());
    assert_eq!(summary.winner, None);
    assert_eq!(summary.winner_label(), "DRAW!");
    assert!(summary.longest.is_none());
    assert!(summary
        .records
        .iter()
        .all(|r| r.status == IterationStatus::Exceeded && r.duration == 5));
}

#[test]
fn test_invalid_setup_is_rejected() {
    let moves = MoveDatabase::minimal();
    let chart = TypeChart::new();
    let (team_a, team_b) = mixed_teams();

    let config = EngineConfig::default().with_iterations(0);
    let err = simulate(&team_a, &team_b, &moves, &chart, &config).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));

    let config = EngineConfig::default();
    let err = simulate(&team_a, &Team::new("Empty"), &moves, &chart, &config).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}

#[test]
fn test_parallel_matches_sequential() {
    let moves = MoveDatabase::minimal();
    let chart = TypeChart::new();
    let (team_a, team_b) = mixed_teams();
    let sequential = EngineConfig::default().with_iterations(64).with_seed(99);
    let mut parallel = sequential.clone();
    parallel.parallel = true;

    let first = simulate(&team_a, &team_b, &moves, &chart, &sequential).unwrap();
    let second = simulate(&team_a, &team_b, &moves, &chart, &parallel).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.records.len(), 64);
}

#[test]
fn test_replay_reproduces_iteration() {
    let moves = MoveDatabase::minimal();
    let chart = TypeChart::new();
    let (team_a, team_b) = mixed_teams();
    let config = EngineConfig::default().with_iterations(10).with_seed(1234);

    let summary = simulate(&team_a, &team_b, &moves, &chart, &config).unwrap();
    for index in [0u32, 3, 9] {
        let replayed = replay_iteration(&team_a, &team_b, &moves, &chart, &config, index).unwrap();
        assert_eq!(replayed, summary.records[index as usize]);
        assert_eq!(replayed.seed, 1234 + index as u64);
    }
}

#[test]
fn test_damage_bookkeeping_balances() {
    let moves = MoveDatabase::minimal();
    let chart = TypeChart::new();
    let (team_a, team_b) = mixed_teams();
    let config = EngineConfig::default().with_iterations(30).with_seed(5);

    let summary = simulate(&team_a, &team_b, &moves, &chart, &config).unwrap();
    for record in &summary.records {
        assert_eq!(record.team_a.damage_dealt, record.team_b.damage_taken);
        assert_eq!(record.team_b.damage_dealt, record.team_a.damage_taken);
        assert_eq!(record.team_a.hits + record.team_a.misses, record.team_a.attacks);
        assert!(record.duration <= config.turn_cap);
    }
    assert_eq!(
        summary.team_a.wins + summary.team_b.wins,
        summary.completed
    );
}

#[test]
fn test_unknown_binding_faults_iterations() {
    let cursed = MoveDescriptor::new("cursed", MoveClass::Physical, "ghost", "2d6+@luck");
    let moves = moves_with(vec![cursed]);
    let chart = TypeChart::new();
    let config = EngineConfig::default().with_iterations(4);

    let team_a = Team::new("Alpha").with(Combatant::with_move(
        creature("haunt", &["ghost"], 10, 30, &["cursed"]),
        "cursed",
    ));
    let team_b = Team::new("Beta").with(Combatant::with_move(
        creature("haunt_too", &["ghost"], 10, 30, &["cursed"]),
        "cursed",
    ));
    let summary = simulate(&team_a, &team_b, &moves, &chart, &config).unwrap();

    assert_eq!(summary.faulted, 4);
    assert_eq!(summary.completed, 0);
    assert_eq!(summary.winner, None);
    assert!(summary
        .records
        .iter()
        .all(|r| matches!(&r.status, IterationStatus::Faulted(reason) if reason.contains("luck"))));
}

#[test]
fn test_threatened_creature_is_swapped_out() {
    let moves = MoveDatabase::minimal();
    let chart = TypeChart::new();
    let mut config = EngineConfig::default().with_iterations(10);
    config.swaps = true;

    let team_a = Team::from_snapshots(
        "Alpha",
        vec![
            creature("sprout", &["grass"], 10, 12, &["vine_whip"]),
            creature("puddle", &["water"], 10, 60, &["water_gun"]),
        ],
    );
    let team_b = Team::from_snapshots("Beta", vec![creature("cinder", &["fire"], 10, 60, &["ember"])]);

    let summary = simulate(&team_a, &team_b, &moves, &chart, &config).unwrap();
    for record in &summary.records {
        assert!(record.team_a.swaps >= 1);
        assert_eq!(record.team_b.swaps, 0);
        assert!(record.timeline.iter().any(|line| line.contains("switches sprout out for puddle")));
    }

    config.swaps = false;
    let summary = simulate(&team_a, &team_b, &moves, &chart, &config).unwrap();
    assert!(summary.records.iter().all(|r| r.team_a.swaps == 0));
}

#[test]
fn test_summary_picks_first_longest_iteration() {
    let moves = MoveDatabase::minimal();
    let chart = TypeChart::new();
    let (team_a, team_b) = mixed_teams();
    let config = EngineConfig::default().with_iterations(25).with_seed(11);

    let summary = simulate(&team_a, &team_b, &moves, &chart, &config).unwrap();
    let records = summary.records.clone();
    let rebuilt = summarize("Alpha", "Beta", records.clone());
    assert_eq!(rebuilt, summary);

    if let Some(longest) = &summary.longest {
        let max = records
            .iter()
            .filter(|r| r.is_completed())
            .map(|r| r.duration)
            .max()
            .unwrap();
        assert_eq!(longest.duration, max);
        let first = records
            .iter()
            .find(|r| r.is_completed() && r.duration == max)
            .unwrap();
        assert_eq!(longest.index, first.index);
    }
}

fn one_shot_moves() -> MoveDatabase {
    let mut smash = MoveDescriptor::new("smash", MoveClass::Physical, "normal", "100");
    smash.accuracy = 0.0;
    let mut jab = MoveDescriptor::new("jab", MoveClass::Physical, "normal", "100");
    jab.accuracy = 0.0;
    jab.priority = 1;
    moves_with(vec![smash, jab])
}

fn duelist(id: &str, speed: i32, move_id: &str) -> Combatant {
    let mut snapshot = creature(id, &["water"], 2, 10, &[move_id]);
    snapshot.stats.spd = StatBlock::new(speed);
    Combatant::with_move(snapshot, move_id)
}

#[test]
fn test_speed_decides_turn_order_by_default() {
    let moves = one_shot_moves();
    let chart = TypeChart::new();
    let config = EngineConfig::default()
        .with_mode(ResolutionMode::Tactical)
        .with_iterations(50);
    assert!(!config.priority_order);

    let team_a = Team::new("Alpha").with(duelist("slow", 1, "jab"));
    let team_b = Team::new("Beta").with(duelist("fast", 20, "smash"));
    let summary = simulate(&team_a, &team_b, &moves, &chart, &config).unwrap();

    assert_eq!(summary.team_b.wins, 50);
    for record in &summary.records {
        assert_eq!(record.timeline[1], "fast used smash!");
        assert_eq!(record.team_a.attacks, 0);
        assert_eq!(record.duration, 1);
    }
}

#[test]
fn test_priority_order_lets_slower_side_strike_first() {
    let moves = one_shot_moves();
    let chart = TypeChart::new();
    let mut config = EngineConfig::default()
        .with_mode(ResolutionMode::Tactical)
        .with_iterations(50);
    config.priority_order = true;

    let team_a = Team::new("Alpha").with(duelist("slow", 1, "jab"));
    let team_b = Team::new("Beta").with(duelist("fast", 20, "smash"));
    let summary = simulate(&team_a, &team_b, &moves, &chart, &config).unwrap();

    assert_eq!(summary.team_a.wins, 50);
    for record in &summary.records {
        assert_eq!(record.timeline[1], "slow used jab!");
        assert_eq!(record.team_b.attacks, 0);
    }

    // Equal priority falls back to speed.
    let team_a = Team::new("Alpha").with(duelist("slow", 1, "smash"));
    let summary = simulate(&team_a, &team_b, &moves, &chart, &config).unwrap();
    assert_eq!(summary.team_b.wins, 50);
}

#[test]
fn test_speed_tie_goes_to_side_a() {
    let moves = one_shot_moves();
    let chart = TypeChart::new();
    let config = EngineConfig::default()
        .with_mode(ResolutionMode::Tactical)
        .with_iterations(50);

    let team_a = Team::new("Alpha").with(duelist("left", 5, "smash"));
    let team_b = Team::new("Beta").with(duelist("right", 5, "smash"));
    let summary = simulate(&team_a, &team_b, &moves, &chart, &config).unwrap();

    assert_eq!(summary.team_a.wins, 50);
    assert!(summary.records.iter().all(|r| r.timeline[1] == "left used smash!"));
}
