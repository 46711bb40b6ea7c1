// Unit tests for MMF Algo

use mmf_algo::core::{
    compute_quality,
    pair_assembler::{PairAssembler, PoolState},
    team_builder::TeamBuilder,
    EngineError, ScoreError,
};
use mmf_algo::models::{
    EvaluationCriteria, Extension, MatchProfile, MissingAttribute, PoolTickets, TeamScope, Ticket,
};

fn player(id: &str, role: &str, score: f64) -> Ticket {
    Ticket::new(id)
        .with_string("mode", "3v3_normal_battle_royale")
        .with_string("role", role)
        .with_double("score", score)
        .with_double("level", score / 20.0)
}

fn one_pool(name: &str, tickets: Vec<Ticket>) -> PoolTickets {
    let mut pools = PoolTickets::new();
    pools.insert(name.to_string(), tickets);
    pools
}

#[test]
fn test_quality_is_spread() {
    let tickets = vec![player("1", "bang", 3923.0), player("2", "valk", 3701.0)];
    let quality = compute_quality(&tickets, "score", MissingAttribute::Reject).unwrap();
    assert!((quality - 222.0).abs() < 1e-9);
}

#[test]
fn test_quality_empty_is_invalid() {
    assert_eq!(
        compute_quality(&[], "score", MissingAttribute::Reject),
        Err(ScoreError::EmptyGroup)
    );
}

#[test]
fn test_team_builder_fewer_than_team_size() {
    let builder = TeamBuilder::new(3, Some("role".to_string()), TeamScope::AcrossPools).unwrap();
    let pools = one_pool("normal", vec![player("1", "bang", 1.0), player("2", "valk", 2.0)]);
    assert!(builder.build(&pools, ["normal"]).is_empty());
}

#[test]
fn test_team_builder_unique_roles_floor_division() {
    let roles = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"];
    let tickets: Vec<Ticket> = roles
        .iter()
        .enumerate()
        .map(|(i, r)| player(&i.to_string(), r, i as f64))
        .collect();
    let pools = one_pool("normal", tickets);

    let builder = TeamBuilder::new(3, Some("role".to_string()), TeamScope::AcrossPools).unwrap();
    let teams = builder.build(&pools, ["normal"]);

    assert_eq!(teams.len(), roles.len() / 3);
    for team in &teams {
        assert_eq!(team.len(), 3);
        assert_eq!(team.seen_count(), 3);
    }
}

#[test]
fn test_team_builder_deferred_never_lost() {
    let tickets = vec![
        player("1", "bang", 1.0),
        player("2", "bang", 2.0),
        player("3", "bang", 3.0),
        player("4", "valk", 4.0),
        player("5", "valk", 5.0),
        player("6", "valk", 6.0),
    ];
    let pools = one_pool("normal", tickets);

    let builder = TeamBuilder::new(2, Some("role".to_string()), TeamScope::AcrossPools).unwrap();
    let teams = builder.build(&pools, ["normal"]);

    let mut placed: Vec<&str> = teams.iter().flat_map(|t| t.ticket_ids()).collect();
    placed.sort_unstable();
    assert_eq!(teams.len(), 3);
    assert_eq!(placed, vec!["1", "2", "3", "4", "5", "6"]);
}

#[test]
fn test_pair_assembler_sizes_3_1_3() {
    let mut pools = PoolTickets::new();
    pools.insert("a".to_string(), vec![player("a1", "x", 1.0), player("a2", "x", 2.0), player("a3", "x", 3.0)]);
    pools.insert("b".to_string(), vec![player("b1", "x", 1.0)]);
    pools.insert("c".to_string(), vec![player("c1", "x", 1.0), player("c2", "x", 2.0), player("c3", "x", 3.0)]);

    let assembler = PairAssembler::new(1, "level").unwrap();
    let matches = assembler.build(PoolState::new(&pools, ["a", "b", "c"]));

    assert_eq!(matches.len(), 1);
}

#[test]
fn test_invalid_builders() {
    assert!(matches!(
        TeamBuilder::new(0, Some("role".to_string()), TeamScope::PerPool),
        Err(EngineError::InvalidConfig(_))
    ));
    assert!(matches!(PairAssembler::new(0, "level"), Err(EngineError::InvalidConfig(_))));
}

#[test]
fn test_evaluation_extension_roundtrip() {
    let ext = EvaluationCriteria { score: 15.0 }.pack().unwrap();
    let decoded = EvaluationCriteria::unpack(&ext).unwrap().unwrap();
    assert_eq!(decoded.score, 15.0);

    let foreign = Extension {
        type_url: "type.googleapis.com/acme.Other".to_string(),
        value: serde_json::json!({ "score": 1.0 }),
    };
    assert!(EvaluationCriteria::unpack(&foreign).is_none());
}

#[test]
fn test_profile_json_shape() {
    let raw = r#"{
        "name": "3v3_rank_battle_royale",
        "pools": [
            {"name": "3v3_rank_low",
             "stringEqualsFilters": [{"stringArg": "mode", "value": "3v3_rank_battle_royale"}],
             "doubleRangeFilters": [{"doubleArg": "score", "min": 0, "max": 3500}]}
        ],
        "strategy": {"kind": "team", "teamSize": 3, "discriminatorField": "role", "scope": "per_pool"},
        "qualityAttribute": "score",
        "scoringPolicy": "abort_run"
    }"#;

    let profile: MatchProfile = serde_json::from_str(raw).unwrap();
    assert_eq!(profile.pools[0].double_range_filters[0].max, 3500.0);
    assert_eq!(profile.pool_names().collect::<Vec<_>>(), vec!["3v3_rank_low"]);
    assert!(profile.missing_attribute.is_none());
}
