use chrono::NaiveDate;

use squadmetrics::EngineError;
use squadmetrics::aggregate::Analytics;
use squadmetrics::catalog::{MetricCatalog, MetricSide};
use squadmetrics::demo;
use squadmetrics::store::{
    MatchType, NewMatch, Participation, RawValueStore, SqliteStore, ValueLookup,
};
use squadmetrics::{MatchId, TeamId};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn new_match(
    store: &SqliteStore,
    team_id: TeamId,
    season_id: squadmetrics::SeasonId,
    on: NaiveDate,
    score: (i32, i32),
) -> MatchId {
    store
        .insert_match(&NewMatch {
            team_id,
            season_id,
            date: on,
            opponent_name: "Rival FC".to_string(),
            is_home: true,
            match_type: MatchType::League,
            competition: None,
            score_for: Some(score.0),
            score_against: Some(score.1),
        })
        .expect("insert match")
}

#[test]
fn match_round_trip_preserves_fields() {
    let store = SqliteStore::in_memory().unwrap();
    let team_id = store.insert_team("Test Team").unwrap();
    let season_id = store
        .insert_season("2024", date(2024, 1, 1), date(2024, 12, 31))
        .unwrap();
    let match_id = new_match(&store, team_id, season_id, date(2024, 6, 15), (3, 1));

    let stored = store.match_by_id(match_id).unwrap().expect("match exists");
    assert_eq!(stored.team_id, team_id);
    assert_eq!(stored.date, date(2024, 6, 15));
    assert_eq!(stored.match_type, MatchType::League);
    assert_eq!(stored.score_for, Some(3));
    assert!(stored.is_win());

    assert!(store.match_by_id(MatchId(404)).unwrap().is_none());
}

#[test]
fn list_matches_filters_by_season_and_date_range() {
    let store = SqliteStore::in_memory().unwrap();
    let team_id = store.insert_team("Test Team").unwrap();
    let season_a = store
        .insert_season("2024", date(2024, 1, 1), date(2024, 12, 31))
        .unwrap();
    let season_b = store
        .insert_season("2025", date(2025, 1, 1), date(2025, 12, 31))
        .unwrap();
    let m1 = new_match(&store, team_id, season_a, date(2024, 6, 1), (1, 0));
    let m2 = new_match(&store, team_id, season_a, date(2024, 7, 1), (0, 0));
    let m3 = new_match(&store, team_id, season_b, date(2025, 2, 1), (2, 2));

    let all = store.list_matches(team_id, None, None, None).unwrap();
    let ids: Vec<MatchId> = all.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![m1, m2, m3]);

    let season = store.list_matches(team_id, Some(season_a), None, None).unwrap();
    assert_eq!(season.len(), 2);

    let range = store
        .list_matches(team_id, None, Some(date(2024, 6, 15)), Some(date(2025, 1, 31)))
        .unwrap();
    let ids: Vec<MatchId> = range.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![m2]);
}

#[test]
fn sums_and_means_match_the_read_contract() {
    let store = SqliteStore::in_memory().unwrap();
    let catalog = MetricCatalog::builtin();
    let team_id = store.insert_team("Test Team").unwrap();
    let season_id = store
        .insert_season("2024", date(2024, 1, 1), date(2024, 12, 31))
        .unwrap();
    let m1 = new_match(&store, team_id, season_id, date(2024, 6, 1), (2, 1));
    let m2 = new_match(&store, team_id, season_id, date(2024, 6, 8), (3, 0));
    let m3 = new_match(&store, team_id, season_id, date(2024, 6, 15), (0, 0));

    store
        .upsert_team_value(catalog, m1, "team_goals_scored", MetricSide::Own, 2.0)
        .unwrap();
    store
        .upsert_team_value(catalog, m2, "team_goals_scored", MetricSide::Own, 3.0)
        .unwrap();
    store
        .upsert_team_value(catalog, m1, "team_possession_pct", MetricSide::Own, 60.0)
        .unwrap();
    store
        .upsert_team_value(catalog, m2, "team_possession_pct", MetricSide::Own, 40.0)
        .unwrap();

    let ids = [m1, m2, m3];
    assert_eq!(
        store.sum_team_values(&ids, "team_goals_scored", MetricSide::Own).unwrap(),
        5.0
    );
    // Mean over recorded rows only: match 3 has no possession row.
    assert_eq!(
        store.mean_team_values(&ids, "team_possession_pct", MetricSide::Own).unwrap(),
        Some(50.0)
    );
    assert_eq!(
        store.mean_team_values(&ids, "team_pass_zone_att_pct", MetricSide::Own).unwrap(),
        None
    );
    // Point lookup misses read as absent, not as zero.
    assert_eq!(
        store.team_value(m3, "team_goals_scored", MetricSide::Own).unwrap(),
        None
    );
}

#[test]
fn upsert_replaces_the_existing_row() {
    let store = SqliteStore::in_memory().unwrap();
    let catalog = MetricCatalog::builtin();
    let team_id = store.insert_team("Test Team").unwrap();
    let season_id = store
        .insert_season("2024", date(2024, 1, 1), date(2024, 12, 31))
        .unwrap();
    let m1 = new_match(&store, team_id, season_id, date(2024, 6, 1), (2, 1));

    store
        .upsert_team_value(catalog, m1, "team_shots", MetricSide::Own, 9.0)
        .unwrap();
    store
        .upsert_team_value(catalog, m1, "team_shots", MetricSide::Own, 11.0)
        .unwrap();

    assert_eq!(store.team_value(m1, "team_shots", MetricSide::Own).unwrap(), Some(11.0));
    assert_eq!(store.team_metric_rows(m1).unwrap().len(), 1);
}

#[test]
fn defensive_validation_rejects_bad_writes() {
    let store = SqliteStore::in_memory().unwrap();
    let catalog = MetricCatalog::builtin();
    let team_id = store.insert_team("Test Team").unwrap();
    let season_id = store
        .insert_season("2024", date(2024, 1, 1), date(2024, 12, 31))
        .unwrap();
    let m1 = new_match(&store, team_id, season_id, date(2024, 6, 1), (2, 1));

    // PERCENT out of range.
    let err = store
        .upsert_team_value(catalog, m1, "team_possession_pct", MetricSide::Own, 140.0)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidValue { .. }));

    // Derived metrics never have stored rows.
    let err = store
        .upsert_team_value(catalog, m1, "team_attempts", MetricSide::Own, 7.0)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidValue { .. }));

    let player_id = store.insert_player(team_id, "Ada", "Moss", "FW").unwrap();
    let err = store
        .upsert_player_value(catalog, m1, player_id, "player_conversion_rate", 50.0)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidValue { .. }));
}

#[test]
fn engine_runs_end_to_end_on_sqlite() {
    let store = SqliteStore::in_memory().unwrap();
    let catalog = MetricCatalog::builtin();
    let team_id = store.insert_team("Test Team").unwrap();
    let season_id = store
        .insert_season("2024", date(2024, 1, 1), date(2024, 12, 31))
        .unwrap();
    let m1 = new_match(&store, team_id, season_id, date(2024, 6, 1), (3, 1));
    new_match(&store, team_id, season_id, date(2024, 6, 8), (1, 1));
    new_match(&store, team_id, season_id, date(2024, 6, 15), (2, 3));
    new_match(&store, team_id, season_id, date(2024, 6, 22), (4, 0));

    store
        .upsert_team_value(catalog, m1, "team_goals_scored", MetricSide::Own, 2.0)
        .unwrap();
    store
        .upsert_team_value(catalog, m1, "team_shots", MetricSide::Own, 5.0)
        .unwrap();

    let analytics = Analytics::new(&store, catalog);

    let kpis = analytics
        .team_kpis(team_id, &["team_attempts", "team_win_rate"], None, None, None, false)
        .unwrap();
    assert_eq!(kpis[0].metric_slug, "team_attempts");
    assert_eq!(kpis[0].value, 7.0);
    assert_eq!(kpis[1].value, 50.0);

    let player_id = store.insert_player(team_id, "Ada", "Moss", "FW").unwrap();
    store
        .insert_participation(&Participation {
            match_id: m1,
            player_id,
            is_starter: true,
            is_captain: true,
            minutes_played: Some(90),
            position_played: Some("FW".to_string()),
        })
        .unwrap();
    store
        .upsert_player_value(catalog, m1, player_id, "player_goals", 2.0)
        .unwrap();

    let board = analytics
        .player_leaderboard(team_id, "player_goals", None, 5)
        .unwrap();
    assert_eq!(board.entries.len(), 1);
    assert_eq!(board.entries[0].value, 2.0);
    assert_eq!(board.entries[0].matches_played, 1);

    let summary = analytics.match_summary(m1).unwrap();
    assert_eq!(summary.participations.len(), 1);
    assert_eq!(summary.player_grid.players.len(), 1);
    assert_eq!(summary.team_metrics.own.len(), 2);
}

#[test]
fn demo_dataset_is_consistent_with_itself() {
    let store = SqliteStore::in_memory().unwrap();
    let catalog = MetricCatalog::builtin();
    let report = demo::seed_demo(&store, catalog, 7).unwrap();
    assert_eq!(report.matches, 14);
    assert!(report.players >= 11);

    let matches = store.list_matches(report.team_id, None, None, None).unwrap();
    assert_eq!(matches.len(), report.matches);

    // The demo mirrors the score into the goals metric, so the KPI sum must
    // equal the summed score line.
    let expected_goals: f64 = matches.iter().filter_map(|m| m.score_for).map(f64::from).sum();
    let analytics = Analytics::new(&store, catalog);
    let kpis = analytics
        .team_kpis(report.team_id, &["team_goals_scored"], None, None, None, false)
        .unwrap();
    assert_eq!(kpis[0].value, expected_goals);

    // Player goals were spread across lineups: the leaderboard total matches
    // the same score line.
    let board = analytics
        .player_leaderboard(report.team_id, "player_goals", None, usize::MAX)
        .unwrap();
    let board_total: f64 = board.entries.iter().map(|e| e.value).sum();
    assert_eq!(board_total, expected_goals);

    // Every match renders a summary.
    for m in &matches {
        let summary = analytics.match_summary(m.id).unwrap();
        assert!(!summary.team_metrics.own.is_empty());
    }
}

#[test]
fn same_seed_reproduces_the_same_demo_dataset() {
    let catalog = MetricCatalog::builtin();

    let store_a = SqliteStore::in_memory().unwrap();
    let report_a = demo::seed_demo(&store_a, catalog, 42).unwrap();
    let store_b = SqliteStore::in_memory().unwrap();
    let report_b = demo::seed_demo(&store_b, catalog, 42).unwrap();

    assert_eq!(report_a.team_values, report_b.team_values);
    assert_eq!(report_a.player_values, report_b.player_values);

    let matches_a = store_a.list_matches(report_a.team_id, None, None, None).unwrap();
    let matches_b = store_b.list_matches(report_b.team_id, None, None, None).unwrap();
    let scores_a: Vec<(Option<i32>, Option<i32>)> =
        matches_a.iter().map(|m| (m.score_for, m.score_against)).collect();
    let scores_b: Vec<(Option<i32>, Option<i32>)> =
        matches_b.iter().map(|m| (m.score_for, m.score_against)).collect();
    assert_eq!(scores_a, scores_b);
}
