use chrono::NaiveDate;

use squadmetrics::aggregate::Analytics;
use squadmetrics::catalog::MetricCatalog;
use squadmetrics::store::{Match, MatchType, MemoryStore, Participation, Player};
use squadmetrics::{MatchId, PlayerId, SeasonId, TeamId};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn league_match(id: i64, on: NaiveDate) -> Match {
    Match {
        id: MatchId(id),
        team_id: TeamId(1),
        season_id: SeasonId(1),
        date: on,
        opponent_name: format!("Opponent {id}"),
        is_home: true,
        match_type: MatchType::League,
        competition: None,
        score_for: Some(1),
        score_against: Some(0),
    }
}

fn player(id: i64, first: &str, last: &str) -> Player {
    Player {
        id: PlayerId(id),
        team_id: TeamId(1),
        first_name: first.to_string(),
        last_name: last.to_string(),
        main_position: "MF".to_string(),
    }
}

fn participation(match_id: i64, player_id: i64) -> Participation {
    Participation {
        match_id: MatchId(match_id),
        player_id: PlayerId(player_id),
        is_starter: true,
        is_captain: false,
        minutes_played: Some(90),
        position_played: None,
    }
}

fn fixture() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.add_match(league_match(1, date(2024, 6, 1)));
    store.add_match(league_match(2, date(2024, 6, 8)));
    store.add_player(player(1, "Ada", "Moss"));
    store.add_player(player(2, "Ben", "Cole"));
    store.add_player(player(3, "Cal", "Reed"));
    for match_id in [1, 2] {
        for player_id in [1, 2] {
            store.add_participation(participation(match_id, player_id));
        }
    }
    store
}

#[test]
fn entries_are_ranked_by_value_descending() {
    let mut store = fixture();
    store.add_player_value(MatchId(1), PlayerId(1), "player_goals", 1.0);
    store.add_player_value(MatchId(2), PlayerId(1), "player_goals", 1.0);
    store.add_player_value(MatchId(1), PlayerId(2), "player_goals", 3.0);

    let analytics = Analytics::new(&store, MetricCatalog::builtin());
    let board = analytics
        .player_leaderboard(TeamId(1), "player_goals", None, 10)
        .unwrap();

    let names: Vec<&str> = board.entries.iter().map(|e| e.player_name.as_str()).collect();
    assert_eq!(names, vec!["Ben Cole", "Ada Moss"]);
    assert_eq!(board.entries[0].value, 3.0);
    assert_eq!(board.entries[1].value, 2.0);
    assert_eq!(board.entries[0].matches_played, 2);
}

#[test]
fn ties_break_by_player_name_ascending() {
    let mut store = fixture();
    store.add_player_value(MatchId(1), PlayerId(1), "player_goals", 2.0);
    store.add_player_value(MatchId(1), PlayerId(2), "player_goals", 2.0);

    let analytics = Analytics::new(&store, MetricCatalog::builtin());
    let board = analytics
        .player_leaderboard(TeamId(1), "player_goals", None, 10)
        .unwrap();

    let names: Vec<&str> = board.entries.iter().map(|e| e.player_name.as_str()).collect();
    assert_eq!(names, vec!["Ada Moss", "Ben Cole"]);
}

#[test]
fn player_without_participation_is_excluded_even_with_value_rows() {
    let mut store = fixture();
    // Cal Reed has metric rows but never a participation row.
    store.add_player_value(MatchId(1), PlayerId(3), "player_goals", 9.0);
    store.add_player_value(MatchId(1), PlayerId(1), "player_goals", 1.0);

    let analytics = Analytics::new(&store, MetricCatalog::builtin());
    let board = analytics
        .player_leaderboard(TeamId(1), "player_goals", None, 10)
        .unwrap();

    assert!(board.entries.iter().all(|e| e.player_name != "Cal Reed"));
    assert_eq!(board.entries.len(), 2);
}

#[test]
fn derived_player_metric_sums_resolver_values() {
    let mut store = fixture();
    store.add_player_value(MatchId(1), PlayerId(1), "player_goals", 2.0);
    store.add_player_value(MatchId(1), PlayerId(1), "player_goal_assists", 1.0);
    store.add_player_value(MatchId(2), PlayerId(1), "player_goals", 1.0);

    let analytics = Analytics::new(&store, MetricCatalog::builtin());
    let board = analytics
        .player_leaderboard(TeamId(1), "player_goal_involvements", None, 10)
        .unwrap();

    let ada = board.entries.iter().find(|e| e.player_name == "Ada Moss").unwrap();
    assert_eq!(ada.value, 4.0);
}

#[test]
fn result_is_truncated_to_top_n() {
    let mut store = fixture();
    store.add_participation(participation(1, 3));
    store.add_player_value(MatchId(1), PlayerId(1), "player_shots", 5.0);
    store.add_player_value(MatchId(1), PlayerId(2), "player_shots", 4.0);
    store.add_player_value(MatchId(1), PlayerId(3), "player_shots", 3.0);

    let analytics = Analytics::new(&store, MetricCatalog::builtin());
    let board = analytics
        .player_leaderboard(TeamId(1), "player_shots", None, 2)
        .unwrap();

    assert_eq!(board.entries.len(), 2);
    assert_eq!(board.entries[0].player_name, "Ada Moss");
}

#[test]
fn team_scope_or_unknown_slug_yields_an_empty_board() {
    let store = fixture();
    let analytics = Analytics::new(&store, MetricCatalog::builtin());

    let team_scope = analytics
        .player_leaderboard(TeamId(1), "team_goals_scored", None, 10)
        .unwrap();
    assert!(team_scope.entries.is_empty());

    let unknown = analytics
        .player_leaderboard(TeamId(1), "player_expected_goals", None, 10)
        .unwrap();
    assert!(unknown.entries.is_empty());
}

#[test]
fn empty_match_set_yields_an_empty_board() {
    let mut store = MemoryStore::new();
    store.add_player(player(1, "Ada", "Moss"));

    let analytics = Analytics::new(&store, MetricCatalog::builtin());
    let board = analytics
        .player_leaderboard(TeamId(1), "player_goals", None, 10)
        .unwrap();
    assert!(board.entries.is_empty());
}

#[test]
fn season_filter_restricts_the_match_set() {
    let mut store = fixture();
    let mut other_season = league_match(3, date(2025, 2, 1));
    other_season.season_id = SeasonId(2);
    store.add_match(other_season);
    store.add_participation(participation(3, 1));
    store.add_player_value(MatchId(3), PlayerId(1), "player_goals", 7.0);
    store.add_player_value(MatchId(1), PlayerId(1), "player_goals", 1.0);

    let analytics = Analytics::new(&store, MetricCatalog::builtin());
    let board = analytics
        .player_leaderboard(TeamId(1), "player_goals", Some(SeasonId(1)), 10)
        .unwrap();

    let ada = board.entries.iter().find(|e| e.player_name == "Ada Moss").unwrap();
    assert_eq!(ada.value, 1.0);
    assert_eq!(ada.matches_played, 2);
}
