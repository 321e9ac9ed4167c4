//! Synthetic demo dataset: a seeded season of matches with team and player
//! metric values, the in-repo stand-in for a real ingest.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::catalog::{MetricCatalog, MetricDataType, MetricScope, MetricSide};
use crate::store::{MatchType, NewMatch, Participation, SqliteStore, ValueLookup};
use crate::{MatchId, PlayerId, Result, SeasonId, TeamId};

const TEAM_NAME: &str = "Riverside Athletic";
const SEASON_LABEL: &str = "2025/2026";

const OPPONENTS: &[&str] = &[
    "Harbour Rovers",
    "Northgate United",
    "Millbrook Town",
    "Eastfield Wanderers",
    "Kings Dock FC",
    "Ashworth City",
    "Bridgewater FC",
];

const SQUAD: &[(&str, &str, &str)] = &[
    ("Adam", "Keller", "GK"),
    ("Lucas", "Brandt", "DF"),
    ("Theo", "Marsh", "DF"),
    ("Oliver", "Stein", "DF"),
    ("Nathan", "Voss", "DF"),
    ("Elias", "Romero", "MF"),
    ("Jonas", "Falk", "MF"),
    ("Milo", "Hartmann", "MF"),
    ("Victor", "Lindqvist", "MF"),
    ("Samuel", "Okafor", "FW"),
    ("Daniel", "Moreau", "FW"),
    ("Felix", "Weber", "GK"),
    ("Ruben", "Costa", "DF"),
    ("Ivan", "Petrov", "MF"),
    ("Marco", "Silva", "FW"),
    ("Noah", "Berger", "FW"),
];

const MATCHES: usize = 14;

#[derive(Debug, Clone)]
pub struct DemoReport {
    pub team_id: TeamId,
    pub season_id: SeasonId,
    pub matches: usize,
    pub players: usize,
    pub team_values: usize,
    pub player_values: usize,
}

/// Seed a complete demo dataset into `store`. The same seed produces the same
/// dataset, so reports stay comparable across runs.
pub fn seed_demo(store: &SqliteStore, catalog: &MetricCatalog, seed: u64) -> Result<DemoReport> {
    let mut rng = StdRng::seed_from_u64(seed);

    let team_id = store.insert_team(TEAM_NAME)?;
    let season_start = NaiveDate::from_ymd_opt(2025, 8, 1).expect("valid date");
    let season_end = NaiveDate::from_ymd_opt(2026, 5, 31).expect("valid date");
    let season_id = store.insert_season(SEASON_LABEL, season_start, season_end)?;

    let mut players = Vec::new();
    for (first, last, position) in SQUAD {
        players.push((store.insert_player(team_id, first, last, position)?, *position));
    }

    let raw_team_metrics = catalog.list(Some(MetricScope::Team), None, Some(false));
    let player_event_metrics: Vec<&str> = [
        "player_goals",
        "player_shots",
        "player_corners",
        "player_free_kicks",
        "player_goal_assists",
        "player_throw_ins",
    ]
    .into_iter()
    .filter(|slug| catalog.get(slug).is_some())
    .collect();

    let mut team_values = 0usize;
    let mut player_values = 0usize;

    let first_kickoff = NaiveDate::from_ymd_opt(2025, 8, 16).expect("valid date");
    for round in 0..MATCHES {
        let date = first_kickoff + Duration::days(7 * round as i64);
        let score_for = rng.gen_range(0..=4);
        let score_against = rng.gen_range(0..=3);
        let match_id = store.insert_match(&NewMatch {
            team_id,
            season_id,
            date,
            opponent_name: OPPONENTS[round % OPPONENTS.len()].to_string(),
            is_home: round % 2 == 0,
            match_type: if round == 6 { MatchType::Cup } else { MatchType::League },
            competition: None,
            score_for: Some(score_for),
            score_against: Some(score_against),
        })?;

        let lineup = seed_participations(store, match_id, &players, &mut rng)?;

        team_values +=
            seed_team_values(store, catalog, match_id, &raw_team_metrics, score_for, score_against, &mut rng)?;
        player_values += seed_player_values(
            store,
            catalog,
            match_id,
            &lineup,
            &player_event_metrics,
            score_for,
            &mut rng,
        )?;
    }

    Ok(DemoReport {
        team_id,
        season_id,
        matches: MATCHES,
        players: players.len(),
        team_values,
        player_values,
    })
}

/// Eleven starters plus a couple of substitutes; the first listed player
/// wears the armband when fielded.
fn seed_participations(
    store: &SqliteStore,
    match_id: MatchId,
    players: &[(PlayerId, &str)],
    rng: &mut StdRng,
) -> Result<Vec<PlayerId>> {
    let skip = rng.gen_range(0..players.len());
    let fielded: Vec<(usize, PlayerId, &str)> = players
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != skip)
        .map(|(idx, (id, position))| (idx, *id, *position))
        .take(13)
        .collect();

    let mut lineup = Vec::with_capacity(fielded.len());
    for (rank, (idx, player_id, position)) in fielded.iter().enumerate() {
        let is_starter = rank < 11;
        store.insert_participation(&Participation {
            match_id,
            player_id: *player_id,
            is_starter,
            is_captain: *idx == 0,
            minutes_played: Some(if is_starter { 90 } else { rng.gen_range(10..=35) }),
            position_played: Some(position.to_string()),
        })?;
        lineup.push(*player_id);
    }
    Ok(lineup)
}

fn seed_team_values(
    store: &SqliteStore,
    catalog: &MetricCatalog,
    match_id: MatchId,
    raw_team_metrics: &[&crate::catalog::MetricDefinition],
    score_for: i32,
    score_against: i32,
    rng: &mut StdRng,
) -> Result<usize> {
    let mut written = 0usize;
    for def in raw_team_metrics {
        let value = match def.slug.as_str() {
            // Goal rows mirror the recorded score.
            "team_goals_scored" => score_for as f64,
            "team_goals_conceded" => score_against as f64,
            "team_shots" => rng.gen_range(score_for..=score_for + 12) as f64,
            "team_shots_conceded" => rng.gen_range(score_against..=score_against + 10) as f64,
            _ => match def.datatype {
                MetricDataType::Percent => f64::from(rng.gen_range(250..=750)) / 10.0,
                MetricDataType::Float => f64::from(rng.gen_range(100..=600)) / 10.0,
                MetricDataType::Int => f64::from(rng.gen_range(0..=30)),
            },
        };
        let side = if def.side == MetricSide::None { MetricSide::Own } else { def.side };
        store.upsert_team_value(catalog, match_id, &def.slug, side, value)?;
        written += 1;
    }
    Ok(written)
}

fn seed_player_values(
    store: &SqliteStore,
    catalog: &MetricCatalog,
    match_id: MatchId,
    lineup: &[PlayerId],
    player_event_metrics: &[&str],
    score_for: i32,
    rng: &mut StdRng,
) -> Result<usize> {
    let mut written = 0usize;

    // Spread the goals over the lineup so player totals add up to the score.
    let mut goals_left = score_for;
    while goals_left > 0 {
        let scorer = lineup[rng.gen_range(0..lineup.len())];
        let existing = store.player_value(match_id, scorer, "player_goals")?.unwrap_or(0.0);
        store.upsert_player_value(catalog, match_id, scorer, "player_goals", existing + 1.0)?;
        goals_left -= 1;
        written += 1;
    }

    for player_id in lineup {
        for slug in player_event_metrics {
            if *slug == "player_goals" || rng.gen_range(0..10) < 4 {
                continue;
            }
            let value = f64::from(rng.gen_range(0..=4));
            store.upsert_player_value(catalog, match_id, *player_id, slug, value)?;
            written += 1;
        }
    }
    Ok(written)
}
