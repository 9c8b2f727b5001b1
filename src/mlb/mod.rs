//! Read-only client for the public MLB Stats API

mod api;

use crate::{config::MlbSettings, log_internal, roster::TrackedPlayer};
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;

pub use api::LiveFeed;

const USER_AGENT: &str = concat!("mlbbot/", env!("CARGO_PKG_VERSION"));
const HIT_EVENTS: [&str; 4] = ["Single", "Double", "Triple", "Home Run"];

/// A tracked player's game on a given day
#[derive(Clone, Debug, PartialEq)]
pub struct GameInfo {
    pub game_pk: u64,
    pub away_team: String,
    pub home_team: String,
    pub away_score: u32,
    pub home_score: u32,
    pub inning: u32,
    pub inning_state: String,
    /// Start time in the configured timezone, or `TBD`.
    pub game_time: String,
    pub is_final: bool,
}

/// A completed plate appearance
#[derive(Clone, Debug, PartialEq)]
pub struct AtBat {
    pub index: u32,
    pub result: String,
    pub description: String,
    pub was_hit: bool,
    /// Runners in scoring position when the at-bat began.
    pub risp: bool,
    /// e.g. `Top 3`
    pub inning: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SeasonStats {
    pub avg: String,
    pub obp: String,
    pub slg: String,
    pub hits: u32,
    pub at_bats: u32,
    pub rbi: u32,
    pub runs: u32,
    pub home_runs: u32,
}

impl Default for SeasonStats {
    fn default() -> Self {
        Self {
            avg: ".000".to_owned(),
            obp: ".000".to_owned(),
            slg: ".000".to_owned(),
            hits: 0,
            at_bats: 0,
            rbi: 0,
            runs: 0,
            home_runs: 0,
        }
    }
}

/// One player's batting line for one game
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameLine {
    pub hits: u32,
    pub at_bats: u32,
    pub rbi: u32,
    pub runs: u32,
    pub home_runs: u32,
    pub walks: u32,
    pub strikeouts: u32,
}

#[derive(Clone)]
pub struct MlbClient {
    client: reqwest::Client,
    base_url: String,
    live_base_url: String,
    tz: Tz,
}

impl MlbClient {
    pub fn new(settings: &MlbSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout())
            .build()
            .map_err(|e| anyhow!("Could not build HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            live_base_url: settings.live_base_url.trim_end_matches('/').to_owned(),
            tz: settings.tz()?,
        })
    }

    /// Today's date where the games are being played.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        log_internal!("GET {}", url);
        self.client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| anyhow!("Request to {} failed: {}", url, e))?
            .error_for_status()
            .map_err(|e| anyhow!("Request to {} failed: {}", url, e))?
            .json::<T>()
            .await
            .map_err(|e| anyhow!("Could not decode response from {}: {}", url, e))
    }

    /// Every active player whose full name contains `query`, ignoring case.
    pub async fn search_players(&self, query: &str) -> Result<Vec<TrackedPlayer>> {
        let season = self.today().format("%Y").to_string();

        let people: api::PeopleResponse = self
            .get(
                &format!("{}/sports/1/players", self.base_url),
                &[("season", season.clone()), ("gameType", "R".to_owned())],
            )
            .await?;

        let teams: api::TeamsResponse = self
            .get(
                &format!("{}/teams", self.base_url),
                &[("sportId", "1".to_owned()), ("season", season)],
            )
            .await?;

        Ok(match_players(people, teams, query))
    }

    /// The player's current team, which may differ from the roster after a trade.
    pub async fn current_team_id(&self, player_id: u64) -> Result<Option<u64>> {
        let people: api::PeopleResponse = self
            .get(&format!("{}/people/{}", self.base_url, player_id), &[])
            .await?;

        Ok(people
            .people
            .into_iter()
            .next()
            .and_then(|p| p.current_team)
            .and_then(|t| t.id))
    }

    pub async fn game_on(&self, team_id: u64, date: NaiveDate) -> Result<Option<GameInfo>> {
        let schedule: api::ScheduleResponse = self
            .get(
                &format!("{}/schedule", self.base_url),
                &[
                    ("teamId", team_id.to_string()),
                    ("date", date.format("%Y-%m-%d").to_string()),
                    ("sportId", "1".to_owned()),
                    ("hydrate", "linescore,team".to_owned()),
                ],
            )
            .await?;

        Ok(pick_game(schedule).map(|game| game_info(game, &self.tz)))
    }

    pub async fn live_feed(&self, game_pk: u64) -> Result<LiveFeed> {
        self.get(
            &format!("{}/game/{}/feed/live", self.live_base_url, game_pk),
            &[],
        )
        .await
    }

    pub async fn season_stats(&self, player_id: u64) -> Result<SeasonStats> {
        let stats: api::StatsResponse = self
            .get(
                &format!("{}/people/{}/stats", self.base_url, player_id),
                &[
                    ("stats", "season".to_owned()),
                    ("season", self.today().format("%Y").to_string()),
                    ("group", "hitting".to_owned()),
                ],
            )
            .await?;

        Ok(season_stats(stats))
    }
}

fn match_players(
    people: api::PeopleResponse,
    teams: api::TeamsResponse,
    query: &str,
) -> Vec<TrackedPlayer> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let team_names: HashMap<u64, String> = teams
        .teams
        .into_iter()
        .filter_map(|t| Some((t.id?, t.name?)))
        .collect();

    people
        .people
        .into_iter()
        .filter(|p| p.full_name.to_lowercase().contains(&query))
        .map(|p| {
            let team_id = p.current_team.as_ref().and_then(|t| t.id);
            let team = p
                .current_team
                .and_then(|t| t.name)
                .or_else(|| team_id.and_then(|id| team_names.get(&id).cloned()))
                .unwrap_or_else(|| "Unknown".to_owned());

            TrackedPlayer {
                id: p.id,
                name: p.full_name,
                primary_number: p.primary_number,
                team,
                team_id,
                position: p
                    .primary_position
                    .and_then(|pos| pos.abbreviation)
                    .unwrap_or_else(|| "N/A".to_owned()),
            }
        })
        .collect()
}

/// The game in progress, else the latest finished game, else the first of the day.  Between
/// games of a doubleheader the finished one is kept until the next one starts.
fn pick_game(schedule: api::ScheduleResponse) -> Option<api::ScheduleGame> {
    let mut games: Vec<api::ScheduleGame> = schedule
        .dates
        .into_iter()
        .flat_map(|d| d.games)
        .collect();

    let state = |g: &api::ScheduleGame| g.status.abstract_game_state.clone();
    let live = games.iter().position(|g| state(g).as_deref() == Some("Live"));
    let last_final = games
        .iter()
        .rposition(|g| state(g).as_deref() == Some("Final"));

    match (live, last_final) {
        (Some(i), _) | (None, Some(i)) => Some(games.swap_remove(i)),
        (None, None) if games.is_empty() => None,
        (None, None) => Some(games.swap_remove(0)),
    }
}

fn game_info(game: api::ScheduleGame, tz: &Tz) -> GameInfo {
    let api::ScheduleGame {
        game_pk,
        game_date,
        status,
        teams,
        linescore,
    } = game;

    GameInfo {
        game_pk,
        away_team: teams.away.team.name.unwrap_or_default(),
        home_team: teams.home.team.name.unwrap_or_default(),
        away_score: linescore.teams.away.runs.unwrap_or(0),
        home_score: linescore.teams.home.runs.unwrap_or(0),
        inning: linescore.current_inning.unwrap_or(1),
        inning_state: linescore.inning_state.unwrap_or_default(),
        game_time: game_date
            .as_deref()
            .and_then(|d| format_game_time(d, tz))
            .unwrap_or_else(|| "TBD".to_owned()),
        is_final: status.detailed_state.as_deref() == Some("Final"),
    }
}

fn format_game_time(game_date: &str, tz: &Tz) -> Option<String> {
    let start = DateTime::parse_from_rfc3339(game_date).ok()?;
    Some(
        start
            .with_timezone(tz)
            .format("%I:%M %p %Z")
            .to_string()
            .trim_start_matches('0')
            .to_owned(),
    )
}

/// Completed plate appearances by `player_id`, in the order they happened.
pub fn completed_at_bats(feed: &LiveFeed, player_id: u64) -> Vec<AtBat> {
    feed.live_data
        .plays
        .all_plays
        .iter()
        .filter(|play| play.matchup.batter.id == Some(player_id))
        .filter_map(at_bat)
        .collect()
}

fn at_bat(play: &api::Play) -> Option<AtBat> {
    let event = play.result.event.as_deref().filter(|e| !e.is_empty())?;
    let description = play
        .result
        .description
        .as_deref()
        .filter(|d| !d.is_empty())?;

    let risp = play
        .runners
        .iter()
        .any(|r| matches!(r.movement.start.as_deref(), Some("2B") | Some("3B")));

    Some(AtBat {
        index: play.at_bat_index,
        result: event.to_owned(),
        description: description.to_owned(),
        was_hit: HIT_EVENTS.contains(&event),
        risp,
        inning: inning_label(
            play.about.half_inning.as_deref().unwrap_or("top"),
            play.about.inning.unwrap_or(1),
        ),
    })
}

fn inning_label(half: &str, inning: u32) -> String {
    let mut chars = half.chars();
    let half = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    };
    format!("{} {}", half, inning)
}

/// Box score line for `player_id`, searching both teams.
pub fn game_line(feed: &LiveFeed, player_id: u64) -> Option<GameLine> {
    let teams = &feed.live_data.boxscore.teams;
    [&teams.away, &teams.home]
        .into_iter()
        .flat_map(|team| team.players.values())
        .find(|p| p.person.id == Some(player_id))
        .map(|p| {
            let b = &p.stats.batting;
            GameLine {
                hits: b.hits,
                at_bats: b.at_bats,
                rbi: b.rbi,
                runs: b.runs,
                home_runs: b.home_runs,
                walks: b.base_on_balls,
                strikeouts: b.strike_outs,
            }
        })
}

fn season_stats(stats: api::StatsResponse) -> SeasonStats {
    let Some(stat) = stats
        .stats
        .into_iter()
        .next()
        .and_then(|g| g.splits.into_iter().next())
        .map(|s| s.stat)
    else {
        return SeasonStats::default();
    };

    SeasonStats {
        avg: rate_stat(stat.avg.as_deref()),
        obp: rate_stat(stat.obp.as_deref()),
        slg: rate_stat(stat.slg.as_deref()),
        hits: stat.hits,
        at_bats: stat.at_bats,
        rbi: stat.rbi,
        runs: stat.runs,
        home_runs: stat.home_runs,
    }
}

/// Baseball rate stats drop the leading zero: `0.287` is shown as `.287`, `1.000` is kept.
pub fn rate_stat(raw: Option<&str>) -> String {
    let Some(value) = raw.map(str::trim).and_then(|r| r.parse::<f64>().ok()) else {
        return ".000".to_owned();
    };
    if !value.is_finite() || value < 0.0 {
        return ".000".to_owned();
    }

    let formatted = format!("{:.3}", value);
    match formatted.strip_prefix('0') {
        Some(rest) => rest.to_owned(),
        None => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed() -> LiveFeed {
        serde_json::from_str(
            r#"{
              "liveData": {
                "plays": { "allPlays": [
                  { "atBatIndex": 0,
                    "result": { "event": "Strikeout", "description": "Shohei Ohtani strikes out swinging." },
                    "about": { "inning": 1, "halfInning": "top" },
                    "matchup": { "batter": { "id": 660271 } },
                    "runners": [] },
                  { "atBatIndex": 1,
                    "result": { "event": "Walk", "description": "Freddie Freeman walks." },
                    "about": { "inning": 1, "halfInning": "top" },
                    "matchup": { "batter": { "id": 518692 } },
                    "runners": [ { "movement": { "start": null, "end": "1B" } } ] },
                  { "atBatIndex": 9,
                    "result": { "event": "Double", "description": "Shohei Ohtani doubles (12) on a line drive." },
                    "about": { "inning": 3, "halfInning": "bottom" },
                    "matchup": { "batter": { "id": 660271 } },
                    "runners": [
                      { "movement": { "start": null, "end": "2B" } },
                      { "movement": { "start": "2B", "end": "score" } }
                    ] },
                  { "atBatIndex": 17,
                    "result": {},
                    "about": { "inning": 5, "halfInning": "bottom" },
                    "matchup": { "batter": { "id": 660271 } } }
                ] },
                "boxscore": { "teams": {
                  "away": { "players": {
                    "ID518692": { "person": { "id": 518692 }, "stats": { "batting": { "hits": 0, "atBats": 2 } } }
                  } },
                  "home": { "players": {
                    "ID660271": { "person": { "id": 660271 },
                      "stats": { "batting": { "hits": 2, "atBats": 4, "rbi": 3, "runs": 1, "homeRuns": 1, "baseOnBalls": 1, "strikeOuts": 1 } } }
                  } }
                } }
              }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn only_completed_plays_by_the_batter_count() {
        let at_bats = completed_at_bats(&feed(), 660271);
        assert_eq!(at_bats.len(), 2);
        assert_eq!(at_bats[0].index, 0);
        assert!(!at_bats[0].was_hit);
        assert!(!at_bats[0].risp);
        assert_eq!(at_bats[0].inning, "Top 1");

        let double = &at_bats[1];
        assert_eq!(double.index, 9);
        assert_eq!(double.result, "Double");
        assert!(double.was_hit);
        assert!(double.risp);
        assert_eq!(double.inning, "Bottom 3");
    }

    #[test]
    fn box_score_line_is_found_on_either_side() {
        let line = game_line(&feed(), 660271).unwrap();
        assert_eq!(line.hits, 2);
        assert_eq!(line.at_bats, 4);
        assert_eq!(line.rbi, 3);
        assert_eq!(line.home_runs, 1);
        assert_eq!(line.walks, 1);

        assert_eq!(game_line(&feed(), 518692).unwrap().at_bats, 2);
        assert_eq!(game_line(&feed(), 1), None);
    }

    #[test]
    fn rate_stats_drop_the_leading_zero() {
        assert_eq!(rate_stat(Some(".287")), ".287");
        assert_eq!(rate_stat(Some("0.287")), ".287");
        assert_eq!(rate_stat(Some("1.000")), "1.000");
        assert_eq!(rate_stat(Some(".-- ")), ".000");
        assert_eq!(rate_stat(None), ".000");
    }

    #[test]
    fn missing_season_split_falls_back_to_zeros() {
        let empty: api::StatsResponse = serde_json::from_str(r#"{ "stats": [ { "splits": [] } ] }"#).unwrap();
        assert_eq!(season_stats(empty), SeasonStats::default());

        let judge: api::StatsResponse = serde_json::from_str(
            r#"{ "stats": [ { "splits": [ { "stat": {
                "avg": ".322", "obp": ".458", "slg": ".701",
                "hits": 180, "atBats": 559, "rbi": 144, "runs": 122, "homeRuns": 58 } } ] } ] }"#,
        )
        .unwrap();
        let stats = season_stats(judge);
        assert_eq!((stats.avg.as_str(), stats.obp.as_str(), stats.slg.as_str()), (".322", ".458", ".701"));
        assert_eq!(stats.home_runs, 58);
    }

    fn schedule(states: &[(u64, &str)]) -> api::ScheduleResponse {
        let games: Vec<String> = states
            .iter()
            .map(|(pk, state)| {
                format!(
                    r#"{{ "gamePk": {}, "status": {{ "abstractGameState": "{}", "detailedState": "{}" }} }}"#,
                    pk, state, state
                )
            })
            .collect();
        serde_json::from_str(&format!(r#"{{ "dates": [ {{ "games": [{}] }} ] }}"#, games.join(","))).unwrap()
    }

    #[test]
    fn doubleheaders_follow_the_game_in_progress() {
        let game = pick_game(schedule(&[(1, "Final"), (2, "Live")])).unwrap();
        assert_eq!(game.game_pk, 2);

        // Between games the finished one is kept until the second starts.
        let game = pick_game(schedule(&[(1, "Final"), (2, "Preview")])).unwrap();
        assert_eq!(game.game_pk, 1);

        let game = pick_game(schedule(&[(1, "Final"), (2, "Final")])).unwrap();
        assert_eq!(game.game_pk, 2);

        let game = pick_game(schedule(&[(1, "Preview"), (2, "Preview")])).unwrap();
        assert_eq!(game.game_pk, 1);

        assert!(pick_game(schedule(&[])).is_none());
        assert!(pick_game(api::ScheduleResponse::default()).is_none());
    }

    #[test]
    fn schedule_game_is_flattened_with_local_start_time() {
        let schedule: api::ScheduleResponse = serde_json::from_str(
            r#"{ "dates": [ { "games": [ {
                "gamePk": 746123,
                "gameDate": "2024-07-04T23:10:00Z",
                "status": { "abstractGameState": "Live", "detailedState": "In Progress" },
                "teams": {
                  "away": { "team": { "id": 147, "name": "New York Yankees" } },
                  "home": { "team": { "id": 111, "name": "Boston Red Sox" } }
                },
                "linescore": {
                  "currentInning": 4, "inningState": "Middle",
                  "teams": { "away": { "runs": 3 }, "home": { "runs": 1 } }
                }
            } ] } ] }"#,
        )
        .unwrap();

        let info = game_info(pick_game(schedule).unwrap(), &chrono_tz::America::New_York);
        assert_eq!(
            info,
            GameInfo {
                game_pk: 746123,
                away_team: "New York Yankees".to_owned(),
                home_team: "Boston Red Sox".to_owned(),
                away_score: 3,
                home_score: 1,
                inning: 4,
                inning_state: "Middle".to_owned(),
                game_time: "7:10 PM EDT".to_owned(),
                is_final: false,
            }
        );
    }

    #[test]
    fn unparseable_start_time_is_tbd() {
        let game: api::ScheduleGame = serde_json::from_str(r#"{ "gamePk": 1, "gameDate": "soon" }"#).unwrap();
        let info = game_info(game, &chrono_tz::America::New_York);
        assert_eq!(info.game_time, "TBD");
        assert_eq!(info.inning, 1);
        assert!(!info.is_final);
    }

    #[test]
    fn player_search_is_case_insensitive_and_fills_team_names() {
        let people: api::PeopleResponse = serde_json::from_str(
            r#"{ "people": [
                { "id": 669257, "fullName": "Will Smith", "primaryNumber": "16",
                  "currentTeam": { "id": 119 }, "primaryPosition": { "abbreviation": "C" } },
                { "id": 519293, "fullName": "Will Smith",
                  "currentTeam": { "id": 144 }, "primaryPosition": { "abbreviation": "P" } },
                { "id": 605141, "fullName": "Mookie Betts", "currentTeam": { "id": 119 } }
            ] }"#,
        )
        .unwrap();
        let teams: api::TeamsResponse = serde_json::from_str(
            r#"{ "teams": [ { "id": 119, "name": "Los Angeles Dodgers" }, { "id": 144, "name": "Atlanta Braves" } ] }"#,
        )
        .unwrap();

        let found = match_players(people, teams, "  will SMITH");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].team, "Los Angeles Dodgers");
        assert_eq!(found[0].number(), "16");
        assert_eq!(found[0].position, "C");
        assert_eq!(found[1].team, "Atlanta Braves");
        assert_eq!(found[1].team_id, Some(144));
        assert_eq!(found[1].number(), "N/A");
    }

    #[test]
    fn blank_search_finds_nobody() {
        let people: api::PeopleResponse =
            serde_json::from_str(r#"{ "people": [ { "id": 1, "fullName": "Anybody" } ] }"#).unwrap();
        assert!(match_players(people, api::TeamsResponse::default(), " ").is_empty());
    }
}
