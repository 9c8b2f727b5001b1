//! Raw MLB Stats API response shapes.  Only the fields the bot reads are modeled, and nearly
//! everything is optional because the API omits keys freely.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeopleResponse {
    pub people: Vec<Person>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Person {
    pub id: u64,
    pub full_name: String,
    pub primary_number: Option<String>,
    pub current_team: Option<TeamRef>,
    pub primary_position: Option<Position>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TeamRef {
    pub id: Option<u64>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Position {
    pub abbreviation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TeamsResponse {
    pub teams: Vec<TeamRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScheduleResponse {
    pub dates: Vec<ScheduleDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScheduleDate {
    pub games: Vec<ScheduleGame>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleGame {
    pub game_pk: u64,
    pub game_date: Option<String>,
    pub status: GameStatus,
    pub teams: Sides<ScheduleTeam>,
    pub linescore: Linescore,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameStatus {
    pub abstract_game_state: Option<String>,
    pub detailed_state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, bound = "T: Deserialize<'de> + Default")]
pub struct Sides<T> {
    pub away: T,
    pub home: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScheduleTeam {
    pub team: TeamRef,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Linescore {
    pub current_inning: Option<u32>,
    pub inning_state: Option<String>,
    pub teams: Sides<LinescoreTeam>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LinescoreTeam {
    pub runs: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveFeed {
    pub live_data: LiveData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LiveData {
    pub plays: Plays,
    pub boxscore: Boxscore,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Plays {
    pub all_plays: Vec<Play>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Play {
    pub at_bat_index: u32,
    pub result: PlayResult,
    pub about: PlayAbout,
    pub matchup: Matchup,
    pub runners: Vec<Runner>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlayResult {
    pub event: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayAbout {
    pub inning: Option<u32>,
    pub half_inning: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Matchup {
    pub batter: PersonRef,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PersonRef {
    pub id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Runner {
    pub movement: Movement,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Movement {
    pub start: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Boxscore {
    pub teams: Sides<BoxscoreTeam>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BoxscoreTeam {
    /// Keyed `ID<player id>`.
    pub players: HashMap<String, BoxscorePlayer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BoxscorePlayer {
    pub person: PersonRef,
    pub stats: BoxscoreStats,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BoxscoreStats {
    pub batting: CountingStats,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CountingStats {
    pub hits: u32,
    pub at_bats: u32,
    pub rbi: u32,
    pub runs: u32,
    pub home_runs: u32,
    pub base_on_balls: u32,
    pub strike_outs: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatsResponse {
    pub stats: Vec<StatGroup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatGroup {
    pub splits: Vec<Split>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Split {
    pub stat: SeasonStat,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeasonStat {
    pub avg: Option<String>,
    pub obp: Option<String>,
    pub slg: Option<String>,
    pub hits: u32,
    pub at_bats: u32,
    pub rbi: u32,
    pub runs: u32,
    pub home_runs: u32,
}
