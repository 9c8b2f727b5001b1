//! Periodic check of tracked players' games, posting each new at-bat into the configured channel.

use crate::{
    config::{Config, Storage},
    context::Context,
    embeds::{self, ScheduleEntry},
    log_error, log_event, log_internal,
    logging::PrintColor,
    mlb::{self, AtBat, GameInfo, LiveFeed, MlbClient},
    persistent_state::{PersistentState, SeenAtBat, SeenAtBats},
    roster::{Roster, TrackedPlayer},
    volatile_state::VolatileState,
};
use anyhow::Result;
use chrono::NaiveDate;
use serenity::all::{ChannelId, CreateMessage, Http};
use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
    time::Duration,
};
use tokio::{sync::RwLock, time::MissedTickBehavior};

pub struct Poller {
    cfg: Arc<RwLock<Config>>,
    pstate: Arc<RwLock<PersistentState>>,
    vstate: Arc<RwLock<VolatileState>>,
    mlb: MlbClient,
    http: Arc<Http>,
}

/// Settings read once per tick so a config reload never lands halfway through one.
struct TickSettings {
    storage: Storage,
    channel_id: ChannelId,
    post_daily_schedule: bool,
}

impl Poller {
    pub fn new(ctx: &Context<'_>) -> Self {
        Self {
            cfg: Arc::clone(ctx.cfg),
            pstate: Arc::clone(ctx.pstate),
            vstate: Arc::clone(ctx.vstate),
            mlb: ctx.mlb.clone(),
            http: Arc::clone(ctx.http),
        }
    }

    pub fn spawn(self) {
        tokio::spawn(self.run());
    }

    async fn run(self) {
        let mut period = self.cfg.read().await.poll.interval();
        let mut interval = Self::interval(period);
        log_internal!("Polling every {} minute(s)", period.as_secs() / 60);

        loop {
            interval.tick().await;

            if let Err(e) = self.tick().await {
                log_error!("Poll failed: {:#}", e);
            }

            // Pick up a changed interval after `/reload`.
            let configured = self.cfg.read().await.poll.interval();
            if configured != period {
                period = configured;
                interval = Self::interval(period);
                interval.tick().await;
                log_internal!("Polling every {} minute(s)", period.as_secs() / 60);
            }
        }
    }

    fn interval(period: Duration) -> tokio::time::Interval {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    async fn settings(&self) -> TickSettings {
        let cfg = self.cfg.read().await;
        TickSettings {
            storage: cfg.storage.clone(),
            channel_id: ChannelId::new(cfg.general.channel_id),
            post_daily_schedule: cfg.poll.post_daily_schedule,
        }
    }

    pub async fn tick(&self) -> Result<()> {
        let settings = self.settings().await;

        // Reload both files so hand edits between ticks are honored.
        let roster = {
            let mut pstate = self.pstate.write().await;
            pstate.roster = Roster::load(&settings.storage.roster_file).await?;
            pstate.seen = SeenAtBats::load(&settings.storage.seen_at_bats_file).await?;
            pstate.roster.clone()
        };

        if roster.is_empty() {
            log_internal!("No players to track");
            return Ok(());
        }

        let today = self.mlb.today();
        let posted_on = self.vstate.read().await.schedule_posted_on;
        if should_post_schedule(posted_on, today, settings.post_daily_schedule) {
            // A failed schedule must not hold up the at-bat checks; the next tick retries it.
            match self.post_schedule(&settings, &roster).await {
                Ok(()) => {
                    self.vstate.write().await.schedule_posted_on = Some(today);
                    log_event!("Posted the schedule for {}", today);
                }
                Err(e) => log_error!("Could not post the schedule for {}: {:#}", today, e),
            }
        }

        // Teammates share one game feed.
        let mut feeds: HashMap<u64, LiveFeed> = HashMap::new();
        for player in roster.list() {
            if let Err(e) = self.check_player(&settings, player, &mut feeds).await {
                log_error!("Error checking {}: {:#}", player.color(), e);
            }
        }

        Ok(())
    }

    async fn post_schedule(&self, settings: &TickSettings, roster: &Roster) -> Result<()> {
        let entries = todays_schedule(&self.mlb, roster.list()).await;
        settings
            .channel_id
            .send_message(
                &self.http,
                CreateMessage::new().embed(embeds::daily_schedule_embed(&entries)),
            )
            .await?;
        Ok(())
    }

    async fn check_player(
        &self,
        settings: &TickSettings,
        player: &TrackedPlayer,
        feeds: &mut HashMap<u64, LiveFeed>,
    ) -> Result<()> {
        let Some(team_id) = resolve_team(&self.mlb, player).await? else {
            log_internal!("{} has no team", player.color());
            return Ok(());
        };

        let Some(game) = self.mlb.game_on(team_id, self.mlb.today()).await? else {
            return Ok(());
        };

        let feed = match feeds.entry(game.game_pk) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(self.mlb.live_feed(game.game_pk).await?),
        };

        let at_bats = mlb::completed_at_bats(feed, player.id);
        let last = self.pstate.read().await.seen.last(player.id);
        let fresh = new_at_bats(&at_bats, last, game.game_pk);

        if !fresh.is_empty() {
            let stats = self.mlb.season_stats(player.id).await?;
            for at_bat in fresh {
                let embed = embeds::at_bat_embed(player, at_bat, &game, &stats);

                // Held across the send so a `/remove_player` cannot land between it and the record.
                let mut pstate = self.pstate.write().await;
                if !still_tracked(&pstate, player.id) {
                    log_internal!("{} was removed mid-poll", player.color());
                    return Ok(());
                }
                settings
                    .channel_id
                    .send_message(&self.http, CreateMessage::new().embed(embed))
                    .await?;
                pstate.seen.record(player.id, game.game_pk, at_bat.index);
                pstate.seen.save(&settings.storage.seen_at_bats_file).await?;
                log_event!(
                    "Posted {} for {} ({} @ {})",
                    at_bat.result,
                    player.color(),
                    game.away_team,
                    game.home_team
                );
            }
        }

        let mut pstate = self.pstate.write().await;
        if !still_tracked(&pstate, player.id)
            || !should_post_summary(&game, &at_bats, &pstate.seen, player.id)
        {
            return Ok(());
        }

        let line = mlb::game_line(feed, player.id).unwrap_or_default();
        settings
            .channel_id
            .send_message(
                &self.http,
                CreateMessage::new().embed(embeds::game_summary_embed(player, &game, &line)),
            )
            .await?;

        pstate.seen.record_summary(player.id, game.game_pk);
        pstate.seen.save(&settings.storage.seen_at_bats_file).await?;
        log_event!(
            "Posted game summary for {}: {}",
            player.color(),
            embeds::final_line(&line)
        );

        Ok(())
    }
}

/// The player's current team, falling back to the roster's copy when the lookup fails.
async fn resolve_team(mlb: &MlbClient, player: &TrackedPlayer) -> Result<Option<u64>> {
    match mlb.current_team_id(player.id).await {
        Ok(Some(id)) => Ok(Some(id)),
        Ok(None) => Ok(player.team_id),
        Err(e) => match player.team_id {
            Some(id) => {
                log_internal!("Using stored team for {}: {:#}", player.color(), e);
                Ok(Some(id))
            }
            None => Err(e),
        },
    }
}

/// At-bats that have not been posted yet.
///
/// The first time a game is seen only its latest at-bat counts, so starting the bot mid-game
/// does not replay the whole game.  Afterwards every later at-bat counts, in order.
pub fn new_at_bats<'a>(at_bats: &'a [AtBat], last: Option<SeenAtBat>, game_pk: u64) -> Vec<&'a AtBat> {
    match last {
        Some(seen) if seen.game_pk == game_pk => at_bats
            .iter()
            .filter(|a| a.index > seen.at_bat_index)
            .collect(),
        _ => at_bats.last().into_iter().collect(),
    }
}

/// The tick works from a snapshot of the roster, which `/remove_player` may have changed since.
fn still_tracked(pstate: &PersistentState, player_id: u64) -> bool {
    pstate.roster.contains(player_id)
}

/// Once per date, and only when enabled.
pub fn should_post_schedule(posted_on: Option<NaiveDate>, today: NaiveDate, enabled: bool) -> bool {
    enabled && posted_on != Some(today)
}

/// A finished game gets one summary per player, and none if the player never came to the plate.
pub fn should_post_summary(
    game: &GameInfo,
    at_bats: &[AtBat],
    seen: &SeenAtBats,
    player_id: u64,
) -> bool {
    game.is_final && !at_bats.is_empty() && !seen.summary_posted(player_id, game.game_pk)
}

/// Today's game, or why there is none, for every player.
pub async fn todays_schedule(
    mlb: &MlbClient,
    players: &[TrackedPlayer],
) -> Vec<(TrackedPlayer, ScheduleEntry)> {
    let today = mlb.today();
    let mut entries = Vec::with_capacity(players.len());

    for player in players {
        let entry = match resolve_team(mlb, player).await {
            Ok(Some(team_id)) => match mlb.game_on(team_id, today).await {
                Ok(Some(game)) => ScheduleEntry::Game(game),
                Ok(None) => ScheduleEntry::NoGame,
                Err(e) => {
                    log_error!("Error getting schedule for {}: {:#}", player.color(), e);
                    ScheduleEntry::Error
                }
            },
            Ok(None) => ScheduleEntry::NoGame,
            Err(e) => {
                log_error!("Error getting schedule for {}: {:#}", player.color(), e);
                ScheduleEntry::Error
            }
        };
        entries.push((player.clone(), entry));
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_bat(index: u32) -> AtBat {
        AtBat {
            index,
            result: "Single".to_owned(),
            description: "Aaron Judge singles on a ground ball.".to_owned(),
            was_hit: true,
            risp: false,
            inning: "Top 1".to_owned(),
        }
    }

    fn indices(at_bats: Vec<&AtBat>) -> Vec<u32> {
        at_bats.into_iter().map(|a| a.index).collect()
    }

    #[test]
    fn first_sight_of_a_game_posts_only_the_latest() {
        let at_bats = [at_bat(2), at_bat(11), at_bat(20)];
        assert_eq!(indices(new_at_bats(&at_bats, None, 745000)), [20]);

        // Yesterday's record does not count for today's game.
        let yesterday = SeenAtBat {
            game_pk: 744999,
            at_bat_index: 35,
        };
        assert_eq!(indices(new_at_bats(&at_bats, Some(yesterday), 745000)), [20]);
    }

    #[test]
    fn same_game_posts_every_later_at_bat() {
        let at_bats = [at_bat(2), at_bat(11), at_bat(20)];
        let seen = SeenAtBat {
            game_pk: 745000,
            at_bat_index: 2,
        };
        assert_eq!(indices(new_at_bats(&at_bats, Some(seen), 745000)), [11, 20]);
    }

    #[test]
    fn nothing_new_posts_nothing() {
        let at_bats = [at_bat(2), at_bat(11)];
        let seen = SeenAtBat {
            game_pk: 745000,
            at_bat_index: 11,
        };
        assert!(new_at_bats(&at_bats, Some(seen), 745000).is_empty());
        assert!(new_at_bats(&[], None, 745000).is_empty());
    }

    fn game(game_pk: u64, is_final: bool) -> GameInfo {
        GameInfo {
            game_pk,
            away_team: "New York Yankees".to_owned(),
            home_team: "Boston Red Sox".to_owned(),
            away_score: 5,
            home_score: 2,
            inning: 9,
            inning_state: "End".to_owned(),
            game_time: "7:10 PM EDT".to_owned(),
            is_final,
        }
    }

    #[test]
    fn schedule_is_posted_once_per_date() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 7, 3).unwrap();

        assert!(should_post_schedule(None, today, true));
        assert!(should_post_schedule(Some(yesterday), today, true));
        assert!(!should_post_schedule(Some(today), today, true));
        assert!(!should_post_schedule(None, today, false));
    }

    #[test]
    fn summary_waits_for_the_final_out() {
        let seen = SeenAtBats::default();
        assert!(!should_post_summary(&game(745000, false), &[at_bat(4)], &seen, 592450));
        assert!(should_post_summary(&game(745000, true), &[at_bat(4)], &seen, 592450));
    }

    #[test]
    fn summary_is_posted_once_per_game() {
        let mut seen = SeenAtBats::default();
        seen.record_summary(592450, 745000);

        assert!(!should_post_summary(&game(745000, true), &[at_bat(4)], &seen, 592450));
        // The next day's game is a new summary.
        assert!(should_post_summary(&game(745001, true), &[at_bat(4)], &seen, 592450));
        // Teammates are tracked separately.
        assert!(should_post_summary(&game(745000, true), &[at_bat(5)], &seen, 660271));
    }

    #[test]
    fn no_summary_without_a_plate_appearance() {
        let seen = SeenAtBats::default();
        assert!(!should_post_summary(&game(745000, true), &[], &seen, 592450));
    }

    #[test]
    fn player_removed_mid_poll_is_not_posted() {
        let mut roster = Roster::default();
        roster.add(crate::roster::player(592450, "Aaron Judge"));
        let mut pstate = PersistentState {
            roster,
            seen: SeenAtBats::default(),
        };
        pstate.seen.record(592450, 745000, 4);
        let snapshot = pstate.roster.clone();

        for removed in pstate.roster.remove_matching("judge") {
            pstate.seen.forget(removed.id);
        }

        assert!(snapshot.contains(592450));
        assert!(!still_tracked(&pstate, 592450));
        assert_eq!(pstate.seen.last(592450), None);
    }

    #[test]
    fn recording_the_posted_at_bat_stops_reposting() {
        let at_bats = [at_bat(4)];
        let mut seen = SeenAtBats::default();

        let fresh = new_at_bats(&at_bats, seen.last(592450), 745000);
        assert_eq!(indices(fresh), [4]);
        seen.record(592450, 745000, 4);

        assert!(new_at_bats(&at_bats, seen.last(592450), 745000).is_empty());
    }
}
