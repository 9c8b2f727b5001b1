use crate::{
    mlb::{AtBat, GameInfo, GameLine, SeasonStats},
    roster::TrackedPlayer,
};
use serenity::all::{Colour, CreateEmbed, CreateEmbedFooter, Timestamp};

/// Discord allows at most five buttons per row; the cancel button takes its own row.
pub const MAX_SELECTION_CHOICES: usize = 5;
/// Discord rejects embeds with more fields than this.
const MAX_EMBED_FIELDS: usize = 25;
/// Discord's limit on an embed description, in characters.
const MAX_DESCRIPTION_LEN: usize = 4096;

/// One line of the daily schedule
pub enum ScheduleEntry {
    Game(GameInfo),
    NoGame,
    Error,
}

pub fn slash_line(stats: &SeasonStats) -> String {
    format!("{} / {} / {}", stats.avg, stats.obp, stats.slg)
}

pub fn matchup(game: &GameInfo) -> String {
    format!("{} @ {}", game.away_team, game.home_team)
}

pub fn game_context(game: &GameInfo, at_bat: &AtBat) -> String {
    let mut context = format!(
        "**{}** | Score: {}-{} | {}",
        matchup(game),
        game.away_score,
        game.home_score,
        at_bat.inning
    );

    if at_bat.risp {
        context.push_str(" | 🔶 **RISP**");
    }

    context
}

pub fn at_bat_embed(
    player: &TrackedPlayer,
    at_bat: &AtBat,
    game: &GameInfo,
    stats: &SeasonStats,
) -> CreateEmbed {
    let colour = if at_bat.was_hit {
        Colour::DARK_GREEN
    } else {
        Colour::RED
    };

    CreateEmbed::new()
        .title(format!("⚾ {} - At Bat", player.name))
        .description(at_bat.description.as_str())
        .colour(colour)
        .timestamp(Timestamp::now())
        .field("Result", format!("**{}**", at_bat.result), false)
        .field("Season Slash Line", slash_line(stats), false)
        .field("Game Context", game_context(game, at_bat), false)
        .footer(CreateEmbedFooter::new(player.team.as_str()))
}

pub fn final_line(line: &GameLine) -> String {
    format!("{}-for-{}", line.hits, line.at_bats)
}

pub fn game_summary_embed(player: &TrackedPlayer, game: &GameInfo, line: &GameLine) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title(format!("📊 Game Complete - {}", player.name))
        .colour(Colour::BLUE)
        .timestamp(Timestamp::now())
        .field("Final Line", final_line(line), true);

    for (name, value) in [
        ("RBI", line.rbi),
        ("Runs", line.runs),
        ("HR", line.home_runs),
        ("BB", line.walks),
        ("K", line.strikeouts),
    ] {
        if value > 0 {
            embed = embed.field(name, value.to_string(), true);
        }
    }

    embed
        .field(
            "Game Result",
            format!(
                "**{} {}, {} {}**",
                game.away_team, game.away_score, game.home_team, game.home_score
            ),
            false,
        )
        .footer(CreateEmbedFooter::new(player.team.as_str()))
}

pub fn schedule_line(player: &TrackedPlayer, entry: &ScheduleEntry) -> String {
    match entry {
        ScheduleEntry::Game(game) => {
            let mut line = format!("**{}**: {} - {}", player.name, matchup(game), game.game_time);
            // No linescore state until the first pitch.
            if !game.is_final && !game.inning_state.is_empty() {
                line.push_str(&format!(" ({} {})", game.inning_state, game.inning));
            }
            line
        }
        ScheduleEntry::NoGame => format!("**{}**: No game scheduled", player.name),
        ScheduleEntry::Error => format!("**{}**: Error fetching schedule", player.name),
    }
}

/// Join `lines` with newlines, dropping trailing lines that would not fit in `max` characters.
/// The dropped lines are counted in a final `...and N more` line.
fn capped_lines(lines: &[String], max: usize) -> String {
    let full = lines.join("\n");
    if full.chars().count() <= max {
        return full;
    }

    let mut out = String::new();
    let mut used = 0;
    let mut kept = 0;
    for (i, line) in lines.iter().enumerate() {
        let needed = usize::from(!out.is_empty()) + line.chars().count();
        let note = format!("\n...and {} more", lines.len() - i - 1).chars().count();
        if used + needed + note > max {
            break;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
        used += needed;
        kept = i + 1;
    }

    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&format!("...and {} more", lines.len() - kept));
    out
}

pub fn daily_schedule_embed(entries: &[(TrackedPlayer, ScheduleEntry)]) -> CreateEmbed {
    let description = if entries.is_empty() {
        "No tracked players have games today.".to_owned()
    } else {
        let lines: Vec<_> = entries
            .iter()
            .map(|(player, entry)| schedule_line(player, entry))
            .collect();
        capped_lines(&lines, MAX_DESCRIPTION_LEN)
    };

    CreateEmbed::new()
        .title("📅 Today's Games")
        .colour(Colour::GOLD)
        .timestamp(Timestamp::now())
        .description(description)
        .footer(CreateEmbedFooter::new(format!(
            "Tracking {} player(s)",
            entries.len()
        )))
}

pub fn roster_embed(players: &[TrackedPlayer]) -> CreateEmbed {
    let embed = players.iter().take(MAX_EMBED_FIELDS).fold(
        CreateEmbed::new()
            .title("🎯 Tracked Players")
            .colour(Colour::BLUE)
            .timestamp(Timestamp::now()),
        |embed, p| {
            embed.field(
                format!("{} (#{})", p.name, p.number()),
                format!("{} - {}", p.team, p.position),
                false,
            )
        },
    );

    match players.len().checked_sub(MAX_EMBED_FIELDS) {
        Some(hidden) if hidden > 0 => {
            embed.footer(CreateEmbedFooter::new(format!("...and {} more", hidden)))
        }
        _ => embed,
    }
}

pub fn selection_embed(query: &str, candidates: &[TrackedPlayer]) -> CreateEmbed {
    candidates
        .iter()
        .take(MAX_SELECTION_CHOICES)
        .enumerate()
        .fold(
            CreateEmbed::new()
                .title("Multiple Players Found")
                .colour(Colour::BLUE)
                .description(format!(
                    "Found {} players matching '{}'. Select the one you want:",
                    candidates.len(),
                    query
                )),
            |embed, (i, p)| {
                embed.field(
                    format!("{}. {}", i + 1, p.name),
                    format!("{} - {} (#{})", p.team, p.position, p.number()),
                    false,
                )
            },
        )
}

pub fn tracking_confirmation(player: &TrackedPlayer) -> String {
    format!(
        "✅ Now tracking **{}** (#{}) - {}",
        player.name,
        player.number(),
        player.team
    )
}
