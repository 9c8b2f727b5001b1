use crate::{
    embeds::{self, MAX_SELECTION_CHOICES},
    event::*,
    helper::CommandHelper,
    log_event,
    logging::PrintColor,
    plugin::*,
    roster::TrackedPlayer,
    volatile_state::SelectionError,
};
use anyhow::Result;
use serenity::all::{
    ButtonStyle, CommandInteraction, CommandOptionType, ComponentInteraction, CreateActionRow,
    CreateButton, CreateCommandOption, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage,
};

const ADD: &str = "add_player";
const REMOVE: &str = "remove_player";
const LIST: &str = "list_players";
const NAME_OPTION: &str = "player_name";
/// Custom id prefix for the multiple-match buttons
const SELECT_PREFIX: &str = "roster:";
/// Discord rejects button labels longer than this.
const MAX_LABEL_LEN: usize = 80;

/// Manage which players are tracked
pub struct Roster;

#[derive(Debug, PartialEq)]
enum SelectAction {
    Pick { selection: u64, index: usize },
    Cancel { selection: u64 },
}

#[serenity::async_trait]
impl Plugin for Roster {
    fn name(&self) -> &'static str {
        "roster"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let role = ctx.cfg.read().await.general.admin_role_name.clone();
        Some(format!(
            "/{ADD} <{NAME_OPTION}> - start tracking a player ({role} only)\n\
             /{REMOVE} <{NAME_OPTION}> - stop tracking every player whose name matches ({role} only)\n\
             /{LIST} - list tracked players"
        ))
    }

    fn commands(&self) -> Vec<CreateCommand> {
        let name_option = |description: &str| {
            CreateCommandOption::new(CommandOptionType::String, NAME_OPTION, description)
                .required(true)
        };

        vec![
            CreateCommand::new(ADD)
                .description("Add a player to track")
                .add_option(name_option("Full or partial player name")),
            CreateCommand::new(REMOVE)
                .description("Remove a player from tracking")
                .add_option(name_option("Full or partial name of the tracked player")),
            CreateCommand::new(LIST).description("List all tracked players"),
        ]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        if let Some(cmd) = event.is_slash_cmd(ADD) {
            add_player(ctx, cmd).await?;
        } else if let Some(cmd) = event.is_slash_cmd(REMOVE) {
            remove_player(ctx, cmd).await?;
        } else if let Some(cmd) = event.is_slash_cmd(LIST) {
            list_players(ctx, cmd).await?;
        } else if let Some((component, custom_id)) = event.is_component(SELECT_PREFIX) {
            select_player(ctx, component, custom_id).await?;
        } else {
            return Ok(EventHandled::No);
        }

        Ok(EventHandled::Yes)
    }
}

/// Reload the roster from disk, add `player` and save.  False if already tracked.
async fn track(ctx: &Context<'_>, player: TrackedPlayer) -> Result<bool> {
    let roster_file = ctx.cfg.read().await.storage.roster_file.clone();
    let mut pstate = ctx.pstate.write().await;

    // Pick up hand edits made since the last poll.
    pstate.roster = crate::roster::Roster::load(&roster_file).await?;
    let name = player.color();
    if !pstate.roster.add(player) {
        return Ok(false);
    }
    pstate.roster.save(&roster_file).await?;
    log_event!("Now tracking {}", name);
    Ok(true)
}

async fn add_player(ctx: &Context<'_>, cmd: &CommandInteraction) -> Result<()> {
    if !cmd.require_admin(ctx).await? {
        return Ok(());
    }

    let query = cmd.string_option(NAME_OPTION).unwrap_or_default().trim().to_owned();

    // Searching the full player list takes longer than Discord's reply window.
    cmd.defer(ctx.cache_http).await?;

    let mut players = match ctx.mlb.search_players(&query).await {
        Ok(players) => players,
        Err(e) => {
            cmd.create_followup(
                ctx.cache_http,
                CreateInteractionResponseFollowup::new()
                    .content("Could not reach the MLB Stats API.  Try again later."),
            )
            .await?;
            return Err(e);
        }
    };

    let followup = match players.len() {
        0 => CreateInteractionResponseFollowup::new()
            .content(format!("Could not find any players matching: {}", query)),
        1 => {
            let player = players.remove(0);
            let content = if track(ctx, player.clone()).await? {
                embeds::tracking_confirmation(&player)
            } else {
                format!("❌ {} is already being tracked!", player.name)
            };
            CreateInteractionResponseFollowup::new().content(content)
        }
        _ => {
            let embed = embeds::selection_embed(&query, &players);
            let choices: Vec<TrackedPlayer> =
                players.into_iter().take(MAX_SELECTION_CHOICES).collect();
            let buttons = choices
                .iter()
                .enumerate()
                .map(|(i, p)| (i, format!("{} - {}", p.name, p.team)))
                .collect::<Vec<_>>();
            let selection = ctx
                .vstate
                .write()
                .await
                .selections
                .insert(cmd.user.id, choices);

            CreateInteractionResponseFollowup::new()
                .embed(embed)
                .components(selection_buttons(selection, &buttons))
        }
    };

    cmd.create_followup(ctx.cache_http, followup).await?;
    Ok(())
}

fn selection_buttons(selection: u64, labels: &[(usize, String)]) -> Vec<CreateActionRow> {
    let choices = labels
        .iter()
        .map(|(index, label)| {
            CreateButton::new(format!("{SELECT_PREFIX}pick:{selection}:{index}"))
                .label(truncate_label(label))
                .style(ButtonStyle::Primary)
        })
        .collect();

    let cancel = CreateButton::new(format!("{SELECT_PREFIX}cancel:{selection}"))
        .label("Cancel")
        .style(ButtonStyle::Secondary);

    vec![
        CreateActionRow::Buttons(choices),
        CreateActionRow::Buttons(vec![cancel]),
    ]
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_LEN {
        return label.to_owned();
    }
    let mut truncated: String = label.chars().take(MAX_LABEL_LEN - 1).collect();
    truncated.push('…');
    truncated
}

fn parse_select(custom_id: &str) -> Option<SelectAction> {
    let mut parts = custom_id.split(':');
    let action = match (parts.next()?, parts.next()?.parse().ok()?) {
        ("pick", selection) => SelectAction::Pick {
            selection,
            index: parts.next()?.parse().ok()?,
        },
        ("cancel", selection) => SelectAction::Cancel { selection },
        _ => return None,
    };

    match parts.next() {
        Some(_) => None,
        None => Some(action),
    }
}

async fn select_player(
    ctx: &Context<'_>,
    component: &ComponentInteraction,
    custom_id: &str,
) -> Result<()> {
    let Some(action) = parse_select(custom_id) else {
        return Ok(());
    };

    let user = component.user.id;
    let outcome = match action {
        SelectAction::Pick { selection, index } => {
            let taken = ctx
                .vstate
                .write()
                .await
                .selections
                .take(selection, index, user);
            match taken {
                Ok(player) => {
                    let content = if track(ctx, player.clone()).await? {
                        embeds::tracking_confirmation(&player)
                    } else {
                        format!("❌ {} is already being tracked!", player.name)
                    };
                    Ok(content)
                }
                Err(e) => Err(e),
            }
        }
        SelectAction::Cancel { selection } => ctx
            .vstate
            .write()
            .await
            .selections
            .cancel(selection, user)
            .map(|_| "❌ Cancelled.".to_owned()),
    };

    let response = match outcome {
        Ok(content) => CreateInteractionResponse::UpdateMessage(finished(content)),
        Err(SelectionError::Expired) => CreateInteractionResponse::UpdateMessage(finished(
            "❌ This selection has expired.  Run the command again.".to_owned(),
        )),
        Err(SelectionError::NotOwner) => CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content("This selection is not for you!")
                .ephemeral(true),
        ),
    };

    component.create_response(ctx.cache_http, response).await?;
    Ok(())
}

/// Replace the selection prompt, removing its embed and buttons.
fn finished(content: String) -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new()
        .content(content)
        .embeds(Vec::new())
        .components(Vec::new())
}

async fn remove_player(ctx: &Context<'_>, cmd: &CommandInteraction) -> Result<()> {
    if !cmd.require_admin(ctx).await? {
        return Ok(());
    }

    let query = cmd.string_option(NAME_OPTION).unwrap_or_default().trim().to_owned();
    let storage = ctx.cfg.read().await.storage.clone();

    let removed = {
        let mut pstate = ctx.pstate.write().await;
        pstate.roster = crate::roster::Roster::load(&storage.roster_file).await?;
        let removed = pstate.roster.remove_matching(&query);
        if !removed.is_empty() {
            pstate.roster.save(&storage.roster_file).await?;
            for player in &removed {
                pstate.seen.forget(player.id);
            }
            pstate.seen.save(&storage.seen_at_bats_file).await?;
        }
        removed
    };

    if removed.is_empty() {
        cmd.reply(ctx, format!("Player '{}' not found in roster.", query), false)
            .await?;
        return Ok(());
    }

    for player in &removed {
        log_event!("Stopped tracking {}", player.color());
    }

    let names: Vec<_> = removed.iter().map(|p| format!("**{}**", p.name)).collect();
    cmd.reply(
        ctx,
        format!("✅ Removed {} from tracking.", names.join(", ")),
        false,
    )
    .await
}

async fn list_players(ctx: &Context<'_>, cmd: &CommandInteraction) -> Result<()> {
    let roster_file = ctx.cfg.read().await.storage.roster_file.clone();
    let roster = crate::roster::Roster::load(&roster_file).await?;

    if roster.is_empty() {
        return cmd
            .reply(ctx, "No players are currently being tracked.".to_owned(), false)
            .await;
    }

    cmd.reply_embed(ctx, embeds::roster_embed(roster.list())).await
}
