use crate::{embeds, event::*, plugin::*, poller::todays_schedule, roster::Roster};
use anyhow::Result;
use serenity::all::CreateInteractionResponseFollowup;

/// Today's games for the tracked players, on demand
pub struct Schedule;

#[serenity::async_trait]
impl Plugin for Schedule {
    fn name(&self) -> &'static str {
        "schedule"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some(format!("/{} - today's games for tracked players", self.name()))
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![CreateCommand::new(self.name()).description("Show today's games for tracked players")]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(cmd) = event.is_slash_cmd(self.name()) else {
            return Ok(EventHandled::No);
        };

        // Looking up every player's game takes longer than Discord's reply window.
        cmd.defer(ctx.cache_http).await?;

        let roster_file = ctx.cfg.read().await.storage.roster_file.clone();
        let roster = Roster::load(&roster_file).await?;

        let followup = if roster.is_empty() {
            CreateInteractionResponseFollowup::new().content("No players are currently being tracked.")
        } else {
            let entries = todays_schedule(ctx.mlb, roster.list()).await;
            CreateInteractionResponseFollowup::new().embed(embeds::daily_schedule_embed(&entries))
        };

        cmd.create_followup(ctx.cache_http, followup).await?;
        Ok(EventHandled::Yes)
    }
}
