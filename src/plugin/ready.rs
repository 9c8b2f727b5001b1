use crate::{event::*, log_error, log_internal, plugin::*, poller::Poller};
use anyhow::Result;
use serenity::all::{ChannelId, Command};

/// Registers slash commands and starts polling once connected to Discord.
pub struct Ready;

#[serenity::async_trait]
impl Plugin for Ready {
    fn name(&self) -> &'static str {
        "ready"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Ready(_) = event else {
            return Ok(EventHandled::No);
        };

        // Polling does not depend on Discord accepting the commands, so it starts first.
        if ctx.vstate.write().await.claim_poller_start() {
            Poller::new(ctx).spawn();
        }

        match Command::set_global_commands(ctx.http, crate::plugin::commands()).await {
            Ok(registered) => log_internal!("Registered {} slash command(s)", registered.len()),
            Err(e) => log_error!("Could not register slash commands: {}", e),
        }

        let channel_id = ChannelId::new(ctx.cfg.read().await.general.channel_id);
        if let Err(e) = channel_id.to_channel(ctx.cache_http).await {
            tracing::warn!(
                channel = channel_id.get(),
                "Could not find channel with ID {}: {}",
                channel_id,
                e
            );
        }

        Ok(EventHandled::Yes)
    }
}
