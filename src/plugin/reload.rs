use crate::{event::*, helper::CommandHelper, log_error, plugin::*};
use anyhow::Result;

pub struct Reload;

#[serenity::async_trait]
impl Plugin for Reload {
    fn name(&self) -> &'static str {
        "reload"
    }

    async fn usage(&self, ctx: &Context) -> Option<String> {
        let role = ctx.cfg.read().await.general.admin_role_name.clone();
        Some(format!("/{} - reload configuration ({} only)", self.name(), role))
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![CreateCommand::new(self.name()).description("Reload the bot configuration")]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(cmd) = event.is_slash_cmd(self.name()) else {
            return Ok(EventHandled::No);
        };

        if !cmd.require_admin(ctx).await? {
            return Ok(EventHandled::Yes);
        }

        // The token and timezone only change on restart.
        let response = match ctx.cfg.write().await.reload().await {
            Ok(()) => "Configuration reloaded successfully".to_owned(),
            Err(e) => {
                log_error!("Reload failed: {:#}", e);
                format!("Could not reload configuration: {}", e)
            }
        };

        cmd.reply(ctx, response, true).await?;
        Ok(EventHandled::Yes)
    }
}
