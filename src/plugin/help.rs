use crate::{event::*, helper::CommandHelper, plugin::*};
use anyhow::Result;

pub struct Help;

#[serenity::async_trait]
impl Plugin for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        Some(format!("/{} - show this help message", self.name()))
    }

    fn commands(&self) -> Vec<CreateCommand> {
        vec![CreateCommand::new(self.name()).description("Show what this bot can do")]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(cmd) = event.is_slash_cmd(self.name()) else {
            return Ok(EventHandled::No);
        };

        let mut reply = String::new();
        reply.push_str("```\n");
        reply.push_str("Commands:\n");
        for plugin in crate::plugin::plugins() {
            if let Some(usage) = plugin.usage(ctx).await {
                reply.push_str(&usage);
                reply.push('\n');
            }
        }
        reply.push_str("```\n");

        cmd.reply(ctx, reply, true).await?;
        Ok(EventHandled::Yes)
    }
}
