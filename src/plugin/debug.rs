use crate::{event::*, log_event, logging::*, plugin::*};
use anyhow::Result;
use serenity::all::{CommandDataOptionValue, Interaction};

/// Logs every event
pub struct Debug;

#[serenity::async_trait]
impl Plugin for Debug {
    fn name(&self) -> &'static str {
        "debug"
    }

    async fn usage(&self, _ctx: &Context) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        match event {
            Event::Ready(ready) => {
                log_event!(
                    "Connected to {} server(s) as {}",
                    ready.guilds.len(),
                    ready.user.color(),
                );
            }
            Event::Interaction(Interaction::Command(cmd)) => {
                let args: Vec<String> = cmd
                    .data
                    .options
                    .iter()
                    .map(|option| match &option.value {
                        CommandDataOptionValue::String(s) => format!("{}:{}", option.name, s),
                        other => format!("{}:{:?}", option.name, other),
                    })
                    .collect();

                log_event!(
                    "{}{}{}{}{} /{} {}",
                    cmd.guild_id.color(ctx.http).await,
                    Glue {}.color(),
                    cmd.channel_id.color(ctx.http).await,
                    Glue {}.color(),
                    cmd.user.color(),
                    cmd.data.name,
                    args.join(" "),
                );
            }
            Event::Interaction(Interaction::Component(component)) => {
                log_event!(
                    "{} pressed \"{}\"",
                    component.user.color(),
                    component.data.custom_id,
                );
            }
            Event::Interaction(_) => {}
        }

        Ok(EventHandled::No)
    }
}
