//! The Serenity crate we're using for the Discord API is designed around callbacks to handle
//! events.  However, this does not mesh well with our plugin framework here.  To resolve this,
//! the handler translates the callbacks into a distinct Event enum.

use crate::{context::Context, log_error};
use serenity::all::{CommandInteraction, ComponentInteraction, Interaction, Ready};

/// A Discord event
pub enum Event {
    Ready(Ready),
    Interaction(Interaction),
}

impl Event {
    // When an event occurs, iterate over all the plugins to see if any can/should handle it.
    pub async fn handle(self, ctx: Context<'_>) {
        for plugin in crate::plugin::plugins() {
            match plugin.handle(&ctx, &self).await {
                Ok(EventHandled::Yes) => return,
                Ok(EventHandled::No) => continue,
                Err(err) => log_error!("Error in plugin {}: {:#}", plugin.name(), err),
            }
        }
    }

    /// The slash command invocation, if this event is `/name`.
    pub fn is_slash_cmd(&self, name: &str) -> Option<&CommandInteraction> {
        match self {
            Event::Interaction(Interaction::Command(cmd)) if cmd.data.name == name => Some(cmd),
            _ => None,
        }
    }

    /// The button press, if its custom id starts with `prefix`.  Also returns the rest of the
    /// custom id.
    pub fn is_component<'a>(&'a self, prefix: &str) -> Option<(&'a ComponentInteraction, &'a str)> {
        match self {
            Event::Interaction(Interaction::Component(component)) => component
                .data
                .custom_id
                .strip_prefix(prefix)
                .map(|rest| (component, rest)),
            _ => None,
        }
    }
}

pub enum EventHandled {
    Yes,
    No,
}
