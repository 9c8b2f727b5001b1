use crate::{context::Context, event::EventHandled};
use anyhow::Result;
use serenity::all::CreateCommand;

mod debug;
mod help;
mod ready;
mod reload;
mod roster;
mod schedule;

#[serenity::async_trait]
pub trait Plugin: Sync + Send {
    /// Plugin name.  Used for debug
    fn name(&self) -> &'static str;
    /// Help message line.  None if no help message
    async fn usage(&self, ctx: &Context) -> Option<String>;
    /// Slash commands this plugin answers, registered when the bot connects
    fn commands(&self) -> Vec<CreateCommand> {
        Vec::new()
    }
    /// Potentially handle event.  Returns:
    /// - Ok(EventHandled::Yes) if the event has been handled and no other plugin should attempt to
    /// handle it
    /// - Ok(EventHandled::No) if another plugin should attempt to handle the event
    /// - Err if an error occurred
    async fn handle(&self, ctx: &Context, event: &crate::event::Event) -> Result<EventHandled>;
}

/// Ordered list of available plugins
pub fn plugins() -> Vec<Box<dyn Plugin>> {
    use crate::plugin::*;

    vec![
        // Core bot operations
        Box::new(debug::Debug),
        Box::new(ready::Ready),
        Box::new(help::Help),
        Box::new(reload::Reload),
        // Player tracking
        Box::new(roster::Roster),
        Box::new(schedule::Schedule),
    ]
}

/// Every plugin's slash commands
pub fn commands() -> Vec<CreateCommand> {
    plugins().iter().flat_map(|plugin| plugin.commands()).collect()
}
