mod config;
mod context;
mod embeds;
mod event;
mod handler;
mod helper;
mod logging;
mod mlb;
mod persistent_state;
mod plugin;
mod poller;
mod roster;
mod volatile_state;

use serenity::{all::GatewayIntents, Client};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cfg = crate::config::Config::load().await?;
    let token = cfg.general.discord_token.clone();
    let mlb = crate::mlb::MlbClient::new(&cfg.mlb)?;
    let pstate = crate::persistent_state::PersistentState::load(&cfg.storage).await?;
    let vstate = crate::volatile_state::VolatileState::new();
    log_internal!(
        "Loaded {} tracked player(s) from {}",
        pstate.roster.len(),
        cfg.storage.roster_file.display()
    );
    let handler = handler::Handler::new(cfg, pstate, vstate, mlb);

    // Slash commands and buttons only; no message content is read.
    let intents = GatewayIntents::GUILDS;

    Client::builder(&token, intents)
        .event_handler(handler)
        .await?
        .start()
        .await
        .map_err(Into::into)
}
