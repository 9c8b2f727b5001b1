//! Miscellaneous convenience methods

use crate::context::Context;
use anyhow::Result;
use serenity::all::{
    CommandInteraction, CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
    GuildId, Member, RoleId,
};

#[derive(Debug, PartialEq)]
pub enum Authorization {
    Allowed,
    NotInGuild,
    MissingRole,
}

/// Whether any of `member_roles` is a guild role named exactly `name`.
pub fn holds_role_named<'a>(
    member_roles: &[RoleId],
    guild_roles: impl IntoIterator<Item = (RoleId, &'a str)>,
    name: &str,
) -> bool {
    guild_roles
        .into_iter()
        .any(|(id, role_name)| role_name == name && member_roles.contains(&id))
}

/// Check the configured admin role.  Prefers the cache, falling back to an http request.
pub async fn authorize(
    ctx: &Context<'_>,
    guild_id: Option<GuildId>,
    member: Option<&Member>,
) -> Result<Authorization> {
    let (Some(guild_id), Some(member)) = (guild_id, member) else {
        return Ok(Authorization::NotInGuild);
    };

    let role_name = ctx.cfg.read().await.general.admin_role_name.clone();

    // Copy out of the cache so the guard isn't held across an await.
    let cached: Option<Vec<(RoleId, String)>> = guild_id.to_guild_cached(ctx.cache).map(|guild| {
        guild
            .roles
            .iter()
            .map(|(id, role)| (*id, role.name.clone()))
            .collect()
    });

    let guild_roles = match cached {
        Some(roles) => roles,
        None => guild_id
            .roles(ctx.http)
            .await?
            .into_iter()
            .map(|(id, role)| (id, role.name))
            .collect(),
    };

    let allowed = holds_role_named(
        &member.roles,
        guild_roles.iter().map(|(id, name)| (*id, name.as_str())),
        &role_name,
    );

    Ok(if allowed {
        Authorization::Allowed
    } else {
        Authorization::MissingRole
    })
}

#[serenity::async_trait]
pub trait CommandHelper {
    fn string_option(&self, name: &str) -> Option<&str>;
    async fn reply(&self, ctx: &Context, content: String, ephemeral: bool) -> Result<()>;
    async fn reply_embed(&self, ctx: &Context, embed: CreateEmbed) -> Result<()>;
    /// Replies with the reason and returns false if the invoker may not use admin commands.
    async fn require_admin(&self, ctx: &Context) -> Result<bool>;
}

#[serenity::async_trait]
impl CommandHelper for CommandInteraction {
    fn string_option(&self, name: &str) -> Option<&str> {
        self.data
            .options
            .iter()
            .find(|option| option.name == name)
            .and_then(|option| option.value.as_str())
    }

    async fn reply(&self, ctx: &Context, content: String, ephemeral: bool) -> Result<()> {
        let message = CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(ephemeral);
        self.create_response(ctx.cache_http, CreateInteractionResponse::Message(message))
            .await
            .map_err(Into::into)
    }

    async fn reply_embed(&self, ctx: &Context, embed: CreateEmbed) -> Result<()> {
        let message = CreateInteractionResponseMessage::new().embed(embed);
        self.create_response(ctx.cache_http, CreateInteractionResponse::Message(message))
            .await
            .map_err(Into::into)
    }

    async fn require_admin(&self, ctx: &Context) -> Result<bool> {
        let denial = match authorize(ctx, self.guild_id, self.member.as_deref()).await? {
            Authorization::Allowed => return Ok(true),
            Authorization::NotInGuild => "This command must be used in a server.".to_owned(),
            Authorization::MissingRole => format!(
                "You need the '{}' role to use this command.",
                ctx.cfg.read().await.general.admin_role_name
            ),
        };

        tracing::warn!(
            user = self.user.name.as_str(),
            command = self.data.name.as_str(),
            "User tried to use an admin command without permission"
        );
        self.reply(ctx, denial, true).await?;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild_roles() -> Vec<(RoleId, &'static str)> {
        vec![
            (RoleId::new(10), "@everyone"),
            (RoleId::new(11), "MLB Bot Admin"),
            (RoleId::new(12), "Moderator"),
        ]
    }

    #[test]
    fn member_with_named_role_is_allowed() {
        assert!(holds_role_named(
            &[RoleId::new(12), RoleId::new(11)],
            guild_roles(),
            "MLB Bot Admin"
        ));
    }

    #[test]
    fn other_roles_do_not_count() {
        assert!(!holds_role_named(&[RoleId::new(12)], guild_roles(), "MLB Bot Admin"));
        assert!(!holds_role_named(&[], guild_roles(), "MLB Bot Admin"));
    }

    #[test]
    fn role_names_must_match_exactly() {
        assert!(!holds_role_named(&[RoleId::new(11)], guild_roles(), "mlb bot admin"));
        assert!(!holds_role_named(&[RoleId::new(11)], guild_roles(), "MLB Bot"));
    }

    #[test]
    fn role_id_of_an_unrelated_guild_role_is_not_enough() {
        // Same name, but the member holds a different id.
        let roles = vec![(RoleId::new(20), "MLB Bot Admin")];
        assert!(!holds_role_named(&[RoleId::new(11)], roles, "MLB Bot Admin"));
    }
}
