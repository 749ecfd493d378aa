// Social commands: quotes, nicknames and member-defined macros.

use crate::discord::{Context, Error};
use chrono::Utc;
use poise::serenity_prelude as serenity;

/// Discord caps nicknames at 32 characters.
const MAX_NICKNAME_LEN: usize = 32;

/// Replay a random saved quote.
#[poise::command(slash_command, guild_only)]
pub async fn quote(ctx: Context<'_>) -> Result<(), Error> {
    match ctx.data().quotes.random().await {
        Ok(quote) => {
            ctx.say(format!(
                "\"{}\"\n- {}, {}",
                quote.message, quote.user, quote.year
            ))
            .await?;
        }
        Err(err) => {
            ctx.say(format!("Error: {}", err)).await?;
        }
    }
    Ok(())
}

/// Immortalize something someone said.
#[poise::command(slash_command, guild_only)]
pub async fn addquote(
    ctx: Context<'_>,
    #[description = "What they said"] message: String,
    #[description = "Who said it"] user: serenity::User,
) -> Result<(), Error> {
    match ctx
        .data()
        .quotes
        .add_quote(&message, &user.name, Utc::now())
        .await
    {
        Ok(quote) => {
            ctx.say(format!(
                "Saved: \"{}\" - {}, {}",
                quote.message, quote.user, quote.year
            ))
            .await?;
        }
        Err(err) => {
            ctx.say(format!("Error: {}", err)).await?;
        }
    }
    Ok(())
}

/// Change your server nickname. Linked members keep their IGN visible
/// as a `nickname | IGN` suffix.
#[poise::command(slash_command, guild_only)]
pub async fn nickname(
    ctx: Context<'_>,
    #[description = "Your new nickname"] name: String,
) -> Result<(), Error> {
    ctx.defer().await?;
    let name = name.trim();
    if name.is_empty() {
        ctx.say("Please provide a nickname.").await?;
        return Ok(());
    }

    let characters = ctx
        .data()
        .roster
        .characters_of(ctx.author().id.get())
        .await
        .unwrap_or_default();

    let new_nick = match characters.first() {
        Some(player) if player.ign != name => format!("{} | {}", name, player.ign),
        _ => name.to_string(),
    };
    if new_nick.chars().count() > MAX_NICKNAME_LEN {
        ctx.say(
            "Nickname too long, please enter your nickname only, not your IGN. \
             Your IGN will be added automatically.",
        )
        .await?;
        return Ok(());
    }

    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    guild_id
        .edit_member(
            ctx.http(),
            ctx.author().id,
            serenity::EditMember::new().nickname(&new_nick),
        )
        .await?;

    ctx.say("Nickname successfully changed.").await?;
    Ok(())
}

/// Register a `!macro` that plays back text or an attachment.
#[poise::command(slash_command, guild_only)]
pub async fn register_macro(
    ctx: Context<'_>,
    #[description = "Macro name (used as !name)"] name: String,
    #[description = "Text to play back"] content: Option<String>,
    #[description = "Attachment to play back"] attachment: Option<serenity::Attachment>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let attachment_url = attachment.map(|a| a.url);

    match ctx
        .data()
        .macros
        .register(guild_id.get(), &name, content, attachment_url)
        .await
    {
        Ok(definition) => {
            ctx.say(format!(
                "Macro registered! Play it back with `!{}`.",
                definition.name
            ))
            .await?;
        }
        Err(err) => {
            ctx.say(format!("Error: {}", err)).await?;
        }
    }
    Ok(())
}

/// Delete a registered macro.
#[poise::command(slash_command, guild_only)]
pub async fn remove_macro(
    ctx: Context<'_>,
    #[description = "Macro name"] name: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    match ctx.data().macros.remove(guild_id.get(), &name).await {
        Ok(()) => {
            ctx.say("Macro removed.").await?;
        }
        Err(err) => {
            ctx.say(format!("Error: {}", err)).await?;
        }
    }
    Ok(())
}
