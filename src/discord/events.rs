// Prefix command handling for plain chat messages. Slash commands go
// through poise; these are the lightweight `!` commands members use
// mid-conversation.

use crate::discord::Data;
use chrono::Utc;
use chrono_tz::Tz;
use poise::serenity_prelude as serenity;

const HELP_TEXT: &str = "**GPQ Bot commands**\n\
    `/gpq <score>` - Submit your culvert score for the week\n\
    `/profile [character]` - Show a character's GPQ stats\n\
    `/graph [character]` - Chart recent scores\n\
    `/guild_graph` - Chart the guild's weekly totals (staff)\n\
    `/list` - Show the characters linked to your account\n\
    `/link <character> <user>` - Link a character to a Discord account (staff)\n\
    `/unlink <user>` - Archive and remove a member's characters (staff)\n\
    `/rename <old> <new>` - Rename a character on the roster (staff)\n\
    `/manual-reminder` - Ping everyone who hasn't submitted yet (staff)\n\
    `/setup` - Configure the bot for this server (admin)\n\
    `/nickname <name>` - Set your nickname, your IGN is appended\n\
    `/hexa_calc` - HEXA core cost calculator\n\
    `/quote`, `/addquote` - The guild quote board\n\
    `/register_macro`, `/remove_macro` - Manage `!` macros\n\
    `/timezones` - Current time around the guild\n\
    `!time <when>` - Convert your local time, e.g. `!time today 8pm` \
    (needs a timezone role)\n\
    `!m` - List this server's macros, `!<name>` plays one back";

/// Entry point for every non-bot message.
pub async fn handle_message(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &Data,
) -> Result<(), crate::discord::Error> {
    if message.author.bot {
        return Ok(());
    }

    let content = message.content.trim();
    if !content.starts_with('!') {
        return Ok(());
    }

    if let Some(rest) = content.strip_prefix("!time") {
        return handle_time(ctx, message, data, rest).await;
    }

    match content {
        "!m" => handle_list_macros(ctx, message, data).await,
        "!help" => {
            message.channel_id.say(&ctx.http, HELP_TEXT).await?;
            Ok(())
        }
        _ => handle_macro_playback(ctx, message, data, content).await,
    }
}

/// `!time today 8pm` converts the caller's local time to a Discord
/// timestamp everyone sees in their own zone.
async fn handle_time(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &Data,
    rest: &str,
) -> Result<(), crate::discord::Error> {
    let phrase = rest.trim();
    if phrase.is_empty() {
        message
            .channel_id
            .say(&ctx.http, "Please provide a time. Example: `!time today 8pm`")
            .await?;
        return Ok(());
    }

    // The caller's timezone comes from their roles; the lookup needs
    // the guild cache, so resolve names before any await.
    let role_names: Vec<String> = match message.guild(&ctx.cache) {
        Some(guild) => message
            .member
            .as_ref()
            .map(|member| {
                member
                    .roles
                    .iter()
                    .filter_map(|role_id| guild.roles.get(role_id))
                    .map(|role| role.name.clone())
                    .collect()
            })
            .unwrap_or_default(),
        None => Vec::new(),
    };

    let tz = data
        .timezones
        .timezone_for_roles(role_names.iter().map(String::as_str));
    let mut reply = String::new();
    let tz: Tz = match tz {
        Some(tz) => tz,
        None => {
            reply.push_str("User does not have a timezone role. Assuming UTC!\n");
            chrono_tz::UTC
        }
    };

    match data.timezones.parse_time_phrase(phrase, tz, Utc::now()) {
        Some(instant) => {
            let ts = instant.timestamp();
            reply.push_str(&format!("<t:{ts}:F> (<t:{ts}:R>)"));
            message.channel_id.say(&ctx.http, reply).await?;
        }
        None => {
            message
                .channel_id
                .say(
                    &ctx.http,
                    "Couldn't understand that time. Try something like `Saturday at 10am`.",
                )
                .await?;
        }
    }
    Ok(())
}

async fn handle_list_macros(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &Data,
) -> Result<(), crate::discord::Error> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };

    let names = data.macros.list(guild_id.get()).await?;
    let reply = if names.is_empty() {
        "No macros registered yet. Add one with `/register_macro`.".to_string()
    } else {
        format!(
            "**Registered macros:** {}",
            names
                .iter()
                .map(|n| format!("`!{}`", n))
                .collect::<Vec<_>>()
                .join(" ")
        )
    };
    message.channel_id.say(&ctx.http, reply).await?;
    Ok(())
}

/// Any other `!word` message might be a macro. Unknown names are
/// silently ignored so ordinary exclamations don't spam errors.
async fn handle_macro_playback(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &Data,
    content: &str,
) -> Result<(), crate::discord::Error> {
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    let Some(name) = content.split_whitespace().next() else {
        return Ok(());
    };

    let Some(definition) = data.macros.lookup(guild_id.get(), name).await? else {
        return Ok(());
    };

    if let Some(text) = &definition.content {
        message.channel_id.say(&ctx.http, text.clone()).await?;
    }
    if let Some(url) = &definition.attachment_url {
        message.channel_id.say(&ctx.http, url.clone()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_text_mentions_every_registered_command() {
        let commands = [
            "/gpq", "/profile", "/graph", "/guild_graph", "/list", "/link", "/unlink", "/rename",
            "/manual-reminder", "/setup", "/nickname", "/hexa_calc", "/quote", "/addquote",
            "/register_macro", "/remove_macro", "/timezones",
        ];
        for command in commands {
            assert!(
                HELP_TEXT.contains(command),
                "help text is missing {command}"
            );
        }
    }
}
