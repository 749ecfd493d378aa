use crate::discord::{Context, Error};
use chrono::Utc;
use poise::serenity_prelude as serenity;

/// Display the current time across the guild's timezones.
#[poise::command(slash_command, aliases("tz", "times"))]
pub async fn timezones(ctx: Context<'_>) -> Result<(), Error> {
    let snapshot = ctx.data().timezones.guild_snapshot(Utc::now());

    let mut embed = serenity::CreateEmbed::new()
        .title("🌍 Guild Timezones")
        .description(
            "Quick snapshot of local times across the guild. \
             Use this before scheduling boss runs or GPQ parties.",
        )
        .color(0x5865F2) // Blurple
        .timestamp(serenity::Timestamp::now());

    for (tz_def, display) in snapshot {
        let value = format!(
            "**{}** ({})\n{}\n<t:{}:R>\n_{}_",
            display.twelve_hour,
            display.twenty_four_hour,
            display.date_fragment,
            display.relative_timestamp,
            tz_def.note
        );
        embed = embed.field(tz_def.label, value, false);
    }

    embed = embed.footer(serenity::CreateEmbedFooter::new(
        "Grab a timezone role to use !time in your own zone.",
    ));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}
