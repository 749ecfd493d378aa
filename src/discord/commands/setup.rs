// One-time server setup command.

use crate::core::setup::World;
use crate::discord::{Context, Error};
use chrono::Utc;
use poise::serenity_prelude as serenity;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum WorldChoice {
    Kronos,
    Hyperion,
    Scania,
    Bera,
}

impl From<WorldChoice> for World {
    fn from(choice: WorldChoice) -> Self {
        match choice {
            WorldChoice::Kronos => World::Kronos,
            WorldChoice::Hyperion => World::Hyperion,
            WorldChoice::Scania => World::Scania,
            WorldChoice::Bera => World::Bera,
        }
    }
}

/// Set up GPQ tracking for this server.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn setup(
    ctx: Context<'_>,
    #[description = "Your MapleStory guild's name"] guild_name: String,
    #[description = "Which world the guild plays on"] world: WorldChoice,
) -> Result<(), Error> {
    ctx.defer().await?;
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;

    let result = ctx
        .data()
        .setup
        .complete_setup(
            guild_id.get(),
            &guild_name,
            world.into(),
            ctx.author().id.get(),
            Utc::now(),
        )
        .await;

    match result {
        Ok(profile) => {
            let embed = serenity::CreateEmbed::new()
                .title("Setup complete! 🎉")
                .color(0x00ff88)
                .field("Guild", &profile.guild_name, true)
                .field("World", profile.world.to_string(), true)
                .description(
                    "You're all set. Members can link characters with `/link` \
                     and submit scores with `/gpq`.",
                );
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        Err(err) => {
            ctx.say(format!("Error: {}", err)).await?;
        }
    }
    Ok(())
}
