// HEXA core cost calculator command.

use crate::core::hexa::{self, SkillKind};
use crate::core::roster::stats::group_thousands;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum SkillChoice {
    Origin,
    Mastery,
    Enhancement,
    Common,
}

impl From<SkillChoice> for SkillKind {
    fn from(choice: SkillChoice) -> Self {
        match choice {
            SkillChoice::Origin => SkillKind::Origin,
            SkillChoice::Mastery => SkillKind::Mastery,
            SkillChoice::Enhancement => SkillKind::Enhancement,
            SkillChoice::Common => SkillKind::Common,
        }
    }
}

/// Calculate HEXA core upgrade costs.
#[poise::command(slash_command, rename = "hexa_calc")]
pub async fn hexa_calc(
    ctx: Context<'_>,
    #[description = "Which core slot"] skill: SkillChoice,
    #[description = "Current level"]
    #[min = 1]
    #[max = 29]
    current: u32,
    #[description = "Target level"]
    #[min = 2]
    #[max = 30]
    target: u32,
    #[description = "Fragments you already own"] owned_fragments: Option<u64>,
) -> Result<(), Error> {
    let kind: SkillKind = skill.into();

    let cost = match hexa::cost_between(current, target) {
        Ok(cost) => cost,
        Err(err) => {
            ctx.say(format!("Error: {}", err)).await?;
            return Ok(());
        }
    };

    let mut embed = serenity::CreateEmbed::new()
        .title("🔮 Hexa Core Calculator")
        .color(0x00ff88)
        .field(
            "Progression",
            format!("**{}**: {} → {}", kind.as_str(), current, target),
            false,
        )
        .field(
            "Total Costs",
            format!(
                "**Origin Fragments**: {}\n**Sol Erda**: {}\n**Sol Erda Energy**: {}",
                group_thousands(cost.fragments),
                group_thousands(cost.sol_erda),
                group_thousands(cost.erda_energy),
            ),
            true,
        );

    if let Some(owned) = owned_fragments {
        let missing = cost.shortfall(owned, 0, 0);
        let value = if missing.fragments == 0 {
            "You already have enough fragments!".to_string()
        } else {
            format!("**Origin Fragments**: {}", group_thousands(missing.fragments))
        };
        embed = embed.field("Still Needed", value, true);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
