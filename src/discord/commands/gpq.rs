// Discord commands for GPQ score tracking.
//
// This layer is THIN - no business logic, just translation between
// Discord types and the core roster service.

use crate::core::macros::MacroService;
use crate::core::quotes::QuoteService;
use crate::core::reminders::ReminderService;
use crate::core::roster::stats::format_score;
use crate::core::roster::{DepartureReason, RosterError, RosterService};
use crate::core::setup::SetupService;
use crate::core::timezones::TimezoneService;
use crate::discord::reminder_dispatch;
use crate::infra::data::{JsonMacroStore, JsonQuoteStore};
use crate::infra::sheets::SheetRosterStore;
use chrono::Utc;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands.
/// This is where we store our services and configuration.
pub struct Data {
    pub roster: Arc<RosterService<SheetRosterStore>>,
    pub reminders: Arc<ReminderService<SheetRosterStore>>,
    pub setup: Arc<SetupService<SheetRosterStore>>,
    pub macros: Arc<MacroService<JsonMacroStore>>,
    pub quotes: Arc<QuoteService<JsonQuoteStore>>,
    pub timezones: Arc<TimezoneService>,
    pub reminder_channel: Option<serenity::ChannelId>,
}

/// Officers without Manage Roles can still fire reminders with this role.
const ENFORCER_ROLE: &str = "GPQ Enforcer";

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum DepartureChoice {
    Left,
    Kicked,
}

impl From<DepartureChoice> for DepartureReason {
    fn from(choice: DepartureChoice) -> Self {
        match choice {
            DepartureChoice::Left => DepartureReason::Left,
            DepartureChoice::Kicked => DepartureReason::Kicked,
        }
    }
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Commands refuse to run until `/setup` has been completed. Replies
/// with instructions and returns false when the guild has no profile.
async fn require_setup(ctx: &Context<'_>) -> Result<bool, Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    if ctx.data().setup.is_setup(guild_id.get()).await? {
        return Ok(true);
    }
    ctx.say("This server hasn't been set up yet. An admin needs to run `/setup` first.")
        .await?;
    Ok(false)
}

/// Admin here means Manage Roles, matching who can run member admin.
async fn caller_is_admin(ctx: &Context<'_>) -> bool {
    match ctx.author_member().await {
        Some(member) => member.permissions.map_or(false, |p| p.manage_roles()),
        None => false,
    }
}

async fn caller_can_send_reminders(ctx: &Context<'_>) -> bool {
    if caller_is_admin(ctx).await {
        return true;
    }
    let Some(member) = ctx.author_member().await else {
        return false;
    };
    // Cache guard must not be held across an await point.
    match ctx.guild() {
        Some(guild) => member.roles.iter().any(|role_id| {
            guild
                .roles
                .get(role_id)
                .map_or(false, |role| role.name == ENFORCER_ROLE)
        }),
        None => false,
    }
}

/// Turns roster errors into a user-facing reply instead of the generic
/// framework error message.
async fn reply_roster_error(ctx: &Context<'_>, err: RosterError) -> Result<(), Error> {
    match err {
        RosterError::Storage(detail) => {
            tracing::error!("Roster storage error: {}", detail);
            ctx.say("Something went wrong talking to the roster sheet. Try again in a minute.")
                .await?;
        }
        other => {
            ctx.say(format!("Error: {}", other)).await?;
        }
    }
    Ok(())
}

/// Renders a horizontal unicode bar chart for a score series.
fn bar_chart(labels: &[String], scores: &[Option<u64>], width: usize) -> String {
    let max = scores.iter().flatten().max().copied().unwrap_or(0);
    let label_width = labels.iter().map(|l| l.len()).max().unwrap_or(0);

    let mut out = String::from("```\n");
    for (label, score) in labels.iter().zip(scores) {
        match score {
            Some(score) if max > 0 => {
                let filled = ((*score as f64 / max as f64) * width as f64).round() as usize;
                out.push_str(&format!(
                    "{:>lw$} |{} {}\n",
                    label,
                    "█".repeat(filled.max(1)),
                    format_score(*score),
                    lw = label_width,
                ));
            }
            _ => {
                out.push_str(&format!("{:>lw$} | -\n", label, lw = label_width));
            }
        }
    }
    out.push_str("```");
    out
}

// ============================================================================
// COMMANDS
// ============================================================================

/// Submit your GPQ score for the week.
#[poise::command(slash_command, guild_only)]
pub async fn gpq(
    ctx: Context<'_>,
    #[description = "Your culvert score"] score: u64,
    #[description = "Character name (needed if several are linked)"] character: Option<String>,
    #[description = "Record for last week instead"] prev_week: Option<bool>,
) -> Result<(), Error> {
    ctx.defer().await?;
    if !require_setup(&ctx).await? {
        return Ok(());
    }

    let is_admin = caller_is_admin(&ctx).await;
    let outcome = ctx
        .data()
        .roster
        .record_score(
            ctx.author().id.get(),
            character.as_deref(),
            score,
            prev_week.unwrap_or(false),
            is_admin,
            Utc::now(),
        )
        .await;

    match outcome {
        Ok(outcome) if outcome.new_personal_best => {
            ctx.say(format!(
                "{} SCORED A NEW HIGH SCORE OF {} FOR THE WEEK OF {} 🎉🎉🎉",
                outcome.ign.to_uppercase(),
                format_score(outcome.score),
                outcome.week,
            ))
            .await?;
        }
        Ok(outcome) => {
            ctx.say(format!(
                "{} scored {} for the week of {}",
                outcome.ign,
                format_score(outcome.score),
                outcome.week,
            ))
            .await?;
        }
        Err(err) => reply_roster_error(&ctx, err).await?,
    }
    Ok(())
}

/// Show a character's GPQ stats.
#[poise::command(slash_command, guild_only)]
pub async fn profile(
    ctx: Context<'_>,
    #[description = "Character name (defaults to your linked character)"] character: Option<
        String,
    >,
) -> Result<(), Error> {
    ctx.defer().await?;
    if !require_setup(&ctx).await? {
        return Ok(());
    }

    let view = match ctx
        .data()
        .roster
        .profile(ctx.author().id.get(), character.as_deref(), Utc::now())
        .await
    {
        Ok(view) => view,
        Err(err) => return reply_roster_error(&ctx, err).await,
    };

    let s = &view.summary;
    let opt = |value: Option<u64>| value.map_or("N/A".to_string(), format_score);

    let week_status = if view.current_week_done {
        format!("✅ Done for the week of {}", view.current_week)
    } else {
        format!("❌ Not yet run for the week of {}", view.current_week)
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!("GPQ Profile - {}", view.player.ign))
        .color(0x00ff88)
        .description(week_status)
        .field("Last Score", opt(s.last_score), true)
        .field("Last 4 Average", opt(s.last_four_average), true)
        .field(
            "Last 4 Participation",
            format!("{}/{}", s.last_four_attempts, s.last_four_window),
            true,
        )
        .field("\u{200b}", "```Lifetime Scores```", false)
        .field("Personal Best", format_score(s.personal_best), true)
        .field("Lifetime Total", format_score(s.lifetime_total), true)
        .field("Total Average", opt(s.total_average), true)
        .field(
            "Participation",
            format!("{}/{}", s.attempts, s.weeks_tracked),
            true,
        )
        .footer(serenity::CreateEmbedFooter::new(
            "Submit scores with /gpq, visualize scores with /graph.",
        ));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Chart a character's recent GPQ scores.
#[poise::command(slash_command, guild_only)]
pub async fn graph(
    ctx: Context<'_>,
    #[description = "Character name (defaults to your linked character)"] character: Option<
        String,
    >,
    #[description = "How many weeks to show (default 7)"]
    #[min = 2]
    #[max = 26]
    num_weeks: Option<u32>,
) -> Result<(), Error> {
    ctx.defer().await?;
    if !require_setup(&ctx).await? {
        return Ok(());
    }

    let data = match ctx
        .data()
        .roster
        .graph_series(
            ctx.author().id.get(),
            character.as_deref(),
            num_weeks.unwrap_or(7) as usize,
            Utc::now(),
        )
        .await
    {
        Ok(data) => data,
        Err(err) => return reply_roster_error(&ctx, err).await,
    };

    if data.labels.is_empty() {
        ctx.say(format!("No scores recorded yet for {}.", data.ign))
            .await?;
        return Ok(());
    }

    let embed = serenity::CreateEmbed::new()
        .title(format!("GPQ Scores - {}", data.ign))
        .color(0x00ff88)
        .description(bar_chart(&data.labels, &data.scores, 20))
        .field("Personal Best", format_score(data.personal_best), true)
        .field(
            "Sandbag Threshold",
            format_score(data.sandbag_threshold),
            true,
        );

    let mut reply = poise::CreateReply::default().embed(embed);
    if data.is_sandbagging() {
        reply = reply.content("SANDBAGGER DETECTED 🔪");
    }
    ctx.send(reply).await?;
    Ok(())
}

/// Chart the guild's total GPQ score per week.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn guild_graph(
    ctx: Context<'_>,
    #[description = "How many weeks to show (default 8)"]
    #[min = 2]
    #[max = 26]
    num_weeks: Option<u32>,
) -> Result<(), Error> {
    ctx.defer().await?;
    if !require_setup(&ctx).await? {
        return Ok(());
    }

    let totals = match ctx
        .data()
        .roster
        .guild_weekly_totals(num_weeks.unwrap_or(8) as usize, Utc::now())
        .await
    {
        Ok(totals) => totals,
        Err(err) => return reply_roster_error(&ctx, err).await,
    };

    if totals.is_empty() {
        ctx.say("No guild scores recorded yet.").await?;
        return Ok(());
    }

    let labels: Vec<String> = totals.iter().map(|(week, _)| week.short_label()).collect();
    let scores: Vec<Option<u64>> = totals.iter().map(|(_, total)| Some(*total)).collect();
    let best = totals.iter().map(|(_, t)| *t).max().unwrap_or(0);
    let latest = totals.last().map(|(_, t)| *t).unwrap_or(0);

    let guild_name = ctx
        .data()
        .setup
        .profile(ctx.guild_id().map(|g| g.get()).unwrap_or(0))
        .await?
        .map(|p| p.guild_name)
        .unwrap_or_else(|| "Guild".to_string());

    let embed = serenity::CreateEmbed::new()
        .title(format!("{} - Guild GPQ Statistics", guild_name))
        .color(0x00ff88)
        .description(bar_chart(&labels, &scores, 20))
        .field("Best Week", format_score(best), true)
        .field("Latest Week", format_score(latest), true);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// List the characters linked to your Discord account.
#[poise::command(slash_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;
    if !require_setup(&ctx).await? {
        return Ok(());
    }

    let players = match ctx.data().roster.characters_of(ctx.author().id.get()).await {
        Ok(players) => players,
        Err(err) => return reply_roster_error(&ctx, err).await,
    };

    if players.is_empty() {
        ctx.say("No characters found for your account.").await?;
        return Ok(());
    }

    let names: Vec<&str> = players.iter().map(|p| p.ign.as_str()).collect();
    ctx.say(names.join(", ")).await?;
    Ok(())
}

/// Link a MapleStory character to a Discord account.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn link(
    ctx: Context<'_>,
    #[description = "Character IGN"] character: String,
    #[description = "Who owns it"] user: serenity::User,
) -> Result<(), Error> {
    ctx.defer().await?;
    if !require_setup(&ctx).await? {
        return Ok(());
    }

    match ctx
        .data()
        .roster
        .link(&character, user.id.get(), &user.name)
        .await
    {
        Ok(player) => {
            ctx.say(format!(
                "Successfully linked {} to <@{}>.",
                player.ign,
                user.id.get()
            ))
            .await?;
        }
        Err(err) => reply_roster_error(&ctx, err).await?,
    }
    Ok(())
}

/// Remove a departing member's characters from the roster.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn unlink(
    ctx: Context<'_>,
    #[description = "The member who left"] user: serenity::User,
    #[description = "Why they left"] reason: DepartureChoice,
) -> Result<(), Error> {
    ctx.defer().await?;
    if !require_setup(&ctx).await? {
        return Ok(());
    }

    match ctx
        .data()
        .roster
        .unlink(user.id.get(), reason.into())
        .await
    {
        Ok(removed) => {
            ctx.say(format!(
                "Archived and removed {} character(s) for {}: {}",
                removed.len(),
                user.name,
                removed.join(", "),
            ))
            .await?;
        }
        Err(err) => reply_roster_error(&ctx, err).await?,
    }
    Ok(())
}

/// Rename a character, keeping its score history.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn rename(
    ctx: Context<'_>,
    #[description = "Current IGN"] old_name: String,
    #[description = "New IGN"] new_name: String,
) -> Result<(), Error> {
    ctx.defer().await?;
    if !require_setup(&ctx).await? {
        return Ok(());
    }

    match ctx
        .data()
        .roster
        .rename(ctx.author().id.get(), &old_name, &new_name, true)
        .await
    {
        Ok(()) => {
            ctx.say(format!("Renamed **{}** to **{}**.", old_name.trim(), new_name.trim()))
                .await?;
        }
        Err(err) => reply_roster_error(&ctx, err).await?,
    }
    Ok(())
}

/// Fire the weekly GPQ reminder right now.
#[poise::command(slash_command, guild_only, rename = "manual-reminder")]
pub async fn manual_reminder(
    ctx: Context<'_>,
    #[description = "Actually ping the missing members"] mention: Option<bool>,
) -> Result<(), Error> {
    ctx.defer().await?;
    if !require_setup(&ctx).await? {
        return Ok(());
    }

    if !caller_can_send_reminders(&ctx).await {
        ctx.say(format!(
            "You need Manage Roles or the `{}` role to send reminders.",
            ENFORCER_ROLE
        ))
        .await?;
        return Ok(());
    }

    let report = match ctx.data().reminders.build_report(Utc::now()).await {
        Ok(report) => report,
        Err(err) => return reply_roster_error(&ctx, err).await,
    };

    let messages = reminder_dispatch::format_report(&report, mention.unwrap_or(false));
    for message in messages {
        ctx.channel_id().say(ctx.http(), message).await?;
    }
    ctx.say("Reminder sent.").await?;
    Ok(())
}
