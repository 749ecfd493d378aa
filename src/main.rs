// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (spreadsheet, JSON files)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::macros::MacroService;
use crate::core::quotes::QuoteService;
use crate::core::reminders::ReminderService;
use crate::core::roster::week;
use crate::core::roster::RosterService;
use crate::core::setup::SetupService;
use crate::core::timezones::TimezoneService;
use crate::discord::{events, reminder_dispatch, Data, Error};
use crate::infra::data::{JsonMacroStore, JsonQuoteStore};
use crate::infra::sheets::{extract_spreadsheet_id, ServiceAccountAuth, SheetRosterStore, SheetsClient};
use chrono::Utc;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Event handler for non-command Discord events.
/// This is where prefix commands (`!time`, macros) are handled.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = events::handle_message(ctx, new_message, data).await {
                tracing::error!("Error handling message: {}", e);
            }
        }
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!("Connected as {}", data_about_bot.user.name);
        }
        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    let spreadsheet = std::env::var("SPREADSHEET_ID")
        .expect("Missing SPREADSHEET_ID environment variable (spreadsheet ID or URL)!");
    let spreadsheet_id = extract_spreadsheet_id(&spreadsheet)
        .expect("SPREADSHEET_ID is neither a spreadsheet ID nor a spreadsheet URL");

    // Set PRODUCTION for global command registration; unset, commands
    // are registered in DEV_GUILD_ID only (instant updates during dev).
    let production = std::env::var("PRODUCTION").is_ok();
    let dev_guild_id = std::env::var("DEV_GUILD_ID")
        .ok()
        .and_then(|v| v.parse::<u64>().ok());

    let reminder_channel = std::env::var("REMINDER_CHANNEL_ID")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(serenity::ChannelId::new);

    // Keep the JSON stores in a dedicated folder so the repo root stays tidy.
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
    std::fs::create_dir_all(&data_dir).expect("Failed to create data directory");

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let auth = ServiceAccountAuth::from_env()
        .await
        .expect("Failed to load Google service account credentials");
    let sheets_client = SheetsClient::new(auth, spreadsheet_id);

    // One store serves the roster, reminder and settings traits so they
    // all share the same range cache.
    let roster_store = Arc::new(SheetRosterStore::new(sheets_client));

    let roster_service = Arc::new(RosterService::new(Arc::clone(&roster_store)));
    let reminder_service = Arc::new(ReminderService::new(Arc::clone(&roster_store)));
    let setup_service = Arc::new(SetupService::new(Arc::clone(&roster_store)));

    let macro_store = Arc::new(JsonMacroStore::new(format!("{}/macros.json", data_dir)));
    let macro_service = Arc::new(MacroService::new(macro_store));

    let quote_store = Arc::new(JsonQuoteStore::new(format!("{}/quotes.json", data_dir)));
    let quote_service = Arc::new(QuoteService::new(quote_store));

    let timezone_service = Arc::new(TimezoneService::new());

    // Create the data structure that will be shared across all commands
    let data = Data {
        roster: Arc::clone(&roster_service),
        reminders: Arc::clone(&reminder_service),
        setup: Arc::clone(&setup_service),
        macros: Arc::clone(&macro_service),
        quotes: Arc::clone(&quote_service),
        timezones: Arc::clone(&timezone_service),
        reminder_channel,
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================
    // Configure the poise framework with our commands and settings.

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // Register all our commands here
            commands: vec![
                discord::commands::gpq::gpq(),
                discord::commands::gpq::profile(),
                discord::commands::gpq::graph(),
                discord::commands::gpq::guild_graph(),
                discord::commands::gpq::list(),
                discord::commands::gpq::link(),
                discord::commands::gpq::unlink(),
                discord::commands::gpq::rename(),
                discord::commands::gpq::manual_reminder(),
                discord::commands::setup::setup(),
                discord::commands::social::quote(),
                discord::commands::social::addquote(),
                discord::commands::social::nickname(),
                discord::commands::social::register_macro(),
                discord::commands::social::remove_macro(),
                discord::commands::hexa::hexa_calc(),
                discord::commands::timezones::timezones(),
            ],
            // Event handler for messages and other events
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                if production {
                    // Global registration can take up to an hour to propagate
                    poise::builtins::register_globally(ctx, &framework.options().commands)
                        .await?;
                    tracing::info!("Commands registered globally");
                } else {
                    let guild_id = dev_guild_id
                        .expect("DEV_GUILD_ID must be set when PRODUCTION is not");
                    poise::builtins::register_in_guild(
                        ctx,
                        &framework.options().commands,
                        serenity::GuildId::new(guild_id),
                    )
                    .await?;
                    tracing::info!("Commands registered in dev guild {}", guild_id);
                }

                // Background weekly reminder. Sleeps until the next
                // Wednesday midnight UTC, sends, then waits for the
                // following week.
                if let Some(channel) = data.reminder_channel {
                    let reminders = Arc::clone(&data.reminders);
                    let http = ctx.http.clone();
                    tokio::spawn(async move {
                        loop {
                            let wait = week::time_until_reminder(Utc::now());
                            tracing::info!(
                                "Next GPQ reminder in {} seconds",
                                wait.as_secs()
                            );
                            tokio::time::sleep(wait).await;

                            if !reminders.try_acquire() {
                                continue;
                            }
                            match reminders.build_report(Utc::now()).await {
                                Ok(report) => {
                                    reminder_dispatch::send_reminder(&http, channel, &report)
                                        .await;
                                }
                                Err(e) => {
                                    tracing::error!("Failed to build reminder report: {}", e);
                                }
                            }
                        }
                    });
                } else {
                    tracing::warn!(
                        "REMINDER_CHANNEL_ID not set, weekly reminders are disabled"
                    );
                }

                tracing::info!("Bot is ready");
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .expect("Failed to create Discord client");

    if let Err(e) = client.start().await {
        tracing::error!("Client error: {}", e);
    }
}
