mod api;
mod chat;
mod commands;
mod config;
mod repos;
mod state;
mod store;
mod validate;

use std::sync::Arc;

use poise::serenity_prelude as serenity;
use poise::{Framework, FrameworkOptions};
use tracing::{error, info, warn, Level};

use api::ApiClient;
use config::BotConfig;
use state::AppState;
use store::RepoStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    // Load env
    let _ = dotenv::dotenv();
    let config = BotConfig::from_env()?;

    // Init storage
    let store = Arc::new(RepoStore::open_or_detached(&config.data_dir).await);
    if store.is_persistent() {
        info!("Repo store initialized at {:?}", config.data_dir);
    }

    // Init API client
    let api = Arc::new(ApiClient::from_env()?);
    if api.is_configured() {
        info!("API client initialized");
    } else {
        warn!("{} is not set; every remote action will fail", api::API_BASE_ENV);
    }

    let app_state = AppState::new(store, api);
    let guild_id = config.guild_id;

    let intents = serenity::GatewayIntents::GUILDS;

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: vec![commands::codedoc()],
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot connected as: {} ({})", ready.user.name, ready.user.id);

                let commands = &framework.options().commands;
                info!("Registering {} top-level command(s):", commands.len());
                for cmd in commands {
                    info!("  /{} ({} subcommands)", cmd.name, cmd.subcommands.len());
                    for sub in &cmd.subcommands {
                        info!("    /{} {}", cmd.name, sub.name);
                    }
                }

                if let Some(gid) = guild_id {
                    info!("Registering to guild {} (instant)", gid);
                    poise::builtins::register_in_guild(ctx, &framework.options().commands, gid)
                        .await?;
                } else {
                    info!("Registering globally (up to 1 hour delay)");
                    poise::builtins::register_globally(ctx, &framework.options().commands)
                        .await?;
                }

                Ok(app_state)
            })
        })
        .build();

    info!("Starting Codedoc Discord bot...");

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }

    Ok(())
}
