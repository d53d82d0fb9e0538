use std::path::PathBuf;

use anyhow::{Context, Result};
use poise::serenity_prelude as serenity;

const DEFAULT_DATA_DIR: &str = "./data/codedoc";

/// Startup settings read from the environment (and `.env`, if present).
///
/// The API base URL is read separately by `ApiClient::from_env` so that a
/// missing value surfaces per request rather than at startup.
pub struct BotConfig {
    pub discord_token: String,
    pub guild_id: Option<serenity::GuildId>,
    pub data_dir: PathBuf,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        let discord_token = dotenv::var("DISCORD_TOKEN").context("DISCORD_TOKEN required")?;
        let guild_id = dotenv::var("DISCORD_GUILD_ID")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(serenity::GuildId::new);
        let data_dir: PathBuf = dotenv::var("CODEDOC_DATA_DIR")
            .ok()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
            .into();

        Ok(Self {
            discord_token,
            guild_id,
            data_dir,
        })
    }
}
