use tracing::info;

use crate::state::Context;

/// Register a GitHub repository with the indexing service
#[poise::command(slash_command, guild_only)]
pub async fn add(
    ctx: Context<'_>,
    #[description = "GitHub repo URL: https://github.com/owner/repo"] url: String,
    #[description = "Friendly name (optional)"] name: Option<String>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;
    info!(user = ctx.author().name, url, "repo registration requested");

    match ctx.data().repos.register(name.as_deref(), &url).await {
        Ok(repo) => {
            ctx.say(format!(
                "Registered **{}** ({})\nRepo ID: `{}` | Status: `{}`\nRun `/codedoc index` to index it.",
                repo.label(),
                repo.github_url,
                repo.repo_id,
                repo.status
            ))
            .await?;
        }
        Err(e) => {
            ctx.say(format!("Could not register repo: {}", e)).await?;
        }
    }
    Ok(())
}
