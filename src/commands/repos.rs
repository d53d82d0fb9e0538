use super::format::repo_list;
use super::send_chunked;
use crate::state::Context;

/// List registered repositories and their indexing status
#[poise::command(slash_command, guild_only)]
pub async fn repos(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let data = ctx.data();
    let repos = data.store.get_repos().await;

    let mut output = if repos.is_empty() {
        "No repos registered yet. Use `/codedoc add` to add one.\n".to_string()
    } else {
        repo_list(&repos)
    };
    if !data.store.is_persistent() {
        output.push_str("\n_Storage is unavailable; this list will not survive a restart._\n");
    }
    if !data.api.is_configured() {
        output.push_str("\n_The API base URL is not configured; remote actions will fail._\n");
    }

    send_chunked(&ctx, &output).await
}

/// Replace the local repo list with the server's
#[poise::command(slash_command, guild_only)]
pub async fn sync(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    match ctx.data().repos.sync().await {
        Ok(repos) if repos.is_empty() => {
            ctx.say("The server reports no repos.").await?;
        }
        Ok(repos) => {
            let output = format!(
                "Synced {} repo(s) from the server.\n\n{}",
                repos.len(),
                repo_list(&repos)
            );
            send_chunked(&ctx, &output).await?;
        }
        Err(e) => {
            ctx.say(format!("Sync failed: {}", e)).await?;
        }
    }
    Ok(())
}
