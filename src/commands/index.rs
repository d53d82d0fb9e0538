use tracing::info;

use super::format::index_summary;
use super::{autocomplete_repo, selected_repo};
use crate::repos::IndexOutcome;
use crate::state::Context;

/// Index a registered repository so it can be chatted with
#[poise::command(slash_command, guild_only)]
pub async fn index(
    ctx: Context<'_>,
    #[description = "Repo (defaults to the most recent one)"]
    #[autocomplete = "autocomplete_repo"]
    repo: Option<String>,
) -> Result<(), anyhow::Error> {
    let Some(repo) = selected_repo(&ctx, repo.as_deref()).await? else {
        return Ok(());
    };

    if !repo.status.can_start_indexing() {
        ctx.say(format!(
            "**{}** is already `{}`; nothing to do.",
            repo.label(),
            repo.status
        ))
        .await?;
        return Ok(());
    }

    ctx.say(format!("Indexing **{}**... this can take a while.", repo.label()))
        .await?;
    info!(user = ctx.author().name, repo_id = %repo.repo_id, "index requested");

    match ctx.data().repos.trigger_index(&repo.repo_id).await {
        Ok(IndexOutcome::Indexed { record, result }) => {
            ctx.say(format!(
                "**{}** is indexed (`{}`). {}\nAsk away with `/codedoc ask`.",
                record.label(),
                record.status,
                index_summary(&result)
            ))
            .await?;
        }
        Ok(IndexOutcome::Skipped(record)) => {
            ctx.say(format!(
                "**{}** is already `{}`; nothing to do.",
                record.label(),
                record.status
            ))
            .await?;
        }
        Err(e) => {
            ctx.say(format!(
                "Indexing **{}** failed: {}\nThe repo is back to `not_indexed`; run `/codedoc index` to retry.",
                repo.label(),
                e
            ))
            .await?;
        }
    }
    Ok(())
}
