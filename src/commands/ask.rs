use tracing::info;

use super::format::{answer_reply, transcript};
use super::{autocomplete_repo, selected_repo, send_chunked};
use crate::state::Context;

/// Ask a question about an indexed repository
#[poise::command(slash_command, guild_only)]
pub async fn ask(
    ctx: Context<'_>,
    #[description = "Your question"] question: String,
    #[description = "Repo (defaults to the most recent one)"]
    #[autocomplete = "autocomplete_repo"]
    repo: Option<String>,
) -> Result<(), anyhow::Error> {
    let Some(repo) = selected_repo(&ctx, repo.as_deref()).await? else {
        return Ok(());
    };
    ctx.defer().await?;

    let channel = ctx.channel_id().get();
    info!(user = ctx.author().name, channel, repo_id = %repo.repo_id, "chat question received");

    match ctx.data().chat.send(channel, &repo, &question).await {
        Ok(reply) => send_chunked(&ctx, &answer_reply(&repo, &question, &reply)).await,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            Ok(())
        }
    }
}

/// Show this channel's chat history
#[poise::command(slash_command, guild_only)]
pub async fn history(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let Some((repo_id, messages)) = ctx.data().chat.history(ctx.channel_id().get()).await else {
        ctx.say("No chat in this channel yet. Use `/codedoc ask` to start one.")
            .await?;
        return Ok(());
    };

    let label = match ctx.data().store.find(&repo_id).await {
        Some(repo) => repo.label().to_string(),
        None => repo_id,
    };
    send_chunked(&ctx, &transcript(&label, &messages)).await
}
