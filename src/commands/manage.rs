use crate::state::Context;

/// Clear this channel's chat history
#[poise::command(slash_command, guild_only)]
pub async fn clear(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let cleared = ctx.data().chat.clear(ctx.channel_id().get()).await;
    ctx.say(if cleared {
        "Chat cleared."
    } else {
        "No chat in this channel."
    })
    .await?;
    Ok(())
}

/// Forget the last saved repo entry (the repo list is kept)
#[poise::command(slash_command, guild_only)]
pub async fn forget(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    ctx.data().store.clear_repo().await;
    ctx.say("Forgot the last saved repo entry. Registered repos are unchanged.")
        .await?;
    Ok(())
}
