mod add;
mod ask;
mod format;
mod index;
mod manage;
mod repos;

use crate::api::types::RepoRecord;
use crate::state::Context;

/// Codedoc - chat with your indexed GitHub repositories
#[poise::command(
    slash_command,
    subcommands(
        "add::add",
        "index::index",
        "repos::repos",
        "repos::sync",
        "ask::ask",
        "ask::history",
        "manage::clear",
        "manage::forget"
    )
)]
pub async fn codedoc(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Look up the repo a command refers to, telling the user when there is none.
/// Without a reference the most recently saved repo is used.
async fn selected_repo(
    ctx: &Context<'_>,
    reference: Option<&str>,
) -> Result<Option<RepoRecord>, anyhow::Error> {
    let store = &ctx.data().store;
    let reference = reference.map(str::trim).filter(|r| !r.is_empty());
    let found = match reference {
        Some(r) => store.resolve(r).await,
        None => store.get_repo().await,
    };

    if found.is_none() {
        let msg = match reference {
            Some(r) => format!("No repo matches `{}`. Use `/codedoc repos` to list them.", r),
            None => "No repo selected. Use `/codedoc add` to register one.".to_string(),
        };
        ctx.say(msg).await?;
    }
    Ok(found)
}

/// Autocomplete repo references from the local collection.
async fn autocomplete_repo(ctx: Context<'_>, partial: &str) -> Vec<String> {
    let partial = partial.to_lowercase();
    ctx.data()
        .store
        .get_repos()
        .await
        .into_iter()
        .filter(|r| {
            r.github_url.to_lowercase().contains(&partial)
                || r.name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&partial))
        })
        .map(|r| r.github_url)
        .take(25)
        .collect()
}

/// Send a message in Discord-safe chunks (max 1990 chars), splitting on a
/// newline or space where possible.
async fn send_chunked(ctx: &Context<'_>, text: &str) -> Result<(), anyhow::Error> {
    for chunk in format::chunks(text, 1990) {
        ctx.say(chunk).await?;
    }
    Ok(())
}
