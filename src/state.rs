use std::sync::Arc;

use crate::api::ApiClient;
use crate::chat::ChatFlow;
use crate::repos::RepoFlow;
use crate::store::RepoStore;

pub struct AppState {
    pub store: Arc<RepoStore>,
    pub api: Arc<ApiClient>,
    pub repos: RepoFlow,
    pub chat: ChatFlow,
}

impl AppState {
    pub fn new(store: Arc<RepoStore>, api: Arc<ApiClient>) -> Self {
        let repos = RepoFlow::new(api.clone(), store.clone());
        let chat = ChatFlow::new(api.clone());
        Self {
            store,
            api,
            repos,
            chat,
        }
    }
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;
