use std::sync::Arc;

use ilb_core::{config::Config, lifecycle::LinkService, router::App};
use ilb_store_sqlite::SqliteLinkStore;
use ilb_telegram::{
    bot_with_timeout, directory::TelegramDirectory, gateway::TelegramInviteGateway, webhook,
    TelegramMessenger,
};

#[tokio::main]
async fn main() -> Result<(), ilb_core::Error> {
    ilb_core::logging::init("ilb")?;

    let cfg = Arc::new(Config::load()?);
    let store = Arc::new(SqliteLinkStore::open(&cfg.database_path).await?);

    let bot = bot_with_timeout(&cfg.bot_token, cfg.request_timeout)?;
    let links = Arc::new(LinkService::new(
        cfg.group_id,
        Arc::new(TelegramDirectory::new(bot.clone())),
        store,
        Arc::new(TelegramInviteGateway::new(bot.clone())),
    ));

    let app = Arc::new(App {
        cfg: cfg.clone(),
        links,
        messenger: Arc::new(TelegramMessenger::new(bot)),
    });

    webhook::serve(app, cfg.bind_addr)
        .await
        .map_err(|e| ilb_core::Error::Transport(format!("webhook server failed: {e}")))?;

    Ok(())
}
