use std::sync::Arc;

use tracing::error;

use crate::commands::{parse_command, Command};
use crate::config::Config;
use crate::domain::{ChatKind, Inbound};
use crate::errors::Error;
use crate::lifecycle::{EnsureOutcome, LinkService};
use crate::ports::Messenger;
use crate::replies;
use crate::Result;

/// Everything a request handler needs, wired once at startup.
#[derive(Clone)]
pub struct App {
    pub cfg: Arc<Config>,
    pub links: Arc<LinkService>,
    pub messenger: Arc<dyn Messenger>,
}

/// Route one inbound text message.
///
/// Unrecognized text parses to no command and is dropped without a reply, so
/// the bot stays silent in group chats it happens to be in.
pub async fn handle_inbound(app: &App, msg: &Inbound) -> Result<()> {
    let Some(cmd) = parse_command(&msg.text, &app.cfg.bot_username) else {
        return Ok(());
    };

    if cmd.private_only() && msg.chat_kind != ChatKind::Private {
        return reply(app, msg, &replies::context_violation(&app.cfg.bot_username)).await;
    }

    match cmd {
        Command::Start | Command::Help => reply(app, msg, replies::COMMAND_OVERVIEW).await,

        Command::Link => {
            let text = match app.links.ensure_link(msg.from).await {
                Ok(EnsureOutcome::Existing(link)) => replies::existing_link(&link),
                Ok(EnsureOutcome::Created(link)) => replies::created_link(&link),
                Err(e) => failure_reply(&e),
            };
            reply(app, msg, &text).await
        }

        Command::Remake => {
            let text = match app.links.remake_link(msg.from).await {
                Ok(link) => replies::remade_link(&link),
                Err(e) => failure_reply(&e),
            };
            reply(app, msg, &text).await
        }

        Command::Scan => {
            // Pre-check so the progress notice only goes to actual admins;
            // scan_group re-verifies as its own precondition.
            if !app.links.is_admin(msg.from).await {
                return reply(app, msg, &replies::admin_only()).await;
            }

            let _ = reply(app, msg, &replies::scan_started()).await;

            let text = match app.links.scan_group(msg.from).await {
                Ok(report) => replies::scan_report(&report),
                Err(e) => failure_reply(&e),
            };
            reply(app, msg, &text).await
        }
    }
}

/// Map an operation failure to what the user sees. Domain rejections get
/// their own wording; everything else is logged in full and answered with a
/// generic apology.
fn failure_reply(err: &Error) -> String {
    match err {
        Error::NotMember => replies::not_member(),
        Error::NotAdmin => replies::admin_only(),
        Error::NoExistingLink => replies::no_existing_link(),
        other => {
            error!(error = %other, "link operation failed");
            replies::try_again_later()
        }
    }
}

async fn reply(app: &App, msg: &Inbound, html: &str) -> Result<()> {
    app.messenger
        .send_html(msg.chat, Some(msg.message_id), html)
        .await
}
