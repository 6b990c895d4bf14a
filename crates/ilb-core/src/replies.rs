//! User-facing reply texts (Telegram HTML).

use crate::domain::InviteLink;
use crate::lifecycle::ScanReport;

/// `/start` and `/help` both answer with the command overview.
pub const COMMAND_OVERVIEW: &str = "<b>Available commands:</b>\n\
/help - show this help\n\
/link - get your personal invite link\n\
/remake - regenerate your invite link\n\
\n\
<b>Notes:</b>\n\
• every user holds at most one active link\n\
• links never expire and have no usage limit\n\
• regenerating a link invalidates the old one immediately";

/// Liveness-probe body for non-POST requests to the webhook endpoint.
pub const GREETING: &str = "invite-link bot is up";

pub fn existing_link(link: &InviteLink) -> String {
    format!(
        "📎 Your invite link:\n<code>{}</code>\n\n\
         It never expires and has no usage limit.\n\
         Use /remake to replace it with a new one.",
        escape_html(&link.0)
    )
}

pub fn created_link(link: &InviteLink) -> String {
    format!(
        "✅ New link created!\n\n📎 Your invite link:\n<code>{}</code>\n\n\
         It never expires and has no usage limit.",
        escape_html(&link.0)
    )
}

pub fn remade_link(link: &InviteLink) -> String {
    format!(
        "✅ Link regenerated!\n\n📎 Your new link:\n<code>{}</code>\n\n\
         The old link no longer works.",
        escape_html(&link.0)
    )
}

pub fn not_member() -> String {
    "❌ You are not in the group, so there is no link for you.".to_string()
}

pub fn admin_only() -> String {
    "❌ This command is restricted to group administrators.".to_string()
}

pub fn no_existing_link() -> String {
    "❌ You have no invite link yet. Use /link to get one first.".to_string()
}

pub fn context_violation(bot_username: &str) -> String {
    format!("👋 Please use this command in a private chat: @{bot_username}")
}

pub fn scan_started() -> String {
    "🔍 Scanning stored invite links...".to_string()
}

pub fn scan_report(report: &ScanReport) -> String {
    format!(
        "✅ Scan finished!\nChecked: {} | Cleaned: {} | Revoked: {}",
        report.checked, report.cleaned, report.revoked
    )
}

pub fn try_again_later() -> String {
    "⚠️ Something went wrong. Please try again later.".to_string()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
