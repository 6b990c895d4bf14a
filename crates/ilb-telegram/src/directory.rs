use async_trait::async_trait;

use teloxide::requests::Requester;
use teloxide::types::ChatMemberStatus;
use teloxide::Bot;

use tracing::warn;

use ilb_core::domain::{GroupId, UserId};
use ilb_core::ports::Directory;

use crate::tg_chat;

/// Membership lookups over `getChatMember`.
///
/// Fail-closed: any transport failure or non-success response answers
/// `false`, so a directory outage can never mint links.
#[derive(Clone)]
pub struct TelegramDirectory {
    bot: Bot,
}

impl TelegramDirectory {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn status(&self, group: GroupId, user: UserId) -> Option<ChatMemberStatus> {
        match self
            .bot
            .get_chat_member(tg_chat(group.0), teloxide::types::UserId(user.0 as u64))
            .await
        {
            Ok(member) => Some(member.status()),
            Err(e) => {
                warn!(
                    group = group.0,
                    user = user.0,
                    error = %e,
                    "getChatMember failed, treating user as absent"
                );
                None
            }
        }
    }
}

/// Present in the group in any capacity, including restricted members.
fn is_present(status: ChatMemberStatus) -> bool {
    matches!(
        status,
        ChatMemberStatus::Owner
            | ChatMemberStatus::Administrator
            | ChatMemberStatus::Member
            | ChatMemberStatus::Restricted
    )
}

fn is_privileged(status: ChatMemberStatus) -> bool {
    matches!(
        status,
        ChatMemberStatus::Owner | ChatMemberStatus::Administrator
    )
}

#[async_trait]
impl Directory for TelegramDirectory {
    async fn is_member(&self, group: GroupId, user: UserId) -> bool {
        self.status(group, user)
            .await
            .map(is_present)
            .unwrap_or(false)
    }

    async fn is_admin(&self, group: GroupId, user: UserId) -> bool {
        self.status(group, user)
            .await
            .map(is_privileged)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_statuses_include_restricted_members() {
        assert!(is_present(ChatMemberStatus::Owner));
        assert!(is_present(ChatMemberStatus::Administrator));
        assert!(is_present(ChatMemberStatus::Member));
        assert!(is_present(ChatMemberStatus::Restricted));
        assert!(!is_present(ChatMemberStatus::Left));
        assert!(!is_present(ChatMemberStatus::Banned));
    }

    #[test]
    fn only_owner_and_administrator_are_privileged() {
        assert!(is_privileged(ChatMemberStatus::Owner));
        assert!(is_privileged(ChatMemberStatus::Administrator));
        assert!(!is_privileged(ChatMemberStatus::Member));
        assert!(!is_privileged(ChatMemberStatus::Restricted));
        assert!(!is_privileged(ChatMemberStatus::Left));
        assert!(!is_privileged(ChatMemberStatus::Banned));
    }
}
