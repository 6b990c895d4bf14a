use async_trait::async_trait;

use teloxide::payloads::CreateChatInviteLinkSetters;
use teloxide::requests::Requester;
use teloxide::Bot;

use tracing::info;

use ilb_core::domain::{GroupId, InviteLink, UserId};
use ilb_core::ports::InviteGateway;
use ilb_core::Result;

use crate::{map_err, tg_chat};

/// Invite-link management over `createChatInviteLink` /
/// `revokeChatInviteLink`.
#[derive(Clone)]
pub struct TelegramInviteGateway {
    bot: Bot,
}

impl TelegramInviteGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl InviteGateway for TelegramInviteGateway {
    async fn create_link(&self, group: GroupId, label_seed: UserId) -> Result<InviteLink> {
        // No expire_date and no member_limit: the link stays valid forever
        // with unlimited uses. The name ties the link to the requesting user.
        let link = self
            .bot
            .create_chat_invite_link(tg_chat(group.0))
            .name(format!("invite_{}", label_seed.0))
            .creates_join_request(false)
            .await
            .map_err(map_err)?;
        info!(group = group.0, user = label_seed.0, "created invite link");
        Ok(InviteLink(link.invite_link))
    }

    async fn revoke_link(&self, group: GroupId, link: &InviteLink) -> Result<()> {
        self.bot
            .revoke_chat_invite_link(tg_chat(group.0), link.0.clone())
            .await
            .map_err(map_err)?;
        info!(group = group.0, "revoked invite link");
        Ok(())
    }
}
