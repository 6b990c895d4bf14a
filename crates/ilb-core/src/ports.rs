use async_trait::async_trait;

use crate::domain::{ChatId, GroupId, InviteLink, MessageId, UserId};
use crate::Result;

/// Live membership/authorization lookups against the whitelisted group.
///
/// Both checks are fail-closed: a transport failure or non-success API
/// response degrades to `false`, never to an error, so a directory outage
/// can never mint links.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Is the user present in the group (owner, administrator, regular
    /// member or restricted-but-present)?
    async fn is_member(&self, group: GroupId, user: UserId) -> bool;

    /// Is the user the group's owner or an administrator?
    async fn is_admin(&self, group: GroupId, user: UserId) -> bool;
}

/// Key-value mapping from `(group, user)` to the user's active invite link.
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn get(&self, group: GroupId, user: UserId) -> Result<Option<InviteLink>>;

    /// Unconditional write, replacing any existing record.
    async fn put(&self, group: GroupId, user: UserId, link: &InviteLink) -> Result<()>;

    /// Atomic insert-if-absent. Returns the link already on record when the
    /// insert loses, `None` when it wins.
    async fn put_if_absent(
        &self,
        group: GroupId,
        user: UserId,
        link: &InviteLink,
    ) -> Result<Option<InviteLink>>;

    /// Idempotent delete.
    async fn delete(&self, group: GroupId, user: UserId) -> Result<()>;

    /// Every record stored for the group. Backends that paginate do so
    /// internally; callers always see the complete set.
    async fn list_group(&self, group: GroupId) -> Result<Vec<(UserId, InviteLink)>>;
}

/// Invite-link operations against the messaging platform.
#[async_trait]
pub trait InviteGateway: Send + Sync {
    /// Create a non-expiring, unlimited-use invite link for the group,
    /// labeled from the requesting user id for operator traceability.
    async fn create_link(&self, group: GroupId, label_seed: UserId) -> Result<InviteLink>;

    /// Invalidate a previously issued link. Revoking an unknown or
    /// already-revoked link is an upstream error; callers decide whether
    /// that is fatal.
    async fn revoke_link(&self, group: GroupId, link: &InviteLink) -> Result<()>;
}

/// Outbound replies (Telegram HTML).
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_html(&self, chat: ChatId, reply_to: Option<MessageId>, html: &str)
        -> Result<()>;
}
