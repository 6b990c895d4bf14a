/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// The whitelisted group's chat id. Kept distinct from [`ChatId`] so a reply
/// destination can never be confused with the gated group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(pub i64);

/// Telegram message id (numeric, per chat).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// Platform-issued invite URL. Opaque: stored, shown and revoked verbatim,
/// never parsed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InviteLink(pub String);

/// Where a message came from. Supergroups and channels count as `Group`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
}

/// Adapter-neutral form of an inbound text message.
#[derive(Clone, Debug)]
pub struct Inbound {
    pub chat: ChatId,
    pub from: UserId,
    pub message_id: MessageId,
    pub chat_kind: ChatKind,
    pub text: String,
}

/// Store key for a `(group, user)` pair: `link:{group_id}:{user_id}`.
pub fn link_key(group: GroupId, user: UserId) -> String {
    format!("link:{}:{}", group.0, user.0)
}

/// Common prefix of every key belonging to a group.
pub fn link_key_prefix(group: GroupId) -> String {
    format!("link:{}:", group.0)
}

/// Recover the user id from a store key. `None` for malformed keys.
pub fn user_from_key(key: &str) -> Option<UserId> {
    key.rsplit(':').next()?.parse().ok().map(UserId)
}
