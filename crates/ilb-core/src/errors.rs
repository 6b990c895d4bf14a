/// Core error type for the invite-link bot.
///
/// Adapter crates map their specific errors into this type so the router can
/// decide what the user sees versus what only reaches the logs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// The platform answered with a well-formed but unsuccessful response.
    /// Carries the platform's error description verbatim.
    #[error("telegram api rejected the request: {0}")]
    Upstream(String),

    #[error("user is not a member of the whitelisted group")]
    NotMember,

    #[error("caller is not a group administrator")]
    NotAdmin,

    #[error("no invite link on record to regenerate")]
    NoExistingLink,
}

pub type Result<T> = std::result::Result<T, Error>;
