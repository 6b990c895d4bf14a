use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{domain::GroupId, errors::Error, Result};

/// Typed configuration, loaded once at startup and injected into each
/// component at construction.
#[derive(Clone, Debug)]
pub struct Config {
    /// Bot API token.
    pub bot_token: String,
    /// Bot username without the leading `@`; used to recognize
    /// `/command@botname` addressing.
    pub bot_username: String,
    /// The single group this bot gates access against.
    pub group_id: GroupId,

    /// Webhook listener address.
    pub bind_addr: SocketAddr,
    /// SQLite file backing the link store.
    pub database_path: PathBuf,
    /// Deadline applied to every outbound Telegram call.
    pub request_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("TELEGRAM_BOT_TOKEN")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?;

        let bot_username = env_str("BOT_USERNAME")
            .and_then(non_empty)
            .map(|s| s.trim().trim_start_matches('@').to_string())
            .ok_or_else(|| {
                Error::Config("BOT_USERNAME environment variable is required".to_string())
            })?;

        let group_id = env_str("WHITELISTED_GROUP_ID")
            .and_then(|s| s.trim().parse::<i64>().ok())
            .map(GroupId)
            .ok_or_else(|| {
                Error::Config(
                    "WHITELISTED_GROUP_ID must be set to the numeric group chat id".to_string(),
                )
            })?;

        let bind_addr = env_str("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("BIND_ADDR is not a valid socket address: {e}")))?;

        let database_path = env_path("DATABASE_PATH").unwrap_or_else(|| PathBuf::from("links.db"));

        let request_timeout =
            Duration::from_millis(env_u64("REQUEST_TIMEOUT_MS").unwrap_or(10_000));

        Ok(Self {
            bot_token,
            bot_username,
            group_id,
            bind_addr,
            database_path,
            request_timeout,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
