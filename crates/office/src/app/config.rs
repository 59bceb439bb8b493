use std::time::Duration;

use tracing::warn;

pub(crate) const SERVER_ADDR_ENV_VAR: &str = "OFFICE_SERVER_ADDR";
pub(crate) const ROOM_ID_ENV_VAR: &str = "OFFICE_ROOM_ID";
pub(crate) const RENDER_SCALE_ENV_VAR: &str = "OFFICE_RENDER_SCALE";
pub(crate) const CALL_TIMEOUT_ENV_VAR: &str = "OFFICE_CALL_TIMEOUT_SECS";
pub(crate) const LEVEL_ENV_VAR: &str = "OFFICE_LEVEL";

const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_RENDER_SCALE: f32 = 1.0;
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LEVEL: &str = "level1";
const MAX_RENDER_SCALE: f32 = 8.0;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClientConfig {
    pub(crate) server_addr: String,
    /// Explicit room request; `None` falls back to the persisted room.
    pub(crate) room_id: Option<String>,
    pub(crate) render_scale: f32,
    pub(crate) call_timeout: Duration,
    pub(crate) level: String,
    pub(crate) connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            room_id: None,
            render_scale: DEFAULT_RENDER_SCALE,
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            level: DEFAULT_LEVEL.to_string(),
            connect_timeout: Duration::from_secs(3),
        }
    }
}

impl ClientConfig {
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from `lookup`. Invalid values are logged and replaced
    /// with defaults; nothing here fails startup.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let render_scale = match non_empty(RENDER_SCALE_ENV_VAR) {
            Some(value) => match value.parse::<f32>() {
                Ok(scale) if scale.is_finite() && scale > 0.0 && scale <= MAX_RENDER_SCALE => scale,
                _ => {
                    warn!(
                        value = value.as_str(),
                        fallback = DEFAULT_RENDER_SCALE,
                        "config_invalid_render_scale_using_default"
                    );
                    DEFAULT_RENDER_SCALE
                }
            },
            None => DEFAULT_RENDER_SCALE,
        };

        let call_timeout = match non_empty(CALL_TIMEOUT_ENV_VAR) {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!(
                        value = value.as_str(),
                        fallback = DEFAULT_CALL_TIMEOUT_SECS,
                        "config_invalid_call_timeout_using_default"
                    );
                    defaults.call_timeout
                }
            },
            None => defaults.call_timeout,
        };

        Self {
            server_addr: non_empty(SERVER_ADDR_ENV_VAR).unwrap_or(defaults.server_addr),
            room_id: non_empty(ROOM_ID_ENV_VAR),
            render_scale,
            call_timeout,
            level: non_empty(LEVEL_ENV_VAR).unwrap_or(defaults.level),
            connect_timeout: defaults.connect_timeout,
        }
    }
}
