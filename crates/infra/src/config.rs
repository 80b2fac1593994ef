//! Runtime configuration for the warehouse service.

use core::fmt::Display;
use core::str::FromStr;

use forgewms_tasks::TaskPolicy;

pub const DEFAULT_TASK_PRIORITY_VAR: &str = "FORGEWMS_DEFAULT_TASK_PRIORITY";
pub const OVERFLOW_FALLBACK_VAR: &str = "FORGEWMS_OVERFLOW_FALLBACK";
pub const PUBLISH_EVENTS_VAR: &str = "FORGEWMS_PUBLISH_EVENTS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarehouseConfig {
    /// Priority stamped on tasks the service creates.
    pub default_task_priority: i32,
    /// Whether putaway may fall back to overflow locations.
    pub overflow_fallback: bool,
    /// Whether committed events are published to the bus.
    pub publish_events: bool,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            default_task_priority: 5,
            overflow_fallback: true,
            publish_events: true,
        }
    }
}

impl WarehouseConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source. Missing keys take
    /// the default; unparsable values are logged and take the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            default_task_priority: setting(
                &lookup,
                DEFAULT_TASK_PRIORITY_VAR,
                defaults.default_task_priority,
            ),
            overflow_fallback: flag(&lookup, OVERFLOW_FALLBACK_VAR, defaults.overflow_fallback),
            publish_events: flag(&lookup, PUBLISH_EVENTS_VAR, defaults.publish_events),
        }
    }

    pub fn task_policy(&self) -> TaskPolicy {
        TaskPolicy {
            default_priority: self.default_task_priority,
            allow_overflow: self.overflow_fallback,
        }
    }
}

fn setting<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "invalid setting; using default");
            default
        }),
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match lookup(key).map(|raw| raw.trim().to_ascii_lowercase()) {
        None => default,
        Some(raw) => match raw.as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                tracing::warn!(key, value = %raw, default, "invalid flag; using default");
                default
            }
        },
    }
}
