//! Server configuration loaded from the environment

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Port to listen on (PORT)
    pub port: u16,
    /// SQLite target (DATABASE_URL). None keeps everything in memory
    pub database_url: Option<String>,
    /// Static file root (STATIC_DIR)
    pub static_dir: PathBuf,
    /// Events buffered per connection before it is considered lagging (BROADCAST_CAPACITY)
    pub broadcast_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match non_empty_var(name) {
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid {}='{}', using default", name, raw);
                default
            }
        },
        None => default,
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let broadcast_capacity = parsed_var("BROADCAST_CAPACITY", DEFAULT_BROADCAST_CAPACITY);

        Self {
            port: parsed_var("PORT", DEFAULT_PORT),
            database_url: non_empty_var("DATABASE_URL"),
            static_dir: non_empty_var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
            // tokio's broadcast channel panics on zero capacity
            broadcast_capacity: broadcast_capacity.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 4] = ["PORT", "DATABASE_URL", "STATIC_DIR", "BROADCAST_CAPACITY"];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear_env();
        assert_eq!(ServerConfig::from_env(), ServerConfig::default());
    }

    #[test]
    #[serial]
    fn test_reads_env() {
        clear_env();
        std::env::set_var("PORT", "8080");
        std::env::set_var("DATABASE_URL", " sqlite://markers.db ");
        std::env::set_var("STATIC_DIR", "web");
        std::env::set_var("BROADCAST_CAPACITY", "16");

        let config = ServerConfig::from_env();
        clear_env();

        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url.as_deref(), Some("sqlite://markers.db"));
        assert_eq!(config.static_dir, PathBuf::from("web"));
        assert_eq!(config.broadcast_capacity, 16);
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        clear_env();
        std::env::set_var("PORT", "not-a-port");
        std::env::set_var("DATABASE_URL", "   ");
        std::env::set_var("BROADCAST_CAPACITY", "0");

        let config = ServerConfig::from_env();
        clear_env();

        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.database_url.is_none());
        assert_eq!(config.broadcast_capacity, 1);
    }
}
