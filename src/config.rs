use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Clinic Desk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address for the HTTP server.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// Default idle lifetime of a login session: 8 hours (one clinic shift).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 8 * 3600;

/// Database file name inside the data directory.
pub const DATABASE_FILE: &str = "clinic.db";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "clinic_desk_lib=info,tower_http=warn"
}

/// Get the application data directory.
/// `CLINIC_DATA_DIR` wins; otherwise ~/ClinicDesk/.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = env_non_empty("CLINIC_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ClinicDesk")
}

/// Path of the clinic database inside the data directory.
pub fn database_path() -> PathBuf {
    app_data_dir().join(DATABASE_FILE)
}

/// Credentials for the first superuser, created when the user table is empty.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub session_ttl_secs: u64,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

impl ServerConfig {
    /// Read configuration from `CLINIC_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_raw =
            env_non_empty("CLINIC_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                key: "CLINIC_BIND_ADDR",
                value: bind_raw.clone(),
            })?;

        let session_ttl_secs = match env_non_empty("CLINIC_SESSION_TTL_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "CLINIC_SESSION_TTL_SECS",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_SESSION_TTL_SECS,
        };

        let bootstrap_admin = match (
            env_non_empty("CLINIC_ADMIN_USERNAME"),
            env_non_empty("CLINIC_ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(BootstrapAdmin {
                email: env_non_empty("CLINIC_ADMIN_EMAIL")
                    .unwrap_or_else(|| format!("{username}@localhost")),
                username,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr,
            database_path: database_path(),
            session_ttl_secs,
            bootstrap_admin,
        })
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_path_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with(DATABASE_FILE));
    }

    #[test]
    fn default_bind_addr_parses() {
        let addr: SocketAddr = DEFAULT_BIND_ADDR.parse().unwrap();
        assert_eq!(addr.port(), 8000);
    }

    #[test]
    fn default_filter_targets_this_crate() {
        assert!(default_log_filter().starts_with("clinic_desk_lib="));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
