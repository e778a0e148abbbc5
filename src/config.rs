use std::{
    env,
    fmt::Display,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};

use tracing::{info, warn};

use crate::auth::AdminCredentials;

pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub frontend_url: String,
    pub admin: AdminCredentials,
}

impl Config {
    pub fn load() -> Result<Self, String> {
        let username = try_load::<String>("ADMIN_USERNAME", "admin")?;

        let admin = match var("ADMIN_PASSWORD_SHA256") {
            Ok(digest) => AdminCredentials::from_hashed(&username, &digest)?,
            Err(_) => {
                let password = var("ADMIN_PASSWORD").unwrap_or_else(|_| {
                    warn!("ADMIN_PASSWORD not set, using the development default");
                    "admin123".to_string()
                });
                AdminCredentials::new(&username, &password)
            }
        };

        Ok(Self {
            port: try_load("PORT", "5000")?,
            database_path: try_load("DATABASE_PATH", "anytime_stop.db")?,
            frontend_url: try_load("FRONTEND_URL", DEFAULT_FRONTEND_URL)?,
            admin,
        })
    }

    /// Origins allowed to call the API from a browser.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec![self.frontend_url.clone()];
        if self.frontend_url != DEFAULT_FRONTEND_URL {
            origins.push(DEFAULT_FRONTEND_URL.to_string());
        }
        origins
    }
}

/// Loads `.env` from the working directory or one of its parents into the
/// process environment. Variables that are already set win. A missing file is
/// not an error.
pub fn load_env_file() -> Result<Option<PathBuf>, String> {
    env_file_result(dotenv::dotenv())
}

pub fn load_env_file_from(path: &Path) -> Result<Option<PathBuf>, String> {
    env_file_result(dotenv::from_path(path).map(|()| path.to_path_buf()))
}

fn env_file_result(result: dotenv::Result<PathBuf>) -> Result<Option<PathBuf>, String> {
    match result {
        Ok(path) => Ok(Some(path)),
        Err(dotenv::Error::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(format!("Failed to load .env: {e}")),
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| ())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, String>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            format!("Environment misconfigured: {key}: {e}")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_env_file_sets_missing_variables() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ANYTIME_STOP_ENV_FILE_TEST=from-file").unwrap();
        writeln!(file, "ANYTIME_STOP_ENV_FILE_PRESET=from-file").unwrap();
        env::set_var("ANYTIME_STOP_ENV_FILE_PRESET", "from-process");

        let loaded = load_env_file_from(file.path()).unwrap();

        assert_eq!(loaded.as_deref(), Some(file.path()));
        assert_eq!(env::var("ANYTIME_STOP_ENV_FILE_TEST").unwrap(), "from-file");
        assert_eq!(
            env::var("ANYTIME_STOP_ENV_FILE_PRESET").unwrap(),
            "from-process"
        );
    }

    #[test]
    fn test_missing_env_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_env_file_from(&dir.path().join(".env")).unwrap();
        assert!(loaded.is_none());
    }
}
