//! Configuration for the noticeboard backend.

use std::path::PathBuf;

/// Backend configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub vapid_subject: String,
    pub vapid_private_key: String,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, std::env::VarError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse()
            .unwrap_or(3001);
        let database_path = std::env::var("DATABASE_PATH")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map(|s| PathBuf::from(s.trim_start_matches("sqlite:")))
            .unwrap_or_else(|_| PathBuf::from("./data/noticeboard.db"));
        let vapid_private_key =
            std::env::var("VAPID_PRIVATE_KEY").map_err(|_| std::env::VarError::NotPresent)?;
        let vapid_subject = std::env::var("VAPID_SUBJECT")
            .unwrap_or_else(|_| "mailto:admin@localhost".to_string());
        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:3001".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            database_path,
            vapid_subject,
            vapid_private_key,
            cors_origins,
        })
    }

    /// Config for tests: throwaway VAPID material, caller-chosen database.
    pub fn for_test(database_path: PathBuf) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_path,
            vapid_subject: "mailto:test@localhost".to_string(),
            vapid_private_key: "test-vapid-private-key".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}
