use std::env;

use actix_web::cookie::Key;

use crate::errors::AppError;

const DEFAULT_ADMIN_PASSWORD: &str = "adminpass";

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub session_key: Key,
    pub cookie_secure: bool,
    pub admin_email: String,
    pub admin_password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let session_key = env::var("SESSION_KEY").map_err(|e| {
            log::error!("FATAL: SESSION_KEY environment variable not set");
            AppError::EnvVarError(e)
        })?;
        // Key::from panics on short input.
        if session_key.len() < 64 {
            return Err(AppError::ConfigError(
                "SESSION_KEY must be at least 64 bytes long".into(),
            ));
        }

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| AppError::ConfigError("PORT must be a number".into()))?;

        let cookie_secure = match env::var("COOKIE_SECURE") {
            Ok(value) => parse_flag(&value)
                .ok_or_else(|| AppError::ConfigError("COOKIE_SECURE must be true or false".into()))?,
            Err(_) => true,
        };

        let admin_password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| {
            log::warn!("ADMIN_PASSWORD not set, seeding the admin account with the default password");
            DEFAULT_ADMIN_PASSWORD.to_string()
        });

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://inventory.db".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            session_key: Key::from(session_key.as_bytes()),
            cookie_secure,
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@example.com".to_string()),
            admin_password,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
