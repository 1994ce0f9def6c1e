//! One-shot user messages carried in the cookie session until the next page render.

use actix_session::Session;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

const FLASH_KEY: &str = "_flashes";

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Danger,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

pub fn push(session: &Session, level: Level, message: impl Into<String>) -> Result<(), AppError> {
    let mut flashes = peek(session)?;
    flashes.push(Flash {
        level,
        message: message.into(),
    });
    session
        .insert(FLASH_KEY, flashes)
        .map_err(|e| AppError::SessionError(e.to_string()))
}

/// Returns and clears every pending message.
pub fn take(session: &Session) -> Result<Vec<Flash>, AppError> {
    let flashes = peek(session)?;
    if !flashes.is_empty() {
        session.remove(FLASH_KEY);
    }
    Ok(flashes)
}

fn peek(session: &Session) -> Result<Vec<Flash>, AppError> {
    Ok(session
        .get::<Vec<Flash>>(FLASH_KEY)
        .map_err(|e| AppError::SessionError(e.to_string()))?
        .unwrap_or_default())
}
