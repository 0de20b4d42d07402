//! One-shot messages carried across a redirect in the session.

use actix_session::Session;
use actix_web::{error, Error};
use serde::{Deserialize, Serialize};

const FLASH_SESSION_KEY: &str = "_flashes";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashLevel {
    Ok,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

impl FlashMessage {
    /// Bootstrap alert class for the message.
    pub fn css_class(&self) -> &'static str {
        match self.level {
            FlashLevel::Ok => "alert-success",
            FlashLevel::Error => "alert-danger",
        }
    }
}

/// Queues a message for the next rendered page.
pub fn push(session: &Session, level: FlashLevel, text: impl Into<String>) -> Result<(), Error> {
    let mut queued = session
        .get::<Vec<FlashMessage>>(FLASH_SESSION_KEY)
        .unwrap_or_default()
        .unwrap_or_default();
    queued.push(FlashMessage {
        level,
        text: text.into(),
    });
    session.insert(FLASH_SESSION_KEY, queued).map_err(|e| {
        log::error!("flash::push: session insert failed: {}", e);
        error::ErrorInternalServerError("middleware error")
    })
}

pub fn ok(session: &Session, text: impl Into<String>) -> Result<(), Error> {
    push(session, FlashLevel::Ok, text)
}

pub fn error(session: &Session, text: impl Into<String>) -> Result<(), Error> {
    push(session, FlashLevel::Error, text)
}

/// Removes and returns every queued message.
pub fn take(session: &Session) -> Vec<FlashMessage> {
    match session.remove_as::<Vec<FlashMessage>>(FLASH_SESSION_KEY) {
        Some(Ok(messages)) => messages,
        Some(Err(raw)) => {
            log::warn!("flash::take: discarding unreadable flash data: {}", raw);
            Vec::new()
        }
        None => Vec::new(),
    }
}
