//! Push, Notification and Background Sync Handlers
//!
//! Placeholders: push shows a localized notification, a click reopens the
//! app, and sync only acknowledges its tag.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::config::WorkerConfig;
use crate::platform::{Platform, PlatformError};

static NOTIFICATION_ID: AtomicU64 = AtomicU64::new(1);

/// Text direction of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Auto,
    Ltr,
    Rtl,
}

impl fmt::Display for TextDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TextDirection::Auto => "auto",
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        })
    }
}

/// Notification options
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationOptions {
    pub body: String,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub dir: TextDirection,
    pub lang: Option<String>,
}

/// A notification instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub options: NotificationOptions,
}

impl Notification {
    pub fn new(title: &str, options: NotificationOptions) -> Self {
        Self {
            id: NOTIFICATION_ID.fetch_add(1, Ordering::SeqCst),
            title: title.to_string(),
            options,
        }
    }
}

/// An incoming push message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushMessage {
    pub data: Option<Vec<u8>>,
}

impl PushMessage {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Some(data.into()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Payload as text, if any
    pub fn text(&self) -> Option<String> {
        self.data
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Result of a background sync event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Tag matched; the (empty) sync work ran to completion
    Completed,
    /// Tag unknown to this worker
    Ignored,
}

/// Build the notification shown for a push message
pub fn push_notification(config: &WorkerConfig, message: &PushMessage) -> Notification {
    let defaults = &config.notification;
    let body = message.text().unwrap_or_else(|| defaults.body.clone());

    Notification::new(
        &defaults.title,
        NotificationOptions {
            body,
            icon: Some(defaults.icon.clone()),
            badge: Some(defaults.badge.clone()),
            dir: defaults.dir,
            lang: Some(defaults.lang.clone()),
        },
    )
}

pub async fn handle_push<P: Platform>(
    config: &WorkerConfig,
    platform: &P,
    message: &PushMessage,
) -> Result<Notification, PlatformError> {
    tracing::info!("Push message received ({} bytes)", message.data.as_ref().map_or(0, Vec::len));

    let notification = push_notification(config, message);
    platform.show_notification(&notification).await?;
    Ok(notification)
}

pub async fn handle_notification_click<P: Platform>(
    config: &WorkerConfig,
    platform: &P,
    notification: &Notification,
) -> Result<(), PlatformError> {
    tracing::info!("Notification {} clicked", notification.id);

    platform.close_notification(notification.id).await?;
    platform.open_window(&config.root_url).await
}

pub async fn handle_sync(config: &WorkerConfig, tag: &str) -> SyncOutcome {
    tracing::info!("Background sync {}", tag);

    if tag != config.sync_tag {
        return SyncOutcome::Ignored;
    }

    // Sync point for offline edits once the app records any
    tracing::info!("Syncing grocery data...");
    SyncOutcome::Completed
}
