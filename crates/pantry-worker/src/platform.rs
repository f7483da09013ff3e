//! Host Platform
//!
//! What the worker asks of its host: lifecycle hand-offs, notifications and
//! client windows.

use std::sync::Arc;

use crate::notifications::Notification;

/// Platform errors
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Failed to open window {url}: {reason}")]
    OpenWindow { url: String, reason: String },
}

/// Host environment services used by worker events
#[allow(async_fn_in_trait)]
pub trait Platform {
    /// Activate without waiting for existing clients to close
    async fn skip_waiting(&self) -> Result<(), PlatformError>;

    /// Take control of already open clients
    async fn claim_clients(&self) -> Result<(), PlatformError>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), PlatformError>;

    async fn close_notification(&self, id: u64) -> Result<(), PlatformError>;

    /// Open or focus a client window at `url`
    async fn open_window(&self, url: &str) -> Result<(), PlatformError>;
}

impl<P: Platform + ?Sized> Platform for &P {
    async fn skip_waiting(&self) -> Result<(), PlatformError> {
        (**self).skip_waiting().await
    }

    async fn claim_clients(&self) -> Result<(), PlatformError> {
        (**self).claim_clients().await
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), PlatformError> {
        (**self).show_notification(notification).await
    }

    async fn close_notification(&self, id: u64) -> Result<(), PlatformError> {
        (**self).close_notification(id).await
    }

    async fn open_window(&self, url: &str) -> Result<(), PlatformError> {
        (**self).open_window(url).await
    }
}

impl<P: Platform + ?Sized> Platform for Arc<P> {
    async fn skip_waiting(&self) -> Result<(), PlatformError> {
        (**self).skip_waiting().await
    }

    async fn claim_clients(&self) -> Result<(), PlatformError> {
        (**self).claim_clients().await
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), PlatformError> {
        (**self).show_notification(notification).await
    }

    async fn close_notification(&self, id: u64) -> Result<(), PlatformError> {
        (**self).close_notification(id).await
    }

    async fn open_window(&self, url: &str) -> Result<(), PlatformError> {
        (**self).open_window(url).await
    }
}

/// Terminal host: lifecycle requests are logged, notifications printed
#[derive(Debug, Default)]
pub struct ConsolePlatform;

impl Platform for ConsolePlatform {
    async fn skip_waiting(&self) -> Result<(), PlatformError> {
        tracing::debug!("skip_waiting requested");
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), PlatformError> {
        tracing::debug!("clients.claim requested");
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), PlatformError> {
        let options = &notification.options;
        println!("[notification {}] {}", notification.id, notification.title);
        println!("  body:  {}", options.body);
        if let Some(icon) = &options.icon {
            println!("  icon:  {}", icon);
        }
        if let Some(badge) = &options.badge {
            println!("  badge: {}", badge);
        }
        println!(
            "  dir:   {}  lang: {}",
            options.dir,
            options.lang.as_deref().unwrap_or("-")
        );
        Ok(())
    }

    async fn close_notification(&self, id: u64) -> Result<(), PlatformError> {
        tracing::debug!("Closing notification {}", id);
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), PlatformError> {
        if url.trim().is_empty() {
            return Err(PlatformError::OpenWindow {
                url: url.to_string(),
                reason: "no URL to open".into(),
            });
        }
        println!("open window: {}", url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_rejects_empty_window_url() {
        let err = smol::block_on(ConsolePlatform.open_window("  ")).unwrap_err();
        assert!(matches!(err, PlatformError::OpenWindow { .. }));
        assert!(smol::block_on(ConsolePlatform.open_window("/")).is_ok());
    }
}
