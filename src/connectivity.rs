//! Connectivity state
//!
//! A watch channel carrying the current online flag. The data store subscribes
//! to it and reacts to transitions; something else (a UI shell, the CLI, or
//! the HTTP probe below) drives it.

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Shared online/offline flag
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Update the flag; subscribers are only woken on an actual change
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::info!(online, "Connectivity changed");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Poll `url` every `interval` and mark online when it answers with 2xx
    pub fn spawn_probe(&self, url: String, interval: Duration) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let client = match Client::builder().timeout(interval.max(Duration::from_secs(1))).build() {
                Ok(client) => client,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build connectivity probe client");
                    return;
                }
            };
            let mut ticker = tokio::time::interval(interval);

            loop {
                ticker.tick().await;
                let online = match client.get(&url).send().await {
                    Ok(response) => response.status().is_success(),
                    Err(e) => {
                        tracing::debug!(error = %e, "Connectivity probe failed");
                        false
                    }
                };
                this.set_online(online);
            }
        })
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transitions_notify_subscribers() {
        let connectivity = Connectivity::new(true);
        let mut rx = connectivity.subscribe();

        connectivity.set_online(false);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
        assert!(!connectivity.is_online());
    }

    #[tokio::test]
    async fn test_repeated_value_does_not_notify() {
        let connectivity = Connectivity::new(true);
        let rx = connectivity.subscribe();

        connectivity.set_online(true);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_probe_marks_offline_when_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connectivity = Connectivity::new(true);
        let mut rx = connectivity.subscribe();
        let handle = connectivity.spawn_probe(
            format!("http://{}/health", addr),
            Duration::from_millis(50),
        );

        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(!connectivity.is_online());
        handle.abort();
    }
}
