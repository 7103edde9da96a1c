//! Post-commit events and their consumers.
//!
//! Side effects that must not fail a committed write (image cleanup) are
//! emitted as events after the commit and handled on a separate task.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::storage::ImageStorage;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Emitted once the row is gone.
    CattleDeleted {
        id: String,
        name: String,
        image_url: Option<String>,
    },
}

/// Sending half of the event channel. Publishing never blocks.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: mpsc::UnboundedSender<StoreEvent>,
}

impl EventBus {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StoreEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn publish(&self, event: StoreEvent) {
        if let Err(e) = self.sender.send(event) {
            warn!("No subscriber for store event {:?}", e.0);
        }
    }
}

/// Stored filename of an image URL: the last path segment, query dropped.
pub fn image_filename(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

/// Handle one event against the image store. Every failure is logged only.
pub async fn clean_up_after<S: ImageStorage>(store: &S, event: StoreEvent) {
    match event {
        StoreEvent::CattleDeleted {
            id,
            image_url: Some(url),
            ..
        } => {
            let Some(filename) = image_filename(&url) else {
                warn!("Cannot derive image filename from {} (cattle {})", url, id);
                return;
            };
            match store.delete_image(filename).await {
                Ok(()) => info!("Removed image {} of deleted cattle {}", filename, id),
                Err(StoreError::NotFound(_)) => {
                    warn!("Image {} of deleted cattle {} was already gone", filename, id)
                }
                Err(e) => warn!("Failed to remove image {} of cattle {}: {}", filename, id, e),
            }
        }
        StoreEvent::CattleDeleted { id, .. } => debug!("Cattle {} had no image", id),
    }
}

/// Consume events until every `EventBus` clone is dropped.
pub fn spawn_image_janitor<S>(store: S, mut events: mpsc::UnboundedReceiver<StoreEvent>) -> JoinHandle<()>
where
    S: ImageStorage + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            clean_up_after(&store, event).await;
        }
        debug!("Image janitor stopped");
    })
}
