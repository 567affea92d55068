//! At-most-once dataset upload per conversation.

use std::sync::Arc;
use std::time::Instant;

use ot_client::csv::encode_csv;
use ot_client::DatasetUploader;
use ot_domain::error::Error;
use ot_domain::trace::TraceEvent;
use ot_domain::{Dataset, DatasetHandle};

use crate::store::ConversationSession;

/// What [`SessionAssetManager::ensure_asset`] did.
#[derive(Debug)]
pub enum AssetOutcome {
    /// The session already had a handle; nothing was sent.
    Reused(DatasetHandle),
    Uploaded(DatasetHandle),
    /// No dataset and no handle.
    Skipped,
    /// Upload attempted and failed.  The turn continues without a dataset.
    Failed(Error),
}

impl AssetOutcome {
    pub fn handle(&self) -> Option<&DatasetHandle> {
        match self {
            AssetOutcome::Reused(h) | AssetOutcome::Uploaded(h) => Some(h),
            AssetOutcome::Skipped | AssetOutcome::Failed(_) => None,
        }
    }
}

pub struct SessionAssetManager {
    uploader: Arc<dyn DatasetUploader>,
}

impl SessionAssetManager {
    pub fn new(uploader: Arc<dyn DatasetUploader>) -> Self {
        Self { uploader }
    }

    /// Make sure the session has a dataset handle if it can have one.
    ///
    /// The session's dataset slot stays locked for the whole upload, so
    /// concurrent callers wait and then reuse the stored handle.  A
    /// failed upload stores nothing; the next turn tries again.
    pub async fn ensure_asset(
        &self,
        session: &ConversationSession,
        dataset: Option<&Dataset>,
    ) -> AssetOutcome {
        let mut slot = session.dataset.lock().await;

        if let Some(handle) = slot.as_ref() {
            TraceEvent::AssetReused {
                conversation: session.id().to_string(),
                path: handle.path.clone(),
            }
            .emit();
            return AssetOutcome::Reused(handle.clone());
        }

        let Some(dataset) = dataset.filter(|d| !d.is_empty()) else {
            return AssetOutcome::Skipped;
        };

        let csv = encode_csv(dataset);
        let bytes = csv.len();
        let started = Instant::now();
        match self.uploader.upload(session.id(), csv).await {
            Ok(handle) => {
                TraceEvent::AssetUploaded {
                    conversation: session.id().to_string(),
                    path: handle.path.clone(),
                    bytes,
                    duration_ms: started.elapsed().as_millis() as u64,
                }
                .emit();
                *slot = Some(handle.clone());
                AssetOutcome::Uploaded(handle)
            }
            Err(e) => {
                tracing::warn!(
                    conversation = %session.id(),
                    rows = dataset.row_count(),
                    error = %e,
                    "dataset upload failed, continuing without dataset"
                );
                AssetOutcome::Failed(e)
            }
        }
    }
}
