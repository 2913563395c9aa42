use std::path::Path;

use async_trait::async_trait;

use crate::errors::AutobuyResult;
use crate::perception::types::Detection;

/// Black-box text recognition over a captured frame.
/// Detections come back in engine order and are never re-sorted.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image_path: &Path) -> AutobuyResult<Vec<Detection>>;
}
