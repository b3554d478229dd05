use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use vision_llm::encoding::suffix_for;

/// Write an uploaded document to a named temp file under `dir` and hand its path to `f`.
///
/// The file is removed once `f` finishes, whether it succeeded or not. If the future is dropped
/// mid-flight the `NamedTempFile` guard still deletes it.
pub async fn with_temp_upload<F, Fut, T>(
    dir: &Path,
    bytes: &[u8],
    f: F,
) -> vision_llm::Result<T>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = vision_llm::Result<T>>,
{
    let file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&suffix_for(bytes))
        .tempfile_in(dir)?;
    tokio::fs::write(file.path(), bytes).await?;
    debug!(path = %file.path().display(), size = bytes.len(), "Upload stored");

    let result = f(file.path().to_path_buf()).await;

    if let Err(e) = file.close() {
        warn!("Failed to remove temporary upload: {}", e);
    }
    result
}
