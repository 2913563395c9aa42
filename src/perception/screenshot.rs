/// Screen capture over adb: screencap to a fixed device path, pull it to a
/// timestamped local file, then delete the device copy.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::device::command::DeviceCommand;
use crate::device::gateway::CommandGateway;
use crate::errors::{AutobuyError, AutobuyResult};
use crate::perception::file_timestamp;

pub struct ScreenCapture {
    gateway: Arc<dyn CommandGateway>,
    local_dir: PathBuf,
    remote_path: String,
}

impl ScreenCapture {
    pub fn new(gateway: Arc<dyn CommandGateway>, local_dir: PathBuf, remote_path: String) -> Self {
        Self {
            gateway,
            local_dir,
            remote_path,
        }
    }

    pub fn local_dir(&self) -> &Path {
        &self.local_dir
    }

    /// Returns the local path of a fresh screenshot. Any failed step fails
    /// the whole capture; retrying is the caller's decision.
    pub async fn capture(&self) -> AutobuyResult<PathBuf> {
        let local = self
            .local_dir
            .join(format!("screenshot_{}.png", file_timestamp()));

        let steps = [
            DeviceCommand::Screencap {
                remote: self.remote_path.clone(),
            },
            DeviceCommand::Pull {
                remote: self.remote_path.clone(),
                local: local.clone(),
            },
            DeviceCommand::Remove {
                remote: self.remote_path.clone(),
            },
        ];

        for step in &steps {
            if let Err(e) = self.gateway.run(step).await {
                tracing::error!(step = %step, error = %e, "screen capture failed");
                return Err(AutobuyError::Capture(format!("{step}: {e}")));
            }
        }

        tracing::debug!(path = %local.display(), "screenshot captured");
        Ok(local)
    }
}

/// Delete everything inside `dir`. Per-entry failures are logged and
/// skipped; a missing directory is not an error. Returns entries removed.
pub fn purge_screenshots(dir: &Path) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(dir = %dir.display(), "screenshot dir missing; nothing to purge");
            return 0;
        }
        Err(e) => {
            let err = AutobuyError::Cleanup(format!("read {}: {e}", dir.display()));
            tracing::error!(error = %err, "screenshot purge skipped");
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) => {
                let err = AutobuyError::Cleanup(format!("remove {}: {e}", path.display()));
                tracing::error!(error = %err, "could not delete screenshot");
            }
        }
    }
    tracing::info!(dir = %dir.display(), removed, "screenshots purged");
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{png_frame, RecordingGateway};

    fn capture_with(gw: Arc<RecordingGateway>, dir: &Path) -> ScreenCapture {
        ScreenCapture::new(gw, dir.to_path_buf(), "/sdcard/autobuy_screen.png".into())
    }

    #[tokio::test]
    async fn capture_runs_three_steps_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let gw = Arc::new(RecordingGateway::new().with_frame(png_frame(8, 8)));
        let path = capture_with(gw.clone(), tmp.path()).capture().await.unwrap();

        assert!(path.starts_with(tmp.path()));
        assert!(path.exists());
        let cmds = gw.commands();
        assert_eq!(cmds.len(), 3);
        assert!(matches!(cmds[0], DeviceCommand::Screencap { .. }));
        assert!(matches!(&cmds[1], DeviceCommand::Pull { local, .. } if *local == path));
        assert!(matches!(cmds[2], DeviceCommand::Remove { .. }));
    }

    #[tokio::test]
    async fn failed_pull_fails_the_capture() {
        let tmp = tempfile::tempdir().unwrap();
        let gw = Arc::new(
            RecordingGateway::new().failing(|c| matches!(c, DeviceCommand::Pull { .. })),
        );
        let err = capture_with(gw.clone(), tmp.path()).capture().await.unwrap_err();

        assert!(matches!(err, AutobuyError::Capture(_)));
        // The remote delete is never attempted after a failed pull.
        assert_eq!(gw.commands().len(), 2);
    }

    #[test]
    fn purge_empties_dir_and_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.png"), b"a").unwrap();
        std::fs::write(tmp.path().join("b.png"), b"b").unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("nested").join("c.png"), b"c").unwrap();

        assert_eq!(purge_screenshots(tmp.path()), 3);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
        assert_eq!(purge_screenshots(tmp.path()), 0);
        assert_eq!(purge_screenshots(&tmp.path().join("missing")), 0);
    }
}
