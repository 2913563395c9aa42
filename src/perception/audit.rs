use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use image::RgbaImage;
use regex::Regex;

use crate::errors::AutobuyResult;
use crate::perception::file_timestamp;

/// Byte cap on the sanitized kind; keeps the whole file name well under the
/// 255-byte limit of common filesystems.
const MAX_KIND_BYTES: usize = 100;

/// Persists annotated frames into the marked-screens directory.
/// Files are only ever added, never rewritten.
pub struct AuditWriter {
    dir: PathBuf,
}

impl AuditWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `frame` as `<timestamp>_<kind>.png`.
    pub fn persist(&self, frame: &RgbaImage, kind: &str) -> AutobuyResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("{}_{}.png", file_timestamp(), sanitize(kind)));
        frame.save_with_format(&path, image::ImageFormat::Png)?;
        tracing::info!(path = %path.display(), "marked frame saved");
        Ok(path)
    }
}

/// Replace characters that are not allowed in file names on common platforms.
fn sanitize(kind: &str) -> String {
    static RESERVED: OnceLock<Regex> = OnceLock::new();
    let re = RESERVED
        .get_or_init(|| Regex::new(r#"[<>:"/\\|?*\s\x00-\x1f]"#).expect("static filename pattern"));
    let mut cleaned = re.replace_all(kind.trim(), "_").into_owned();
    if cleaned.len() > MAX_KIND_BYTES {
        let mut end = MAX_KIND_BYTES;
        while !cleaned.is_char_boundary(end) {
            end -= 1;
        }
        cleaned.truncate(end);
    }
    if cleaned.is_empty() {
        "frame".to_string()
    } else {
        cleaned
    }
}
