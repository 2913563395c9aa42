pub mod annotator;
pub mod audit;
pub mod ocr_client;
pub mod screenshot;
pub mod traits;
pub mod types;

/// Local-time stamp used in screenshot and audit file names.
pub fn file_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d_%H-%M-%S_%3f").to_string()
}
