use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{AutobuyError, AutobuyResult};

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV: &str = "AUTOBUY_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default = "default_variants")]
    pub variants: Vec<Variant>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            paths: PathsConfig::default(),
            logging: LoggingConfig::default(),
            ocr: OcrConfig::default(),
            rules: RulesConfig::default(),
            run: RunConfig::default(),
            retry: RetryConfig::default(),
            schedule: ScheduleConfig::default(),
            variants: default_variants(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Path or name of the adb executable.
    pub adb_path: String,
    /// Target device serial; passed as `-s <serial>` when set.
    pub serial: Option<String>,
    pub command_timeout_secs: u64,
    /// Fixed device-side path the screenshot is written to before the pull.
    pub remote_screenshot: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            adb_path: "adb".into(),
            serial: None,
            command_timeout_secs: 30,
            remote_screenshot: "/sdcard/autobuy_screen.png".into(),
        }
    }
}

impl DeviceConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Transient captures, purged after every session.
    pub screenshots_dir: PathBuf,
    /// Append-only audit trail of annotated frames.
    pub marked_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let base = out_files_dir();
        Self {
            screenshots_dir: base.join("screenshots"),
            marked_dir: base.join("marked_screens"),
            log_dir: base.join("logs"),
        }
    }
}

/// `<local data dir>/autobuy/out_files`, or `./out_files` when the platform
/// has no data dir.
fn out_files_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("autobuy"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("out_files")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    pub level: String,
    pub max_bytes: u64,
    pub backups: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            max_bytes: 10 * 1024 * 1024,
            backups: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub endpoint: String,
    pub languages: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8866/ocr".into(),
            languages: vec!["ch_sim".into()],
            timeout_secs: 60,
        }
    }
}

/// A recognized keyword that is tapped at a fixed screen position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialClick {
    pub keyword: String,
    pub x: i32,
    pub y: i32,
}

impl SpecialClick {
    pub fn new(keyword: &str, x: i32, y: i32) -> Self {
        Self {
            keyword: keyword.to_string(),
            x,
            y,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Substrings that end the run ("limit reached", "out of stock").
    pub terminal: Vec<String>,
    /// Checked in order; the first keyword contained in the text wins.
    pub special_clicks: Vec<SpecialClick>,
    /// Substrings that trigger a centroid tap.
    pub targets: Vec<String>,
    /// Whole texts that trigger a centroid tap.
    pub exact_targets: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        let close = |k: &str| SpecialClick::new(k, 1815, 63);
        Self {
            terminal: vec![
                "已达到购买上限".into(),
                "商品库存不足".into(),
                "库存: 0".into(),
            ],
            special_clicks: vec![
                close("前往"),
                close("收藏图鉴"),
                close("神秘罗盘"),
                close("常规活动"),
                close("推荐商城"),
                close("尊享会员"),
                close("获奖记录"),
                close("自动整理"),
                close("一键领取"),
            ],
            targets: vec![
                "进入避难所".into(),
                "我知道了".into(),
                "购物".into(),
                "760,".into(),
            ],
            exact_targets: vec!["登录".into(), "商店".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub max_loops: u32,
    /// Wait after launching the app before the first capture.
    pub launch_settle_secs: u64,
    /// Pacing delay after every loop iteration.
    pub loop_interval_secs: u64,
    /// Wait after every tap so the UI can react.
    pub tap_settle_secs: u64,
    pub stop_settle_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_loops: 30,
            launch_settle_secs: 13,
            loop_interval_secs: 1,
            tap_settle_secs: 2,
            stop_settle_secs: 3,
        }
    }
}

impl RunConfig {
    pub fn launch_settle(&self) -> Duration {
        Duration::from_secs(self.launch_settle_secs)
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_secs(self.loop_interval_secs)
    }

    pub fn tap_settle(&self) -> Duration {
        Duration::from_secs(self.tap_settle_secs)
    }

    pub fn stop_settle(&self) -> Duration {
        Duration::from_secs(self.stop_settle_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Minute mark within each scheduled hour.
    pub minute: u32,
    pub hours: Vec<u32>,
    /// Pause between consecutive variants inside one trigger.
    pub variant_gap_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            minute: 58,
            hours: (0..20).collect(),
            variant_gap_secs: 5,
        }
    }
}

/// Identity of one installed build of the game plus its own tap rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub package: String,
    pub activity: String,
    /// Appended after the shared special clicks.
    #[serde(default)]
    pub special_clicks: Vec<SpecialClick>,
}

fn default_variants() -> Vec<Variant> {
    let activity = "com.netease.game.MessiahNativeActivity".to_string();
    vec![
        Variant {
            name: "official".into(),
            package: "com.netease.yhtj".into(),
            activity: activity.clone(),
            special_clicks: vec![SpecialClick::new("尊敬的萤火虫特遣队员们", 1576, 204)],
        },
        Variant {
            name: "huawei".into(),
            package: "com.netease.yhtj.huawei".into(),
            activity,
            special_clicks: Vec::new(),
        },
    ]
}

impl AppConfig {
    pub fn validate(&self) -> AutobuyResult<()> {
        if self.run.max_loops == 0 {
            return Err(AutobuyError::Config("run.max_loops must be at least 1".into()));
        }
        if self.device.command_timeout_secs == 0 {
            return Err(AutobuyError::Config(
                "device.command_timeout_secs must be at least 1".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(AutobuyError::Config(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.schedule.minute >= 60 {
            return Err(AutobuyError::Config(format!(
                "schedule.minute out of range: {}",
                self.schedule.minute
            )));
        }
        if let Some(h) = self.schedule.hours.iter().find(|h| **h >= 24) {
            return Err(AutobuyError::Config(format!("schedule.hours out of range: {h}")));
        }
        if self.variants.is_empty() {
            return Err(AutobuyError::Config("at least one [[variants]] entry is required".into()));
        }
        if let Some(v) = self.variants.iter().find(|v| v.package.trim().is_empty()) {
            return Err(AutobuyError::Config(format!(
                "variant '{}' has an empty package name",
                v.name
            )));
        }
        Ok(())
    }
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var(CONFIG_ENV) {
        tracing::debug!(path = %explicit, var = CONFIG_ENV, "config path taken from environment");
        return Some(PathBuf::from(explicit));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Some(candidate);
            }
        }
    }

    let candidate = std::env::current_dir().ok()?.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Some(candidate);
    }
    None
}

pub fn parse_config(content: &str) -> AutobuyResult<AppConfig> {
    let config: AppConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load `config.toml`, falling back to built-in defaults when no file exists.
pub fn load_config() -> AutobuyResult<AppConfig> {
    let Some(path) = resolve_config_path() else {
        tracing::warn!("config.toml not found next to executable or in working directory; using defaults");
        return Ok(AppConfig::default());
    };
    let content = std::fs::read_to_string(&path)?;
    let config = parse_config(&content)?;
    tracing::info!(
        path = %path.display(),
        variants = config.variants.len(),
        "config loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_shipped_rules() {
        let cfg = AppConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.run.max_loops, 30);
        assert_eq!(cfg.retry.max_attempts, 2);
        assert_eq!(cfg.schedule.hours.len(), 20);
        assert_eq!(cfg.variants.len(), 2);
        assert!(cfg.rules.terminal.iter().any(|t| t == "已达到购买上限"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = parse_config(
            r#"
            [device]
            serial = "emulator-5554"

            [run]
            max_loops = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.device.serial.as_deref(), Some("emulator-5554"));
        assert_eq!(cfg.device.adb_path, "adb");
        assert_eq!(cfg.run.max_loops, 5);
        assert_eq!(cfg.run.tap_settle_secs, 2);
        assert_eq!(cfg.variants[0].package, "com.netease.yhtj");
    }

    #[test]
    fn variants_and_special_clicks_parse() {
        let cfg = parse_config(
            r#"
            [[variants]]
            name = "test"
            package = "com.example.game"
            activity = "com.example.Main"
            special_clicks = [{ keyword = "关闭", x = 10, y = 20 }]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.variants.len(), 1);
        assert_eq!(cfg.variants[0].special_clicks[0], SpecialClick::new("关闭", 10, 20));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            parse_config("[run]\nmax_loops = 0"),
            Err(AutobuyError::Config(_))
        ));
        assert!(matches!(
            parse_config("[device]\ncommand_timeout_secs = 0"),
            Err(AutobuyError::Config(_))
        ));
        assert!(matches!(
            parse_config("[schedule]\nminute = 75"),
            Err(AutobuyError::Config(_))
        ));
        assert!(matches!(
            parse_config("[schedule]\nhours = [3, 24]"),
            Err(AutobuyError::Config(_))
        ));
        assert!(matches!(
            parse_config("variants = []"),
            Err(AutobuyError::Config(_))
        ));
        assert!(matches!(parse_config("[run\n"), Err(AutobuyError::TomlDe(_))));
    }
}
