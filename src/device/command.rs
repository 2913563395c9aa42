use std::fmt;
use std::path::PathBuf;

use crate::perception::types::Point;

/// Every operation the automation issues against the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    Screencap { remote: String },
    Pull { remote: String, local: PathBuf },
    Remove { remote: String },
    StartActivity { package: String, activity: String },
    ForceStop { package: String },
    Tap(Point),
}

impl DeviceCommand {
    /// Arguments passed to adb after the optional `-s <serial>`.
    pub fn args(&self) -> Vec<String> {
        let shell = |parts: &[&str]| -> Vec<String> {
            std::iter::once("shell")
                .chain(parts.iter().copied())
                .map(str::to_string)
                .collect()
        };
        match self {
            DeviceCommand::Screencap { remote } => shell(&["screencap", "-p", remote.as_str()]),
            DeviceCommand::Pull { remote, local } => vec![
                "pull".to_string(),
                remote.clone(),
                local.to_string_lossy().into_owned(),
            ],
            DeviceCommand::Remove { remote } => shell(&["rm", "-f", remote.as_str()]),
            DeviceCommand::StartActivity { package, activity } => {
                shell(&["am", "start", "-n", format!("{package}/{activity}").as_str()])
            }
            DeviceCommand::ForceStop { package } => shell(&["am", "force-stop", package.as_str()]),
            DeviceCommand::Tap(p) => shell(&["input", "tap", p.x.to_string().as_str(), p.y.to_string().as_str()]),
        }
    }

    pub fn is_tap(&self) -> bool {
        matches!(self, DeviceCommand::Tap(_))
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_adb_arguments() {
        let start = DeviceCommand::StartActivity {
            package: "com.netease.yhtj".into(),
            activity: "com.netease.game.MessiahNativeActivity".into(),
        };
        assert_eq!(
            start.to_string(),
            "shell am start -n com.netease.yhtj/com.netease.game.MessiahNativeActivity"
        );
        assert_eq!(
            DeviceCommand::Tap(Point::new(1815, 63)).to_string(),
            "shell input tap 1815 63"
        );
        assert_eq!(
            DeviceCommand::ForceStop { package: "com.netease.yhtj".into() }.args(),
            vec!["shell", "am", "force-stop", "com.netease.yhtj"]
        );
    }

    #[test]
    fn pull_keeps_local_path_as_one_argument() {
        let cmd = DeviceCommand::Pull {
            remote: "/sdcard/s.png".into(),
            local: PathBuf::from("/tmp/out files/s.png"),
        };
        let args = cmd.args();
        assert_eq!(args.len(), 3);
        assert_eq!(args[2], "/tmp/out files/s.png");
        assert!(!cmd.is_tap());
    }
}
