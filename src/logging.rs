/// Tracing setup: human-readable stdout plus a daily log file that is
/// rotated once it grows past a size cap.
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{Local, NaiveDate};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::errors::AutobuyResult;

/// Install the global subscriber. `RUST_LOG` wins over `cfg.level`.
pub fn init(cfg: &LoggingConfig, log_dir: &Path) -> AutobuyResult<()> {
    let file = RollingFile::open(log_dir, cfg.max_bytes, cfg.backups)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_names(true)
                .with_ansi(false)
                .with_writer(file),
        )
        .init();
    Ok(())
}

struct FileState {
    date: NaiveDate,
    file: File,
    written: u64,
}

/// `<dir>/<YYYY-MM-DD>.log`, switched at local midnight and shifted to
/// `.log.1 .. .log.N` whenever the next write would exceed `max_bytes`.
pub struct RollingFile {
    dir: PathBuf,
    max_bytes: u64,
    backups: usize,
    state: Mutex<FileState>,
}

impl RollingFile {
    pub fn open(dir: &Path, max_bytes: u64, backups: usize) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let date = Local::now().date_naive();
        let (file, written) = open_append(&log_path(dir, date))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            max_bytes,
            backups,
            state: Mutex::new(FileState {
                date,
                file,
                written,
            }),
        })
    }

    fn write_at(&self, today: NaiveDate, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        if state.date != today {
            let (file, written) = open_append(&log_path(&self.dir, today))?;
            *state = FileState {
                date: today,
                file,
                written,
            };
        }
        if state.written > 0 && state.written + buf.len() as u64 > self.max_bytes {
            self.rotate(&mut state)?;
        }
        state.file.write_all(buf)?;
        state.written += buf.len() as u64;
        Ok(buf.len())
    }

    fn rotate(&self, state: &mut FileState) -> io::Result<()> {
        state.file.flush()?;
        let current = log_path(&self.dir, state.date);
        if self.backups == 0 {
            std::fs::remove_file(&current)?;
        } else {
            let backup = |n: usize| PathBuf::from(format!("{}.{n}", current.display()));
            let oldest = backup(self.backups);
            if oldest.exists() {
                std::fs::remove_file(&oldest)?;
            }
            for n in (1..self.backups).rev() {
                let from = backup(n);
                if from.exists() {
                    std::fs::rename(&from, backup(n + 1))?;
                }
            }
            std::fs::rename(&current, backup(1))?;
        }
        let (file, written) = open_append(&current)?;
        state.file = file;
        state.written = written;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, FileState> {
        // A panic mid-write leaves the state usable; keep logging.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn log_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.log", date.format("%Y-%m-%d")))
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let len = file.metadata()?.len();
    Ok((file, len))
}

pub struct RollingWriter<'a> {
    target: &'a RollingFile,
}

impl Write for RollingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.target.write_at(Local::now().date_naive(), buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.target.lock().file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingFile {
    type Writer = RollingWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RollingWriter { target: self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn rotates_when_size_cap_is_hit() {
        let tmp = tempfile::tempdir().unwrap();
        let rf = RollingFile::open(tmp.path(), 16, 2).unwrap();
        let today = rf.lock().date;
        let current = log_path(tmp.path(), today);

        rf.write_at(today, b"0123456789\n").unwrap();
        rf.write_at(today, b"abcdefghij\n").unwrap();
        rf.write_at(today, b"ABCDEFGHIJ\n").unwrap();
        rf.write_at(today, b"klmnopqrst\n").unwrap();

        let backup1 = PathBuf::from(format!("{}.1", current.display()));
        let backup2 = PathBuf::from(format!("{}.2", current.display()));
        let backup3 = PathBuf::from(format!("{}.3", current.display()));
        assert_eq!(std::fs::read_to_string(&current).unwrap(), "klmnopqrst\n");
        assert_eq!(std::fs::read_to_string(&backup1).unwrap(), "ABCDEFGHIJ\n");
        assert_eq!(std::fs::read_to_string(&backup2).unwrap(), "abcdefghij\n");
        assert!(!backup3.exists());
    }

    #[test]
    fn date_change_opens_a_new_file() {
        let tmp = tempfile::tempdir().unwrap();
        let rf = RollingFile::open(tmp.path(), 1024, 5).unwrap();

        rf.write_at(day(1), b"first\n").unwrap();
        rf.write_at(day(2), b"second\n").unwrap();

        assert_eq!(
            std::fs::read_to_string(log_path(tmp.path(), day(1))).unwrap(),
            "first\n"
        );
        assert_eq!(
            std::fs::read_to_string(log_path(tmp.path(), day(2))).unwrap(),
            "second\n"
        );
    }
}
