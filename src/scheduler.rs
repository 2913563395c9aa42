/// Daily triggers at a fixed minute mark. Each trigger runs every variant in
/// turn, with a pause between them, and never overlaps another trigger.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, Local, TimeZone};

use crate::config::{AppConfig, ScheduleConfig, Variant};
use crate::engine::controller::RunController;
use crate::engine::retry::{run_with_retry, RetryReport};
use crate::errors::{AutobuyError, AutobuyResult};

#[derive(Debug, Clone)]
pub struct Schedule {
    minute: u32,
    hours: Vec<u32>,
}

impl Schedule {
    pub fn from_config(cfg: &ScheduleConfig) -> Self {
        let mut hours = cfg.hours.clone();
        hours.sort_unstable();
        hours.dedup();
        Self {
            minute: cfg.minute,
            hours,
        }
    }

    /// First trigger strictly after `now`. Local times skipped by a DST
    /// jump are passed over. `None` when no hours are configured.
    pub fn next_trigger<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = now.timezone();
        let today = now.date_naive();
        for offset in 0..=1u64 {
            let day = today.checked_add_days(Days::new(offset))?;
            for &hour in &self.hours {
                let Some(naive) = day.and_hms_opt(hour, self.minute, 0) else {
                    continue;
                };
                if let Some(at) = tz.from_local_datetime(&naive).earliest() {
                    if at > *now {
                        return Some(at);
                    }
                }
            }
        }
        None
    }
}

/// Only one session may drive the device at a time.
#[derive(Debug, Clone, Default)]
pub struct SessionLock {
    busy: Arc<AtomicBool>,
}

impl SessionLock {
    pub fn try_acquire(&self) -> Option<SessionGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SessionGuard {
                busy: self.busy.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

pub struct SessionGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

pub struct Scheduler {
    controller: RunController,
    variants: Vec<Variant>,
    schedule: Schedule,
    max_attempts: u32,
    variant_gap: Duration,
    lock: SessionLock,
}

impl Scheduler {
    pub fn new(cfg: &AppConfig, controller: RunController) -> Self {
        Self {
            controller,
            variants: cfg.variants.clone(),
            schedule: Schedule::from_config(&cfg.schedule),
            max_attempts: cfg.retry.max_attempts,
            variant_gap: Duration::from_secs(cfg.schedule.variant_gap_secs),
            lock: SessionLock::default(),
        }
    }

    pub fn lock(&self) -> &SessionLock {
        &self.lock
    }

    /// Run every variant once. Returns `None` if another trigger still
    /// holds the device.
    pub async fn run_trigger(&self) -> Option<Vec<(String, RetryReport)>> {
        let Some(_guard) = self.lock.try_acquire() else {
            tracing::warn!("previous run still in progress; trigger skipped");
            return None;
        };

        let mut reports = Vec::with_capacity(self.variants.len());
        for (i, variant) in self.variants.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.variant_gap).await;
            }
            let report = run_with_retry(&self.controller, variant, self.max_attempts).await;
            match &report.result {
                Ok(exit) => {
                    tracing::info!(variant = %variant.name, attempts = report.attempts, ?exit, "variant done")
                }
                Err(e) => {
                    tracing::error!(variant = %variant.name, attempts = report.attempts, error = %e, "variant abandoned")
                }
            }
            reports.push((variant.name.clone(), report));
        }
        Some(reports)
    }

    /// Wait for each trigger and run it. Only returns on a schedule that
    /// can never fire.
    pub async fn run_forever(&self) -> AutobuyResult<()> {
        loop {
            let now = Local::now();
            let next = self
                .schedule
                .next_trigger(&now)
                .ok_or_else(|| AutobuyError::Config("schedule.hours is empty".into()))?;
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tracing::info!(next = %next.format("%Y-%m-%d %H:%M:%S"), wait_secs = wait.as_secs(), "waiting for next trigger");
            tokio::time::sleep(wait).await;
            self.run_trigger().await;
        }
    }
}
