// Test doubles for the device and OCR seams.
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};

use crate::device::command::DeviceCommand;
use crate::device::gateway::CommandGateway;
use crate::errors::{AutobuyError, AutobuyResult};
use crate::perception::traits::TextRecognizer;
use crate::perception::types::{Detection, Point};

pub fn blank_frame(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([20, 20, 20, 255]))
}

pub fn png_frame(w: u32, h: u32) -> Vec<u8> {
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(blank_frame(w, h))
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

/// Records every command. `Pull` writes `frame` to the local path so the
/// capture pipeline sees a real file.
pub struct RecordingGateway {
    commands: Mutex<Vec<DeviceCommand>>,
    frame: Option<Vec<u8>>,
    fail_when: Option<fn(&DeviceCommand) -> bool>,
    failures_left: AtomicUsize,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            frame: None,
            fail_when: None,
            failures_left: AtomicUsize::new(0),
        }
    }

    pub fn with_frame(mut self, png: Vec<u8>) -> Self {
        self.frame = Some(png);
        self
    }

    /// Every matching command fails.
    pub fn failing(self, pred: fn(&DeviceCommand) -> bool) -> Self {
        self.failing_times(pred, usize::MAX)
    }

    /// The first `times` matching commands fail, later ones succeed.
    pub fn failing_times(mut self, pred: fn(&DeviceCommand) -> bool, times: usize) -> Self {
        self.fail_when = Some(pred);
        self.failures_left = AtomicUsize::new(times);
        self
    }

    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn taps(&self) -> Vec<Point> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                DeviceCommand::Tap(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: fn(&DeviceCommand) -> bool) -> usize {
        self.commands().iter().filter(|c| pred(c)).count()
    }

    fn should_fail(&self, command: &DeviceCommand) -> bool {
        let Some(pred) = self.fail_when else {
            return false;
        };
        pred(command)
            && self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
    }
}

#[async_trait]
impl CommandGateway for RecordingGateway {
    async fn run(&self, command: &DeviceCommand) -> AutobuyResult<String> {
        self.commands.lock().unwrap().push(command.clone());
        if self.should_fail(command) {
            return Err(AutobuyError::Command {
                command: command.to_string(),
                code: Some(1),
                stderr: "error: device offline".into(),
            });
        }
        if let (DeviceCommand::Pull { local, .. }, Some(png)) = (command, &self.frame) {
            std::fs::write(local, png)?;
        }
        Ok(String::new())
    }
}

/// Hands out queued detection lists, then `fallback` forever.
pub struct ScriptedRecognizer {
    queue: Mutex<VecDeque<Vec<Detection>>>,
    fallback: Vec<Detection>,
    calls: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self {
            queue: Mutex::new(script.into()),
            fallback: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextRecognizer for ScriptedRecognizer {
    async fn recognize(&self, image_path: &Path) -> AutobuyResult<Vec<Detection>> {
        assert!(image_path.exists(), "recognizer called without a capture");
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.queue.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}
