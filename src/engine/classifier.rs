/// Classification & action: turn one frame's detections into at most one tap.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;

use crate::device::gateway::CommandGateway;
use crate::device::input;
use crate::engine::rules::{ClassificationRules, Rule};
use crate::engine::state::Verdict;
use crate::errors::{AutobuyError, AutobuyResult};
use crate::perception::annotator::{
    self, CLICK_COLOUR, CLICK_RADIUS, SPECIAL_COLOUR, TARGET_COLOUR, TERMINAL_COLOUR,
};
use crate::perception::audit::AuditWriter;
use crate::perception::types::{Detection, Point};

#[derive(Debug)]
pub struct EngineOutcome {
    pub verdict: Verdict,
    /// Annotated when drawing succeeded, otherwise the frame as captured.
    pub frame: RgbaImage,
    pub matched_text: Option<String>,
    pub audit_path: Option<PathBuf>,
}

pub struct ActionEngine {
    rules: ClassificationRules,
    gateway: Arc<dyn CommandGateway>,
    audit: Arc<AuditWriter>,
    tap_settle: Duration,
}

impl ActionEngine {
    pub fn new(
        rules: ClassificationRules,
        gateway: Arc<dyn CommandGateway>,
        audit: Arc<AuditWriter>,
        tap_settle: Duration,
    ) -> Self {
        Self {
            rules,
            gateway,
            audit,
            tap_settle,
        }
    }

    /// Walk `detections` in recognizer order and act on the first one that
    /// matches a rule. Later detections are ignored even if they match.
    pub async fn process(&self, detections: &[Detection], frame: RgbaImage) -> EngineOutcome {
        for det in detections {
            tracing::debug!(text = %det.text, confidence = det.confidence, "detected text");
            let Some(rule) = self.rules.classify(&det.text) else {
                continue;
            };
            return match rule {
                Rule::Terminal { keyword } => {
                    tracing::info!(text = %det.text, keyword = %keyword, "terminal condition found");
                    let frame = annotate(frame, |c| {
                        annotator::draw_detection(c, det, &annotator::label_for("END", det), TERMINAL_COLOUR)
                    });
                    self.finish(Verdict::Terminal, frame, det, "terminal")
                }
                Rule::Special { keyword, at } => {
                    tracing::info!(text = %det.text, keyword = %keyword, x = at.x, y = at.y, "special click");
                    if let Err(e) = self.tap(at).await {
                        return failed(frame, det, e);
                    }
                    let frame = annotate(frame, |c| {
                        annotator::draw_detection(c, det, &annotator::label_for("FIX", det), SPECIAL_COLOUR)?;
                        annotator::draw_click_point(c, at, CLICK_RADIUS, CLICK_COLOUR);
                        Ok(())
                    });
                    self.finish(Verdict::Acted, frame, det, "special")
                }
                Rule::Target => {
                    let at = det.centroid();
                    tracing::info!(text = %det.text, x = at.x, y = at.y, "target text matched");
                    let frame = annotate(frame, |c| {
                        annotator::draw_detection(c, det, &annotator::label_for("TAP", det), TARGET_COLOUR)
                    });
                    if let Err(e) = self.tap(at).await {
                        return failed(frame, det, e);
                    }
                    let frame = annotate(frame, |c| {
                        annotator::draw_click_point(c, at, CLICK_RADIUS, CLICK_COLOUR);
                        Ok(())
                    });
                    self.finish(Verdict::Acted, frame, det, &format!("found_{}", det.text))
                }
            };
        }

        EngineOutcome {
            verdict: Verdict::NoMatch,
            frame,
            matched_text: None,
            audit_path: None,
        }
    }

    async fn tap(&self, at: Point) -> AutobuyResult<()> {
        input::tap(self.gateway.as_ref(), at).await?;
        tokio::time::sleep(self.tap_settle).await;
        Ok(())
    }

    fn finish(&self, verdict: Verdict, frame: RgbaImage, det: &Detection, kind: &str) -> EngineOutcome {
        let audit_path = match self.audit.persist(&frame, kind) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!(error = %e, kind, "failed to save marked frame");
                None
            }
        };
        EngineOutcome {
            verdict,
            frame,
            matched_text: Some(det.text.clone()),
            audit_path,
        }
    }
}

/// Draw on a copy; keep the original frame if drawing fails.
fn annotate<F>(frame: RgbaImage, draw: F) -> RgbaImage
where
    F: FnOnce(&mut RgbaImage) -> AutobuyResult<()>,
{
    let mut canvas = frame.clone();
    match draw(&mut canvas) {
        Ok(()) => canvas,
        Err(e) => {
            tracing::warn!(error = %e, "annotation failed; keeping unannotated frame");
            frame
        }
    }
}

fn failed(frame: RgbaImage, det: &Detection, err: AutobuyError) -> EngineOutcome {
    tracing::error!(text = %det.text, error = %err, "tap failed");
    EngineOutcome {
        verdict: Verdict::ActionFailed {
            reason: err.to_string(),
        },
        frame,
        matched_text: Some(det.text.clone()),
        audit_path: None,
    }
}
