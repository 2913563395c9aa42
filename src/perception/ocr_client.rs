/// Text recognition served by an external OCR process over HTTP.
///
/// Request:  `{ "image": "<base64 png>", "languages": ["ch_sim"] }`
/// Response: `{ "results": [ { "box": [[x, y] x4], "text": "...", "confidence": 0.93 } ] }`
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;

use crate::config::OcrConfig;
use crate::errors::{AutobuyError, AutobuyResult};
use crate::perception::traits::TextRecognizer;
use crate::perception::types::{Detection, Point};

#[derive(Debug, Deserialize)]
struct OcrResponse {
    results: Vec<OcrItem>,
}

#[derive(Debug, Deserialize)]
struct OcrItem {
    #[serde(rename = "box")]
    bbox: [[f64; 2]; 4],
    text: String,
    confidence: f32,
}

impl From<OcrItem> for Detection {
    fn from(item: OcrItem) -> Self {
        let corner = |[x, y]: [f64; 2]| Point::new(x.round() as i32, y.round() as i32);
        Detection::new(
            item.bbox.map(corner),
            item.text,
            item.confidence.clamp(0.0, 1.0),
        )
    }
}

pub struct HttpOcrClient {
    endpoint: String,
    languages: Vec<String>,
    client: reqwest::Client,
}

impl HttpOcrClient {
    pub fn new(cfg: &OcrConfig) -> AutobuyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            endpoint: cfg.endpoint.clone(),
            languages: cfg.languages.clone(),
            client,
        })
    }

    async fn request(&self, image_path: &Path) -> AutobuyResult<Vec<Detection>> {
        let bytes = tokio::fs::read(image_path).await?;
        let body = serde_json::json!({
            "image": base64::engine::general_purpose::STANDARD.encode(&bytes),
            "languages": &self.languages,
        });

        tracing::debug!(
            endpoint = %self.endpoint,
            image = %image_path.display(),
            bytes = bytes.len(),
            "sending OCR request"
        );

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(AutobuyError::Recognition(format!("{status}: {err_body}")));
        }

        let text = response.text().await?;
        parse_response(&text)
    }
}

fn parse_response(body: &str) -> AutobuyResult<Vec<Detection>> {
    let parsed: OcrResponse = serde_json::from_str(body)?;
    Ok(parsed.results.into_iter().map(Detection::from).collect())
}

#[async_trait]
impl TextRecognizer for HttpOcrClient {
    async fn recognize(&self, image_path: &Path) -> AutobuyResult<Vec<Detection>> {
        let detections = self.request(image_path).await.map_err(|e| match e {
            AutobuyError::Recognition(_) => e,
            other => AutobuyError::Recognition(other.to_string()),
        })?;
        tracing::debug!(count = detections.len(), "text recognized");
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_keeps_engine_order_and_rounds_corners() {
        let body = r#"{
            "results": [
                { "box": [[50.4, 180], [150, 180], [149.6, 220.5], [50, 220]], "text": "进入避难所", "confidence": 0.9 },
                { "box": [[0, 0], [10, 0], [10, 10], [0, 10]], "text": "商店", "confidence": 1.3 }
            ]
        }"#;
        let dets = parse_response(body).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].text, "进入避难所");
        assert_eq!(dets[0].bbox[0], Point::new(50, 180));
        assert_eq!(dets[0].bbox[2], Point::new(150, 221));
        assert_eq!(dets[1].text, "商店");
        assert_eq!(dets[1].confidence, 1.0);
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(parse_response(r#"{"results": [{"text": "x"}]}"#).is_err());
        assert!(parse_response("not json").is_err());
    }

    #[tokio::test]
    async fn unreadable_image_is_a_recognition_error() {
        let client = HttpOcrClient::new(&OcrConfig::default()).unwrap();
        let err = client
            .recognize(Path::new("/nonexistent/screenshot.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, AutobuyError::Recognition(_)));
    }
}
