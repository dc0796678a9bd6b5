/// Detection record parsing
///
/// Inference records arrive as JSON whose `inference_results` field is itself a
/// Python `str(dict)` dump: single-quoted strings and bare `None`/`True`/`False`.
/// This module turns such a record into a detection list and the patient
/// metadata shown next to the slide.
use std::collections::HashMap;
use std::path::Path;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[allow(unused_imports)]
use log::{debug, info, warn, error};

// Quoted strings are matched first so literals inside labels are left alone
static PYTHON_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|([:\[,]\s*)(None|True|False)\b"#).expect("static regex")
});

/// Upstream inference record as stored by the job queue
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InferenceRecord {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub wsi_video_url: String,
    pub inference_results: String,
    #[serde(default)]
    pub celery_status: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub sample_type: String,
    #[serde(default)]
    pub date: String,
}

impl InferenceRecord {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read inference record {}: {}", path.display(), e))?;

        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, String> {
        serde_json::from_str(content)
            .map_err(|e| format!("Failed to parse inference record JSON: {}", e))
    }
}

#[derive(Debug, Deserialize)]
struct InferencePayload {
    #[serde(rename = "executionTime", default)]
    execution_time: Option<f64>,
    output: InferenceOutput,
}

#[derive(Debug, Deserialize)]
struct InferenceOutput {
    detection_results: Vec<(f64, f64, f64, f64, String)>,
}

/// A labelled box in full-resolution image pixel coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub label: String,
}

impl Detection {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, label: impl Into<String>) -> Self {
        Self { x1, y1, x2, y2, label: label.into() }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

impl From<(f64, f64, f64, f64, String)> for Detection {
    fn from((x1, y1, x2, y2, label): (f64, f64, f64, f64, String)) -> Self {
        Self { x1, y1, x2, y2, label }
    }
}

/// Detection list plus the patient metadata carried by the record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDetectionResults {
    pub detections: Vec<Detection>,
    pub patient_id: String,
    pub sample_type: String,
    pub date: String,
    pub filename: String,
}

/// Rewrite a Python dict dump into JSON text.
///
/// Every single quote becomes a double quote, so labels containing an
/// apostrophe do not survive. `None`/`True`/`False` are rewritten only
/// outside string literals.
pub fn normalize_python_literal(raw: &str) -> String {
    let quoted = raw.replace('\'', "\"");
    PYTHON_LITERAL
        .replace_all(&quoted, |caps: &regex::Captures| {
            let Some(prefix) = caps.get(1) else {
                return caps[0].to_string();
            };
            let literal = match &caps[2] {
                "None" => "null",
                "True" => "true",
                _ => "false",
            };
            format!("{}{}", prefix.as_str(), literal)
        })
        .into_owned()
}

fn parse_payload(raw: &str) -> Result<Vec<Detection>, String> {
    let normalized = normalize_python_literal(raw);
    let payload: InferencePayload = serde_json::from_str(&normalized)
        .map_err(|e| format!("Failed to parse inference payload: {}", e))?;

    if let Some(ms) = payload.execution_time {
        debug!("Inference payload execution time: {}ms", ms);
    }

    Ok(payload
        .output
        .detection_results
        .into_iter()
        .map(Detection::from)
        .collect())
}

/// Parse the detections out of an inference record.
///
/// Never fails: a malformed payload is logged and yields the empty result.
pub fn parse_detection_results(record: &InferenceRecord) -> ParsedDetectionResults {
    match parse_payload(&record.inference_results) {
        Ok(detections) => {
            info!(
                "Parsed {} detections for patient {} ({})",
                detections.len(),
                record.patient_id,
                record.filename
            );
            ParsedDetectionResults {
                detections,
                patient_id: record.patient_id.clone(),
                sample_type: record.sample_type.clone(),
                date: record.date.clone(),
                filename: record.filename.clone(),
            }
        }
        Err(e) => {
            error!("Error parsing detection results: {}", e);
            ParsedDetectionResults::default()
        }
    }
}

/// Per-label statistics shown in the patient sidebar
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSummary {
    pub total: usize,
    /// Labels in first-seen order
    pub unique_labels: Vec<String>,
    /// Sorted by count descending, then label ascending
    pub counts: Vec<(String, usize)>,
}

pub fn summarize(detections: &[Detection]) -> DetectionSummary {
    let mut unique_labels: Vec<String> = Vec::new();
    let mut label_counts: HashMap<&str, usize> = HashMap::new();

    for detection in detections {
        let count = label_counts.entry(detection.label.as_str()).or_insert(0);
        if *count == 0 {
            unique_labels.push(detection.label.clone());
        }
        *count += 1;
    }

    let mut counts: Vec<(String, usize)> = label_counts
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    DetectionSummary {
        total: detections.len(),
        unique_labels,
        counts,
    }
}
