//! JSON shapes exchanged with the face-comparison service.
//!
//! Requests follow `{images: [{data, index, detectAll, type}, ...]}`. Responses
//! are parsed leniently: the service has been seen returning the comparisons
//! under `results`, as a bare array, and with similarities as strings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::aggregate::FaceComparison;
use crate::config::ClientConfig;

#[derive(Debug, Clone, Serialize)]
pub struct MatchRequest {
    pub images: Vec<MatchImage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchImage {
    /// Base64 of the raw file bytes.
    pub data: String,
    pub index: u32,
    pub detect_all: bool,
    #[serde(rename = "type")]
    pub image_type: i32,
}

impl MatchRequest {
    pub fn new(document: &[u8], live: &[u8], cfg: &ClientConfig) -> Self {
        Self {
            images: vec![
                MatchImage {
                    data: STANDARD.encode(document),
                    index: 0,
                    detect_all: cfg.detect_all,
                    image_type: cfg.document_image_type,
                },
                MatchImage {
                    data: STANDARD.encode(live),
                    index: 1,
                    detect_all: cfg.detect_all,
                    image_type: cfg.live_image_type,
                },
            ],
        }
    }
}

/// A 200 response body, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Well-formed result list. May be empty when no faces could be paired.
    Comparisons { comparisons: Vec<FaceComparison>, raw: Value },
    /// JSON without any result list: the service has not finished processing.
    Empty { raw: Value },
}

#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}

pub fn parse_payload(body: &[u8]) -> Result<Payload, PayloadError> {
    let raw: Value =
        serde_json::from_slice(body).map_err(|e| PayloadError::InvalidJson(e.to_string()))?;

    let comparisons = match &raw {
        Value::Array(items) => Some(parse_items(items)),
        Value::Object(map) => match map.get("results") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(parse_items(items)),
            Some(other) => {
                return Err(PayloadError::UnexpectedShape(format!(
                    "`results` is {}",
                    json_kind(other)
                )))
            }
        },
        other => {
            return Err(PayloadError::UnexpectedShape(format!(
                "top-level {}",
                json_kind(other)
            )))
        }
    };

    Ok(match comparisons {
        Some(comparisons) => Payload::Comparisons { comparisons, raw },
        None => Payload::Empty { raw },
    })
}

fn parse_items(items: &[Value]) -> Vec<FaceComparison> {
    items.iter().filter_map(parse_comparison).collect()
}

fn parse_comparison(item: &Value) -> Option<FaceComparison> {
    let similarity = match item.get("similarity")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !similarity.is_finite() {
        return None;
    }
    Some(FaceComparison::new(similarity as f32).with_faces(
        face_index(item, &["firstFaceIndex", "first_face_index"]),
        face_index(item, &["secondFaceIndex", "second_face_index"]),
    ))
}

fn face_index(item: &Value, keys: &[&str]) -> Option<u32> {
    keys.iter()
        .find_map(|k| item.get(*k).and_then(Value::as_u64))
        .and_then(|v| u32::try_from(v).ok())
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
