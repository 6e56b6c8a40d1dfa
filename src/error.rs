use std::fmt::Display;
use wasm_bindgen::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub enum FeedError {
    Fetch(String),
    Js(String),
    Decode(String),
    KeyConflict(String),
}

impl Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Fetch(s) => write!(f, "Fetch Error: {}", s),
            FeedError::Js(s) => write!(f, "JS Error: {}", s),
            FeedError::Decode(s) => write!(f, "Decode Error: {}", s),
            FeedError::KeyConflict(s) => write!(f, "Key Conflict: {}", s),
        }
    }
}

impl std::error::Error for FeedError {}

impl From<JsValue> for FeedError {
    fn from(v: JsValue) -> Self {
        FeedError::Js(v.as_string().unwrap_or_else(|| format!("{:?}", v)))
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Decode(e.to_string())
    }
}

impl From<FeedError> for JsValue {
    fn from(e: FeedError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}
