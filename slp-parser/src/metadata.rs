//! The `metadata` block written after the event stream once a recording is finalized.
//!
//! Its contents depend on the client that wrote the replay, so it is kept as a JSON value.
//! A few fields that every client writes get typed accessors.

use serde::Serialize;
use serde_json::Value;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339};

use crate::errors::{Result, SlpError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata(Value);

impl Metadata {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// When the game started. Early clients wrote the time without an offset; those are
    /// read as UTC.
    pub fn start_at(&self) -> Result<Option<OffsetDateTime>> {
        let Some(start_at) = self.0.get("startAt").and_then(Value::as_str) else {
            return Ok(None);
        };

        if let Ok(datetime) = OffsetDateTime::parse(start_at, &Rfc3339) {
            return Ok(Some(datetime));
        }

        let tsfmt = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

        PrimitiveDateTime::parse(start_at, &tsfmt)
            .map(|datetime| Some(datetime.assume_utc()))
            .map_err(|e| SlpError::MetadataParse(format!("startAt `{start_at}`: {e}")))
    }

    /// The last frame, as counted by the client that recorded the game.
    pub fn last_frame(&self) -> Option<i32> {
        self.0
            .get("lastFrame")
            .and_then(Value::as_i64)
            .and_then(|frame| i32::try_from(frame).ok())
    }

    /// The platform the game was played on (`dolphin`, `console`, `nintendont`, ...).
    pub fn played_on(&self) -> Option<&str> {
        self.0.get("playedOn").and_then(Value::as_str)
    }
}
