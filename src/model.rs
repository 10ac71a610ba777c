//! Traffic data model and wire-format decoding.
//!
//! The backend reports per-client volumes as loosely typed JSON: sizes may
//! arrive as floats or garbage, timestamps come in several shapes, and some
//! envelopes exist in two variants. Raw `serde` types absorb all of that;
//! `normalize` turns them into the strict domain types the rest of the
//! application works with.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{self, Deserializer, MapAccess};
use serde::Deserialize;
use tracing::debug;

/// One client's aggregated traffic for a single reporting window.
///
/// `protocols` keeps the backend's own ordering. The per-protocol counts
/// and the inbound/outbound pair are measured independently and their sums
/// are not required to agree.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficRecord {
    pub client_ip: String,
    pub inbound: u64,
    pub outbound: u64,
    pub protocols: Vec<(String, u64)>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TrafficRecord {
    pub fn total(&self) -> u64 {
        self.inbound.saturating_add(self.outbound)
    }
}

impl fmt::Display for TrafficRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in={} out={}",
            self.client_ip, self.inbound, self.outbound
        )
    }
}

/// A single capture row from the per-client history endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureEvent {
    pub created_at: Option<DateTime<Utc>>,
    pub inbound: u64,
    pub outbound: u64,
    pub protocols: Vec<(String, u64)>,
}

/// Stored classifier output for one client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionRecord {
    #[serde(default)]
    pub client_ip: String,
    #[serde(alias = "prediction")]
    pub label: String,
    #[serde(default)]
    pub probability: f64,
    #[serde(default, alias = "timestamp", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Result of a forecast run for one client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForecastReport {
    #[serde(default)]
    pub client_ip: String,
    #[serde(default, alias = "created_at")]
    pub forecast_timestamp: String,
    #[serde(default, alias = "predicted_value")]
    pub predicted_inbound_size: f64,
    #[serde(default = "default_forecast_unit")]
    pub unit: String,
    #[serde(default)]
    pub model_used: String,
}

fn default_forecast_unit() -> String {
    "bytes".to_string()
}

/// Aggregation windows the backend can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Minute,
    Hour,
    Day,
    Week,
}

impl Period {
    /// Label used in query strings and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Minute => "minute",
            Period::Hour => "hour",
            Period::Day => "day",
            Period::Week => "week",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minute" => Ok(Period::Minute),
            "hour" => Ok(Period::Hour),
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            other => bail!("unknown period '{other}' (expected minute, hour, day or week)"),
        }
    }
}

/// What the dashboard is currently looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Live,
    Historical(Period),
}

impl ViewMode {
    pub fn is_live(&self) -> bool {
        matches!(self, ViewMode::Live)
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Live => f.write_str("live"),
            ViewMode::Historical(period) => write!(f, "{period}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes

/// Envelope used by the live and aggregate traffic endpoints.
#[derive(Debug, Deserialize)]
pub struct TrafficEnvelope {
    #[serde(default)]
    pub traffic: Vec<RawTrafficRecord>,
}

/// A traffic row as it appears on the wire, before normalization.
#[derive(Debug, Deserialize)]
pub struct RawTrafficRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub client_ip: Option<String>,
    #[serde(default, deserialize_with = "lenient_bytes")]
    pub inbound: f64,
    #[serde(default, deserialize_with = "lenient_bytes")]
    pub outbound: f64,
    #[serde(default, deserialize_with = "lenient_protocols")]
    pub protocols: Vec<(String, f64)>,
    #[serde(default, alias = "timestamp", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl RawTrafficRecord {
    /// Clamps sizes and drops the row when no client address is present.
    pub fn normalize(self) -> Option<TrafficRecord> {
        let client_ip = self.client_ip.filter(|ip| !ip.trim().is_empty())?;
        Some(TrafficRecord {
            client_ip,
            inbound: clamp_to_bytes(self.inbound),
            outbound: clamp_to_bytes(self.outbound),
            protocols: clamp_protocols(self.protocols),
            created_at: self.created_at,
        })
    }
}

/// A capture row as it appears on the wire.
#[derive(Debug, Deserialize)]
pub struct RawCaptureEvent {
    #[serde(default, alias = "timestamp", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_bytes")]
    pub inbound: f64,
    #[serde(default, deserialize_with = "lenient_bytes")]
    pub outbound: f64,
    #[serde(default, deserialize_with = "lenient_protocols")]
    pub protocols: Vec<(String, f64)>,
}

impl RawCaptureEvent {
    pub fn normalize(self) -> CaptureEvent {
        CaptureEvent {
            created_at: self.created_at,
            inbound: clamp_to_bytes(self.inbound),
            outbound: clamp_to_bytes(self.outbound),
            protocols: clamp_protocols(self.protocols),
        }
    }
}

/// Capture history arrives either as a bare array or wrapped in an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CapturesResponse {
    Bare(Vec<RawCaptureEvent>),
    Wrapped {
        #[serde(default)]
        captures: Vec<RawCaptureEvent>,
    },
}

impl CapturesResponse {
    pub fn into_events(self) -> Vec<CaptureEvent> {
        let raw = match self {
            CapturesResponse::Bare(events) => events,
            CapturesResponse::Wrapped { captures } => captures,
        };
        raw.into_iter().map(RawCaptureEvent::normalize).collect()
    }
}

/// The prediction endpoint returns a single object or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Many(Vec<PredictionRecord>),
    One(PredictionRecord),
}

impl PredictionResponse {
    pub fn into_records(self) -> Vec<PredictionRecord> {
        match self {
            PredictionResponse::Many(records) => records,
            PredictionResponse::One(record) => vec![record],
        }
    }
}

/// Normalizes a decoded batch, logging how many rows were unusable.
pub fn normalize_records(raw: Vec<RawTrafficRecord>) -> Vec<TrafficRecord> {
    let total = raw.len();
    let records: Vec<TrafficRecord> = raw
        .into_iter()
        .filter_map(RawTrafficRecord::normalize)
        .collect();
    if records.len() < total {
        debug!(
            dropped = total - records.len(),
            "dropped traffic rows without a client address"
        );
    }
    records
}

fn clamp_to_bytes(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

fn clamp_protocols(pairs: Vec<(String, f64)>) -> Vec<(String, u64)> {
    pairs
        .into_iter()
        .map(|(name, value)| (name, clamp_to_bytes(value)))
        .collect()
}

// ---------------------------------------------------------------------------
// Lenient field decoders

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_owned))
}

fn lenient_bytes<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().unwrap_or(0.0))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(parse_timestamp))
}

/// Accepts RFC 3339 as well as the naive ISO 8601 strings the backend emits.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    None
}

/// Keeps JSON object entries in document order.
fn lenient_protocols<'de, D>(deserializer: D) -> Result<Vec<(String, f64)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ProtocolVisitor;

    impl<'de> de::Visitor<'de> for ProtocolVisitor {
        type Value = Vec<(String, f64)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of protocol names to byte counts")
        }

        fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((name, value)) = access.next_entry::<String, serde_json::Value>()? {
                pairs.push((name, value.as_f64().unwrap_or(0.0)));
            }
            Ok(pairs)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(ProtocolVisitor)
}
