//! Per-client drill-down session state.
//!
//! All IO happens in the controller's spawned tasks; this module only holds
//! the bookkeeping those tasks resolve into.

use crate::aggregate;
use crate::error::ApiError;
use crate::model::{CaptureEvent, ForecastReport, PredictionRecord, TrafficRecord};

/// Lifecycle of an on-demand sub-flow inside the session.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchState<T> {
    #[default]
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            FetchState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// A capture row paired with its protocols ranked by volume.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedCapture {
    pub event: CaptureEvent,
    pub ranked_protocols: Vec<(String, u64)>,
}

impl AnnotatedCapture {
    pub fn new(event: CaptureEvent) -> Self {
        let ranked_protocols = aggregate::rank_protocols(&event.protocols);
        Self {
            event,
            ranked_protocols,
        }
    }

    pub fn top_protocol(&self) -> Option<&(String, u64)> {
        self.ranked_protocols.first()
    }
}

/// Inspection state for one client picked from the talkers table.
///
/// The overlay stays closed until the capture fetch resolves; resolution of
/// either kind makes it visible. Prediction and forecast are independent
/// sub-flows with their own lifecycles.
#[derive(Debug, Clone, PartialEq)]
pub struct DrillDown {
    pub client_ip: String,
    pub summary: TrafficRecord,
    pub visible: bool,
    pub captures: Vec<AnnotatedCapture>,
    pub captures_error: Option<String>,
    pub prediction: FetchState<Vec<PredictionRecord>>,
    pub forecast: FetchState<ForecastReport>,
}

impl DrillDown {
    /// Opens a session from the snapshot row the user picked. The capture
    /// and prediction fetches start immediately, so both begin loading.
    pub fn begin(summary: TrafficRecord) -> Self {
        Self {
            client_ip: summary.client_ip.clone(),
            summary,
            visible: false,
            captures: Vec::new(),
            captures_error: None,
            prediction: FetchState::Loading,
            forecast: FetchState::Idle,
        }
    }

    /// Applies the capture-history outcome. The overlay opens either way;
    /// on failure it shows the summary row with a session-scoped error.
    pub fn apply_captures(&mut self, outcome: Result<Vec<CaptureEvent>, ApiError>) {
        match outcome {
            Ok(events) => {
                self.captures = events.into_iter().map(AnnotatedCapture::new).collect();
                self.captures_error = None;
            }
            Err(err) => {
                self.captures_error = Some(err.to_string());
            }
        }
        self.visible = true;
    }

    /// Applies the outcome of the run-then-fetch prediction chain.
    ///
    /// An empty history and a clean not-found answer read the same to the
    /// user: there is nothing stored for this client.
    pub fn apply_prediction(&mut self, outcome: Result<Vec<PredictionRecord>, ApiError>) {
        self.prediction = match outcome {
            Ok(records) if records.is_empty() => FetchState::Failed(self.no_prediction_message()),
            Ok(records) => FetchState::Ready(records),
            Err(err) if err.is_empty() => FetchState::Failed(self.no_prediction_message()),
            Err(err) => FetchState::Failed(err.to_string()),
        };
    }

    pub fn apply_forecast(&mut self, outcome: Result<ForecastReport, ApiError>) {
        self.forecast = match outcome {
            Ok(report) => FetchState::Ready(report),
            Err(err) => FetchState::Failed(err.to_string()),
        };
    }

    /// Restarts the prediction chain, dropping any prior result or error.
    pub fn rearm_prediction(&mut self) {
        self.prediction = FetchState::Loading;
    }

    /// Starts a forecast run, dropping any prior result or error.
    pub fn begin_forecast(&mut self) {
        self.forecast = FetchState::Loading;
    }

    /// Newest stored classifier result, if any.
    pub fn current_prediction(&self) -> Option<&PredictionRecord> {
        self.prediction.ready().and_then(|records| records.first())
    }

    fn no_prediction_message(&self) -> String {
        format!("no prediction found for {}", self.client_ip)
    }
}
