//! View-state reconciliation.
//!
//! One task owns the dashboard state. Commands from the presentation layer
//! and completions from spawned backend calls arrive on channels; the live
//! cadence comes from a timer. Every fetch is tagged with the counter value
//! current when it was issued, and a completion whose tag is no longer
//! current is dropped without touching anything. Cancellation therefore
//! means "stop listening", never aborting the request itself.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::TrafficApi;
use crate::drilldown::DrillDown;
use crate::error::ApiError;
use crate::model::{
    CaptureEvent, ForecastReport, Period, PredictionRecord, TrafficRecord, ViewMode,
};

/// User-driven inputs accepted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SwitchToLive,
    LoadHistorical(Period),
    SelectIp(String),
    ClearSelection,
    RunPrediction(String),
    RunForecast(String),
    Shutdown,
}

/// Completion notices from spawned backend calls.
#[derive(Debug)]
enum Completion {
    Snapshot {
        epoch: u64,
        outcome: Result<Vec<TrafficRecord>, ApiError>,
    },
    Captures {
        session: u64,
        outcome: Result<Vec<CaptureEvent>, ApiError>,
    },
    Prediction {
        session: u64,
        outcome: Result<Vec<PredictionRecord>, ApiError>,
    },
    Forecast {
        session: u64,
        outcome: Result<ForecastReport, ApiError>,
    },
}

/// Everything the presentation layer needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub mode: ViewMode,
    pub snapshot: Vec<TrafficRecord>,
    pub loading: bool,
    pub last_error: Option<String>,
    pub drilldown: Option<DrillDown>,
}

impl ViewState {
    pub fn initial() -> Self {
        Self {
            mode: ViewMode::Live,
            snapshot: Vec::new(),
            loading: true,
            last_error: None,
            drilldown: None,
        }
    }
}

/// Controller tunables, lifted from the `[view]` config section.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub poll_interval: Duration,
    pub capture_limit: usize,
    pub prediction_limit: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            capture_limit: 50,
            prediction_limit: 50,
        }
    }
}

/// Drives the view state until the command channel closes or a `Shutdown`
/// command arrives. Snapshots are published through `state_tx` after every
/// change.
pub async fn run_controller(
    api: Arc<dyn TrafficApi>,
    settings: ControllerSettings,
    mut commands: mpsc::Receiver<Command>,
    state_tx: watch::Sender<ViewState>,
) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let mut controller = ViewController::new(api, settings, done_tx, state_tx);
    let mut poll = controller.enter_live();

    info!(
        poll_interval = ?controller.settings.poll_interval,
        "view controller started"
    );

    loop {
        tokio::select! {
            // Commands from the presentation layer
            maybe_command = commands.recv() => {
                match maybe_command {
                    None | Some(Command::Shutdown) => {
                        info!("command channel closed, controller shutting down");
                        break;
                    }
                    Some(Command::SwitchToLive) => poll = controller.enter_live(),
                    Some(command) => controller.handle_command(command),
                }
            }

            // Completions from spawned backend calls
            Some(done) = done_rx.recv() => {
                controller.handle_completion(done);
            }

            // Live cadence; suppressed while a historical view is pinned
            _ = poll.tick(), if controller.is_live() => {
                controller.request_snapshot();
            }
        }
    }
}

struct ViewController {
    api: Arc<dyn TrafficApi>,
    settings: ControllerSettings,
    done_tx: mpsc::UnboundedSender<Completion>,
    state_tx: watch::Sender<ViewState>,
    state: ViewState,
    epoch: u64,
    session: u64,
}

impl ViewController {
    fn new(
        api: Arc<dyn TrafficApi>,
        settings: ControllerSettings,
        done_tx: mpsc::UnboundedSender<Completion>,
        state_tx: watch::Sender<ViewState>,
    ) -> Self {
        Self {
            api,
            settings,
            done_tx,
            state_tx,
            state: ViewState::initial(),
            epoch: 0,
            session: 0,
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }

    fn is_live(&self) -> bool {
        self.state.mode.is_live()
    }

    /// Switches to live mode and hands back a fresh poll timer. The timer's
    /// first tick fires immediately, which is what makes the mode fetch
    /// right away and then every interval.
    fn enter_live(&mut self) -> Interval {
        self.epoch += 1;
        self.state.mode = ViewMode::Live;
        self.state.loading = true;
        self.publish();
        let mut poll = interval(self.settings.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        poll
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::LoadHistorical(period) => self.enter_historical(period),
            Command::SelectIp(ip) => self.select_client(ip),
            Command::ClearSelection => self.clear_selection(),
            Command::RunPrediction(ip) => self.restart_prediction(ip),
            Command::RunForecast(ip) => self.start_forecast(ip),
            // handled by the loop itself
            Command::SwitchToLive | Command::Shutdown => {}
        }
    }

    fn enter_historical(&mut self, period: Period) {
        self.state.mode = ViewMode::Historical(period);
        self.state.loading = true;
        self.publish();
        self.request_snapshot();
    }

    /// Issues a snapshot fetch for the current mode. Every request gets a
    /// new epoch, so only the most recently issued fetch may ever commit.
    fn request_snapshot(&mut self) {
        self.epoch += 1;
        let epoch = self.epoch;
        let mode = self.state.mode;
        let api = Arc::clone(&self.api);
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let outcome = match mode {
                ViewMode::Live => api.fetch_live().await,
                ViewMode::Historical(period) => api.fetch_historical(period).await,
            };
            let _ = done.send(Completion::Snapshot { epoch, outcome });
        });
    }

    /// Opens a drill-down for a client currently in the snapshot. Unknown
    /// addresses are ignored.
    fn select_client(&mut self, ip: String) {
        let Some(summary) = self
            .state
            .snapshot
            .iter()
            .find(|record| record.client_ip == ip)
            .cloned()
        else {
            debug!(%ip, "selection ignored, client not in snapshot");
            return;
        };
        self.session += 1;
        self.state.drilldown = Some(DrillDown::begin(summary));
        self.publish();
        self.request_captures(ip.clone());
        self.request_prediction(ip);
    }

    fn request_captures(&self, ip: String) {
        let session = self.session;
        let limit = self.settings.capture_limit;
        let api = Arc::clone(&self.api);
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let outcome = api.fetch_captures(&ip, limit).await;
            let _ = done.send(Completion::Captures { session, outcome });
        });
    }

    /// Prediction is a chain: trigger a run, and only if that succeeds
    /// fetch the stored results.
    fn request_prediction(&self, ip: String) {
        let session = self.session;
        let limit = self.settings.prediction_limit;
        let api = Arc::clone(&self.api);
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let outcome = match api.run_prediction(&ip).await {
                Ok(()) => api.fetch_predictions(&ip, limit).await,
                Err(err) => Err(err),
            };
            let _ = done.send(Completion::Prediction { session, outcome });
        });
    }

    fn restart_prediction(&mut self, ip: String) {
        let Some(session_state) = self.state.drilldown.as_mut() else {
            return;
        };
        if session_state.client_ip != ip {
            return;
        }
        session_state.rearm_prediction();
        self.publish();
        self.request_prediction(ip);
    }

    fn start_forecast(&mut self, ip: String) {
        let Some(session_state) = self.state.drilldown.as_mut() else {
            return;
        };
        if session_state.client_ip != ip {
            return;
        }
        session_state.begin_forecast();
        self.publish();
        let session = self.session;
        let api = Arc::clone(&self.api);
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let outcome = api.run_forecast(&ip).await;
            let _ = done.send(Completion::Forecast { session, outcome });
        });
    }

    /// Drops the whole session in one assignment. The session counter bump
    /// makes any still-running fetch for it land in the void.
    fn clear_selection(&mut self) {
        self.session += 1;
        self.state.drilldown = None;
        self.publish();
    }

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Snapshot { epoch, outcome } => self.commit_snapshot(epoch, outcome),
            Completion::Captures { session, outcome } => {
                if session != self.session {
                    debug!("dropping capture history for a closed session");
                    return;
                }
                if let Some(session_state) = self.state.drilldown.as_mut() {
                    session_state.apply_captures(outcome);
                    self.publish();
                }
            }
            Completion::Prediction { session, outcome } => {
                if session != self.session {
                    debug!("dropping prediction result for a closed session");
                    return;
                }
                if let Some(session_state) = self.state.drilldown.as_mut() {
                    session_state.apply_prediction(outcome);
                    self.publish();
                }
            }
            Completion::Forecast { session, outcome } => {
                if session != self.session {
                    debug!("dropping forecast result for a closed session");
                    return;
                }
                if let Some(session_state) = self.state.drilldown.as_mut() {
                    session_state.apply_forecast(outcome);
                    self.publish();
                }
            }
        }
    }

    /// A snapshot response may only commit as the answer to the newest
    /// request. Errors keep the previous data and surface as a banner.
    fn commit_snapshot(&mut self, epoch: u64, outcome: Result<Vec<TrafficRecord>, ApiError>) {
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, "dropping stale snapshot response");
            return;
        }
        self.state.loading = false;
        match outcome {
            Ok(records) => {
                self.state.snapshot = records;
                self.state.last_error = None;
            }
            Err(err) => {
                warn!(error = %err, mode = %self.state.mode, "snapshot fetch failed, keeping previous data");
                self.state.last_error = Some(err.to_string());
            }
        }
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drilldown::FetchState;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::{advance, sleep};

    const POLL: Duration = Duration::from_secs(5);

    struct Scripted<T> {
        delay: Duration,
        outcome: Result<T, ApiError>,
    }

    impl<T> Scripted<T> {
        fn ok(value: T) -> Self {
            Self {
                delay: Duration::ZERO,
                outcome: Ok(value),
            }
        }

        fn ok_after(secs: u64, value: T) -> Self {
            Self {
                delay: Duration::from_secs(secs),
                outcome: Ok(value),
            }
        }

        fn fail() -> Self {
            Self {
                delay: Duration::ZERO,
                outcome: Err(server_error()),
            }
        }
    }

    fn server_error() -> ApiError {
        ApiError::Status {
            endpoint: "/api/traffic".to_string(),
            status: StatusCode::BAD_GATEWAY,
        }
    }

    #[derive(Default)]
    struct MockApi {
        live: Mutex<VecDeque<Scripted<Vec<TrafficRecord>>>>,
        historical: Mutex<VecDeque<Scripted<Vec<TrafficRecord>>>>,
        captures: Mutex<VecDeque<Scripted<Vec<CaptureEvent>>>>,
        runs: Mutex<VecDeque<Result<(), ApiError>>>,
        predictions: Mutex<VecDeque<Scripted<Vec<PredictionRecord>>>>,
        forecasts: Mutex<VecDeque<Scripted<ForecastReport>>>,
        live_calls: AtomicUsize,
        historical_calls: AtomicUsize,
        capture_calls: AtomicUsize,
        prediction_fetches: AtomicUsize,
    }

    impl MockApi {
        async fn next<T>(
            queue: &Mutex<VecDeque<Scripted<T>>>,
            fallback: T,
        ) -> Result<T, ApiError> {
            let scripted = queue.lock().unwrap().pop_front();
            match scripted {
                Some(scripted) => {
                    if !scripted.delay.is_zero() {
                        sleep(scripted.delay).await;
                    }
                    scripted.outcome
                }
                None => Ok(fallback),
            }
        }
    }

    #[async_trait]
    impl TrafficApi for MockApi {
        async fn fetch_live(&self) -> Result<Vec<TrafficRecord>, ApiError> {
            self.live_calls.fetch_add(1, Ordering::SeqCst);
            Self::next(&self.live, Vec::new()).await
        }

        async fn fetch_historical(&self, _period: Period) -> Result<Vec<TrafficRecord>, ApiError> {
            self.historical_calls.fetch_add(1, Ordering::SeqCst);
            Self::next(&self.historical, Vec::new()).await
        }

        async fn fetch_captures(
            &self,
            _client_ip: &str,
            _limit: usize,
        ) -> Result<Vec<CaptureEvent>, ApiError> {
            self.capture_calls.fetch_add(1, Ordering::SeqCst);
            Self::next(&self.captures, Vec::new()).await
        }

        async fn fetch_client_protocols(&self, client_ip: &str) -> Result<TrafficRecord, ApiError> {
            Err(ApiError::Empty {
                endpoint: format!("/api/traffic/protocols/{client_ip}"),
            })
        }

        async fn run_prediction(&self, _client_ip: &str) -> Result<(), ApiError> {
            self.runs.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }

        async fn fetch_predictions(
            &self,
            _client_ip: &str,
            _limit: usize,
        ) -> Result<Vec<PredictionRecord>, ApiError> {
            self.prediction_fetches.fetch_add(1, Ordering::SeqCst);
            Self::next(&self.predictions, Vec::new()).await
        }

        async fn run_forecast(&self, _client_ip: &str) -> Result<ForecastReport, ApiError> {
            Self::next(&self.forecasts, report(2048.0)).await
        }
    }

    fn record(ip: &str, inbound: u64, outbound: u64) -> TrafficRecord {
        TrafficRecord {
            client_ip: ip.to_string(),
            inbound,
            outbound,
            protocols: vec![("TCP".to_string(), inbound)],
            created_at: None,
        }
    }

    fn prediction(label: &str) -> PredictionRecord {
        PredictionRecord {
            client_ip: "10.0.0.1".to_string(),
            label: label.to_string(),
            probability: 0.9,
            created_at: None,
        }
    }

    fn report(predicted: f64) -> ForecastReport {
        ForecastReport {
            client_ip: "10.0.0.1".to_string(),
            forecast_timestamp: "2026-08-21T12:00:00".to_string(),
            predicted_inbound_size: predicted,
            unit: "bytes".to_string(),
            model_used: "linear".to_string(),
        }
    }

    struct Harness {
        commands: mpsc::Sender<Command>,
        state: watch::Receiver<ViewState>,
    }

    impl Harness {
        fn view(&self) -> ViewState {
            self.state.borrow().clone()
        }

        async fn send(&self, command: Command) {
            self.commands.send(command).await.unwrap();
        }
    }

    fn start(api: Arc<MockApi>) -> Harness {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (state_tx, state_rx) = watch::channel(ViewState::initial());
        tokio::spawn(run_controller(
            api,
            ControllerSettings::default(),
            command_rx,
            state_tx,
        ));
        Harness {
            commands: command_tx,
            state: state_rx,
        }
    }

    /// Lets the controller and its spawned fetches run to quiescence.
    async fn settle() {
        sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn live_mode_fetches_immediately_then_on_cadence() {
        let api = Arc::new(MockApi::default());
        api.live.lock().unwrap().extend([
            Scripted::ok(vec![record("10.0.0.1", 1, 0)]),
            Scripted::ok(vec![record("10.0.0.1", 2, 0)]),
            Scripted::ok(vec![record("10.0.0.1", 3, 0)]),
        ]);
        let harness = start(Arc::clone(&api));

        settle().await;
        assert_eq!(api.live_calls.load(Ordering::SeqCst), 1);
        let view = harness.view();
        assert!(view.mode.is_live());
        assert!(!view.loading);
        assert_eq!(view.snapshot[0].inbound, 1);

        advance(POLL).await;
        settle().await;
        assert_eq!(api.live_calls.load(Ordering::SeqCst), 2);
        assert_eq!(harness.view().snapshot[0].inbound, 2);

        advance(POLL).await;
        settle().await;
        assert_eq!(api.live_calls.load(Ordering::SeqCst), 3);
        assert_eq!(harness.view().snapshot[0].inbound, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn historical_mode_fetches_exactly_once() {
        let api = Arc::new(MockApi::default());
        api.historical
            .lock()
            .unwrap()
            .push_back(Scripted::ok(vec![record("10.0.0.2", 7, 0)]));
        let harness = start(Arc::clone(&api));
        settle().await;

        harness.send(Command::LoadHistorical(Period::Hour)).await;
        settle().await;
        let view = harness.view();
        assert_eq!(view.mode, ViewMode::Historical(Period::Hour));
        assert!(!view.loading);
        assert_eq!(view.snapshot[0].client_ip, "10.0.0.2");

        advance(POLL).await;
        settle().await;
        advance(POLL).await;
        settle().await;
        assert_eq!(api.historical_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.live_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_modes_discards_the_inflight_fetch() {
        let api = Arc::new(MockApi::default());
        api.live
            .lock()
            .unwrap()
            .push_back(Scripted::ok_after(3, vec![record("10.9.9.9", 999, 0)]));
        api.historical
            .lock()
            .unwrap()
            .push_back(Scripted::ok(vec![record("10.0.0.2", 7, 0)]));
        let harness = start(Arc::clone(&api));
        settle().await;

        // live answer still in flight
        assert!(harness.view().snapshot.is_empty());
        harness.send(Command::LoadHistorical(Period::Day)).await;
        settle().await;
        assert_eq!(harness.view().snapshot[0].client_ip, "10.0.0.2");

        // the late live answer lands and must change nothing
        advance(Duration::from_secs(3)).await;
        settle().await;
        let view = harness.view();
        assert_eq!(view.mode, ViewMode::Historical(Period::Day));
        assert_eq!(view.snapshot[0].client_ip, "10.0.0.2");
        assert!(!view.loading);
        assert!(view.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_period_switch_commits_only_the_latest() {
        let api = Arc::new(MockApi::default());
        api.historical.lock().unwrap().extend([
            Scripted::ok_after(2, vec![record("minute-data", 1, 0)]),
            Scripted::ok(vec![record("hour-data", 2, 0)]),
        ]);
        let harness = start(Arc::clone(&api));
        settle().await;

        harness.send(Command::LoadHistorical(Period::Minute)).await;
        harness.send(Command::LoadHistorical(Period::Hour)).await;
        settle().await;
        assert_eq!(harness.view().snapshot[0].client_ip, "hour-data");

        advance(Duration::from_secs(2)).await;
        settle().await;
        let view = harness.view();
        assert_eq!(view.mode, ViewMode::Historical(Period::Hour));
        assert_eq!(view.snapshot[0].client_ip, "hour-data");
        // both fetches ran; cancellation only stops listening
        assert_eq!(api.historical_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_errors_keep_the_previous_snapshot() {
        let api = Arc::new(MockApi::default());
        api.live.lock().unwrap().extend([
            Scripted::ok(vec![record("10.0.0.1", 1, 0)]),
            Scripted::fail(),
            Scripted::ok(vec![record("10.0.0.1", 3, 0)]),
        ]);
        let harness = start(Arc::clone(&api));
        settle().await;
        assert!(harness.view().last_error.is_none());

        advance(POLL).await;
        settle().await;
        let view = harness.view();
        assert_eq!(view.snapshot[0].inbound, 1);
        assert!(view.last_error.is_some());
        assert!(!view.loading);

        advance(POLL).await;
        settle().await;
        let view = harness.view();
        assert_eq!(view.snapshot[0].inbound, 3);
        assert!(view.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_an_unknown_client_is_a_no_op() {
        let api = Arc::new(MockApi::default());
        api.live
            .lock()
            .unwrap()
            .push_back(Scripted::ok(vec![record("10.0.0.1", 1, 0)]));
        let harness = start(Arc::clone(&api));
        settle().await;

        harness
            .send(Command::SelectIp("192.168.9.9".to_string()))
            .await;
        settle().await;
        assert!(harness.view().drilldown.is_none());
        assert_eq!(api.capture_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn capture_failure_still_opens_the_overlay() {
        let api = Arc::new(MockApi::default());
        api.live
            .lock()
            .unwrap()
            .push_back(Scripted::ok(vec![record("10.0.0.1", 100, 50)]));
        api.captures.lock().unwrap().push_back(Scripted::fail());
        api.predictions
            .lock()
            .unwrap()
            .push_back(Scripted::ok(vec![prediction("normal")]));
        let harness = start(Arc::clone(&api));
        settle().await;

        harness.send(Command::SelectIp("10.0.0.1".to_string())).await;
        settle().await;
        let view = harness.view();
        let session = view.drilldown.expect("session should exist");
        assert!(session.visible);
        assert!(session.captures.is_empty());
        assert!(session.captures_error.is_some());
        assert_eq!(session.summary.total(), 150);
        assert_eq!(session.current_prediction().unwrap().label, "normal");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_prediction_run_never_fetches_results() {
        let api = Arc::new(MockApi::default());
        api.live
            .lock()
            .unwrap()
            .push_back(Scripted::ok(vec![record("10.0.0.1", 1, 0)]));
        api.runs.lock().unwrap().push_back(Err(server_error()));
        let harness = start(Arc::clone(&api));
        settle().await;

        harness.send(Command::SelectIp("10.0.0.1".to_string())).await;
        settle().await;
        let session = harness.view().drilldown.expect("session should exist");
        assert!(matches!(session.prediction, FetchState::Failed(_)));
        assert_eq!(api.prediction_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_prediction_history_reports_not_found() {
        let api = Arc::new(MockApi::default());
        api.live
            .lock()
            .unwrap()
            .push_back(Scripted::ok(vec![record("10.0.0.1", 1, 0)]));
        api.predictions
            .lock()
            .unwrap()
            .push_back(Scripted::ok(Vec::new()));
        let harness = start(Arc::clone(&api));
        settle().await;

        harness.send(Command::SelectIp("10.0.0.1".to_string())).await;
        settle().await;
        let session = harness.view().drilldown.expect("session should exist");
        assert_eq!(
            session.prediction,
            FetchState::Failed("no prediction found for 10.0.0.1".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_selection_ignores_late_results() {
        let api = Arc::new(MockApi::default());
        api.live
            .lock()
            .unwrap()
            .push_back(Scripted::ok(vec![record("10.0.0.1", 1, 0)]));
        api.captures
            .lock()
            .unwrap()
            .push_back(Scripted::ok_after(2, Vec::new()));
        let harness = start(Arc::clone(&api));
        settle().await;

        harness.send(Command::SelectIp("10.0.0.1".to_string())).await;
        settle().await;
        assert!(harness.view().drilldown.is_some());

        harness.send(Command::ClearSelection).await;
        settle().await;
        assert!(harness.view().drilldown.is_none());

        // the capture fetch finishes after the session was cleared
        advance(Duration::from_secs(2)).await;
        settle().await;
        assert!(harness.view().drilldown.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn forecast_runs_independently_and_rearms() {
        let api = Arc::new(MockApi::default());
        api.live
            .lock()
            .unwrap()
            .push_back(Scripted::ok(vec![record("10.0.0.1", 1, 0)]));
        api.forecasts.lock().unwrap().extend([
            Scripted::ok(report(4096.0)),
            Scripted::fail(),
        ]);
        let harness = start(Arc::clone(&api));
        settle().await;

        // before any session exists the command is ignored
        harness
            .send(Command::RunForecast("10.0.0.1".to_string()))
            .await;
        settle().await;
        assert!(harness.view().drilldown.is_none());

        harness.send(Command::SelectIp("10.0.0.1".to_string())).await;
        settle().await;
        assert_eq!(
            harness.view().drilldown.unwrap().forecast,
            FetchState::Idle
        );

        harness
            .send(Command::RunForecast("10.0.0.1".to_string()))
            .await;
        settle().await;
        let session = harness.view().drilldown.expect("session should exist");
        assert_eq!(
            session.forecast.ready().unwrap().predicted_inbound_size,
            4096.0
        );
        let prediction_before = session.prediction.clone();

        harness
            .send(Command::RunForecast("10.0.0.1".to_string()))
            .await;
        settle().await;
        let session = harness.view().drilldown.expect("session should exist");
        assert!(matches!(session.forecast, FetchState::Failed(_)));
        assert_eq!(session.prediction, prediction_before);
    }

    #[tokio::test(start_paused = true)]
    async fn rerunning_prediction_replaces_the_old_outcome() {
        let api = Arc::new(MockApi::default());
        api.live
            .lock()
            .unwrap()
            .push_back(Scripted::ok(vec![record("10.0.0.1", 1, 0)]));
        api.predictions.lock().unwrap().extend([
            Scripted::ok(Vec::new()),
            Scripted::ok(vec![prediction("suspicious")]),
        ]);
        let harness = start(Arc::clone(&api));
        settle().await;

        harness.send(Command::SelectIp("10.0.0.1".to_string())).await;
        settle().await;
        assert!(matches!(
            harness.view().drilldown.unwrap().prediction,
            FetchState::Failed(_)
        ));

        harness
            .send(Command::RunPrediction("10.0.0.1".to_string()))
            .await;
        settle().await;
        let session = harness.view().drilldown.expect("session should exist");
        assert_eq!(session.current_prediction().unwrap().label, "suspicious");
    }
}
