// src/core/orchestrator.rs — Generation/evaluation control loop

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;

use super::progress::EtaEstimator;
use super::schedule::build_schedule;
use super::similarity;
use super::types::*;
use crate::evaluator::Evaluator;
use crate::generator::{GeneratedDraft, Generator, BEHAVIOR_PATTERNS, SCENARIOS};
use crate::infra::errors::ConvoGenError;
use crate::store::{ChatlogRecord, ChatlogSink};

/// Loop commands carried on the watch channel. The loop awaits changes
/// instead of polling, so pause/resume/stop take effect at the next
/// iteration boundary without idle wakeups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Run,
    Pause,
    Stop,
}

/// What happened to one planned conversation slot.
enum SlotOutcome {
    Accepted,
    Skipped,
    Stopped,
}

/// Narrow control surface handed to the UI/CLI layer: commands plus
/// read-only snapshots. Cloneable; dropping every handle counts as a
/// stop request since nobody could ever resume the loop.
#[derive(Clone)]
pub struct SessionHandle {
    session: Arc<Mutex<GenerationSession>>,
    control: Arc<watch::Sender<Control>>,
}

impl SessionHandle {
    pub fn pause(&self) {
        let _ = self.control.send(Control::Pause);
    }

    pub fn resume(&self) {
        let _ = self.control.send(Control::Run);
    }

    pub fn stop(&self) {
        let _ = self.control.send(Control::Stop);
    }

    /// Read-only snapshot of the current session state.
    pub fn snapshot(&self) -> GenerationSession {
        lock_session(&self.session).clone()
    }
}

fn lock_session(session: &Arc<Mutex<GenerationSession>>) -> MutexGuard<'_, GenerationSession> {
    match session.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Drives the whole run: schedule iteration, volume planning, external
/// generation and scoring calls, dedup, progress accounting and
/// persistence hand-off. One conversation at a time; no fan-out.
pub struct Orchestrator {
    generator: Arc<dyn Generator>,
    evaluator: Arc<dyn Evaluator>,
    sink: Option<Arc<dyn ChatlogSink>>,
    params: RunParams,
    schedule: Vec<WorkUnit>,
    session: Arc<Mutex<GenerationSession>>,
    control: watch::Receiver<Control>,
    estimator: EtaEstimator,
    rng: StdRng,
}

impl Orchestrator {
    /// Validate the run parameters, build the schedule and set up the
    /// session. The session stays `Idle` until `run()` is awaited; any
    /// error here leaves no active session at all.
    pub fn new(
        params: RunParams,
        generator: Arc<dyn Generator>,
        evaluator: Arc<dyn Evaluator>,
        sink: Option<Arc<dyn ChatlogSink>>,
    ) -> Result<(Self, SessionHandle), ConvoGenError> {
        params.validate()?;

        let schedule = build_schedule(params.start_date, params.end_date);
        if schedule.is_empty() {
            return Err(ConvoGenError::Schedule("no working days in range".into()));
        }

        let session = Arc::new(Mutex::new(GenerationSession::new()));
        let (tx, rx) = watch::channel(Control::Run);
        let handle = SessionHandle {
            session: session.clone(),
            control: Arc::new(tx),
        };

        Ok((
            Self {
                generator,
                evaluator,
                sink,
                params,
                schedule,
                session,
                control: rx,
                estimator: EtaEstimator::new(),
                rng: StdRng::from_entropy(),
            },
            handle,
        ))
    }

    /// Fix the RNG seed, making volume/scenario draws deterministic.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Run the loop to a terminal state and return the final session.
    pub async fn run(mut self) -> Result<GenerationSession, ConvoGenError> {
        match self.drive().await {
            Ok(()) => Ok(self.session().clone()),
            Err(e) => {
                let mut s = self.session();
                s.status = SessionStatus::Failed;
                s.last_error = Some(e.to_string());
                drop(s);
                tracing::error!(error = %e, "generation run failed");
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<(), ConvoGenError> {
        let started = Instant::now();

        // Volume plan: one independent draw per work unit, fixed up front
        // so the target count is stable for percent display.
        let counts: Vec<u32> = (0..self.schedule.len())
            .map(|_| {
                self.rng
                    .gen_range(self.params.min_per_day..=self.params.max_per_day)
            })
            .collect();
        let target: u32 = counts.iter().sum();
        if target == 0 {
            return Err(ConvoGenError::Schedule("volume plan is empty".into()));
        }

        let session_id = {
            let mut s = self.session();
            s.status = SessionStatus::Running;
            s.target_count = target;
            s.started_at = Some(Utc::now());
            s.current_step = format!(
                "planned {} conversations across {} shifts",
                target,
                self.schedule.len()
            );
            s.id
        };
        tracing::info!(
            session_id = %session_id,
            units = self.schedule.len(),
            target,
            start = %self.params.start_date,
            end = %self.params.end_date,
            requested_by = %self.params.requested_by,
            "generation run started"
        );

        let schedule = self.schedule.clone();
        let mut stopped = false;
        'units: for (unit_idx, unit) in schedule.iter().enumerate() {
            for seq in 0..counts[unit_idx] {
                match self.run_slot(unit, seq, started).await {
                    SlotOutcome::Accepted | SlotOutcome::Skipped => {}
                    SlotOutcome::Stopped => {
                        stopped = true;
                        break 'units;
                    }
                }
            }
        }

        let mut s = self.session();
        s.report = Some(RunReport::from_items(&s.accepted));
        if stopped {
            s.status = SessionStatus::Stopped;
            s.current_step = "stopped by request".into();
        } else {
            s.status = SessionStatus::Completed;
            s.percent = 100.0;
            s.current_step = "completed".into();
        }
        let accepted = s.accepted.len();
        let status = s.status;
        drop(s);

        tracing::info!(accepted, %status, "generation run finished");
        Ok(())
    }

    /// Fill one planned conversation slot. Duplicate candidates re-try
    /// the same slot up to `max_duplicate_retries` times before the slot
    /// is skipped; generation failures abandon the slot immediately.
    async fn run_slot(&mut self, unit: &WorkUnit, seq: u32, started: Instant) -> SlotOutcome {
        for attempt in 0..=self.params.max_duplicate_retries {
            if self.stop_requested() {
                self.enter_stopping();
                return SlotOutcome::Stopped;
            }
            if self.wait_while_paused().await == Control::Stop {
                self.enter_stopping();
                return SlotOutcome::Stopped;
            }

            let request = self.draw_request();
            let scheduled_at = unit.shift.window_start(unit.date)
                + chrono::Duration::minutes(
                    self.rng.gen_range(0..Shift::WINDOW_MINUTES) as i64,
                );

            {
                let mut s = self.session();
                s.current_step = format!(
                    "generating {} {} conversation {} ({})",
                    unit.date,
                    unit.shift,
                    seq + 1,
                    request.scenario
                );
            }

            let generator = self.generator.clone();
            let gen_request = request.clone();
            let draft = match self
                .guarded(async move { generator.generate(&gen_request).await })
                .await
            {
                None => {
                    self.enter_stopping();
                    return SlotOutcome::Stopped;
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        date = %unit.date,
                        shift = %unit.shift,
                        seq,
                        error = %e,
                        "generation failed, slot abandoned"
                    );
                    return SlotOutcome::Skipped;
                }
                Some(Ok(draft)) => draft,
            };

            // Dedup against every accepted item in this run
            let duplicate = {
                let s = self.session();
                similarity::is_duplicate(
                    &draft.conversation_text,
                    &s.accepted,
                    self.params.similarity_threshold,
                )
            };
            if duplicate {
                tracing::debug!(
                    date = %unit.date,
                    seq,
                    attempt,
                    "near-duplicate rejected, re-attempting slot"
                );
                continue;
            }

            let mut item = self.build_item(unit, seq, scheduled_at, &request, draft);

            let evaluator = self.evaluator.clone();
            let transcript = item.text.clone();
            match self
                .guarded(async move { evaluator.evaluate(&transcript).await })
                .await
            {
                None => {
                    self.enter_stopping();
                    return SlotOutcome::Stopped;
                }
                Some(Ok(scores)) => {
                    item.scores = Some(scores);
                    item.evaluated = true;
                }
                Some(Err(e)) => {
                    // Partial failure keeps the generated content
                    tracing::warn!(
                        item_id = %item.id,
                        error = %e,
                        "evaluation failed, keeping item unevaluated"
                    );
                    self.session().last_notice =
                        Some(format!("evaluation failed for {}: {}", item.id, e));
                }
            }

            self.accept(item, started).await;
            return SlotOutcome::Accepted;
        }

        tracing::warn!(
            date = %unit.date,
            shift = %unit.shift,
            seq,
            retries = self.params.max_duplicate_retries,
            "duplicate retry budget exhausted, slot skipped"
        );
        SlotOutcome::Skipped
    }

    /// Append an accepted item, hand it to the sink and refresh all
    /// progress figures. Persistence trouble is logged and noted, never
    /// fatal.
    async fn accept(&mut self, item: GeneratedConversation, started: Instant) {
        let record = ChatlogRecord::from_item(&item, &self.params);
        let item_id = item.id.clone();

        let (percent, elapsed_ms) = {
            let mut s = self.session();
            s.accepted.push(item);
            s.completed_count += 1;
            s.percent = s.completed_count as f64 / s.target_count as f64 * 100.0;
            (s.percent, effective_elapsed_ms(started, s.paused_accumulated_ms))
        };

        if let Some(sink) = self.sink.clone() {
            let timeout = self.params.request_timeout;
            match tokio::time::timeout(timeout, sink.persist(&[record])).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(item_id = %item_id, error = %e, "persistence failed");
                    self.session().last_notice =
                        Some(format!("persistence failed for {}: {}", item_id, e));
                }
                Err(_) => {
                    tracing::warn!(item_id = %item_id, "persistence timed out");
                    self.session().last_notice =
                        Some(format!("persistence timed out for {}", item_id));
                }
            }
        }

        self.estimator.record(elapsed_ms, percent);
        let eta = self.estimator.eta_string();
        let rate = self.estimator.rate_per_sec();
        let mut s = self.session();
        s.rate_estimate = rate;
        s.eta = eta;
        tracing::debug!(
            completed = s.completed_count,
            target = s.target_count,
            percent = format!("{:.1}", s.percent),
            eta = s.eta.as_deref().unwrap_or("-"),
            "conversation accepted"
        );
    }

    fn build_item(
        &mut self,
        unit: &WorkUnit,
        seq: u32,
        scheduled_at: chrono::DateTime<Utc>,
        request: &GenerationRequest,
        draft: GeneratedDraft,
    ) -> GeneratedConversation {
        GeneratedConversation {
            id: format!(
                "{}-{}-{}-{}",
                Utc::now().timestamp_millis(),
                unit.date,
                unit.shift,
                seq
            ),
            text: draft.conversation_text,
            customer_name: draft.customer_name,
            scenario: request.scenario.clone(),
            behavior_pattern: request.behavior_pattern.clone(),
            shift: unit.shift,
            scheduled_at,
            scores: None,
            evaluated: false,
        }
    }

    fn draw_request(&mut self) -> GenerationRequest {
        let scenario = SCENARIOS[self.rng.gen_range(0..SCENARIOS.len())];
        let behavior = BEHAVIOR_PATTERNS[self.rng.gen_range(0..BEHAVIOR_PATTERNS.len())];
        GenerationRequest {
            agent_name: self.params.agent_name.clone(),
            scenario: scenario.into(),
            behavior_pattern: behavior.into(),
            min_turns: self.params.min_turns,
            max_turns: self.params.max_turns,
        }
    }

    /// Race an external call against the stop signal, under the
    /// per-call timeout. `None` means a stop interrupted the call; the
    /// in-flight request is dropped, already-accepted items are kept.
    async fn guarded<T>(
        &mut self,
        fut: impl Future<Output = Result<T, ConvoGenError>>,
    ) -> Option<Result<T, ConvoGenError>> {
        let timeout = self.params.request_timeout;
        tokio::select! {
            res = tokio::time::timeout(timeout, fut) => Some(match res {
                Ok(inner) => inner,
                Err(_) => Err(ConvoGenError::Timeout {
                    seconds: timeout.as_secs(),
                }),
            }),
            _ = stop_signal(&mut self.control) => None,
        }
    }

    /// Suspend while paused, accumulating paused time so throughput and
    /// ETA figures exclude it. Returns `Control::Stop` if a stop arrives
    /// while paused (or every handle is gone).
    async fn wait_while_paused(&mut self) -> Control {
        loop {
            // Copy the value out so no watch read guard is held across await
            let current = *self.control.borrow();
            match current {
                Control::Run => return Control::Run,
                Control::Stop => return Control::Stop,
                Control::Pause => {
                    self.set_status(SessionStatus::Paused);
                    tracing::info!("run paused");
                    let pause_started = Instant::now();
                    let changed = self.control.changed().await;
                    let paused_ms = pause_started.elapsed().as_millis() as u64;
                    self.session().paused_accumulated_ms += paused_ms;
                    if changed.is_err() {
                        return Control::Stop;
                    }
                    if *self.control.borrow() == Control::Run {
                        self.set_status(SessionStatus::Running);
                        tracing::info!(paused_ms, "run resumed");
                    }
                }
            }
        }
    }

    fn stop_requested(&self) -> bool {
        *self.control.borrow() == Control::Stop
    }

    fn enter_stopping(&self) {
        self.set_status(SessionStatus::Stopping);
    }

    fn set_status(&self, status: SessionStatus) {
        self.session().status = status;
    }

    fn session(&self) -> MutexGuard<'_, GenerationSession> {
        lock_session(&self.session)
    }
}

/// Wall-clock elapsed minus time spent paused.
fn effective_elapsed_ms(started: Instant, paused_ms: u64) -> u64 {
    (started.elapsed().as_millis() as u64).saturating_sub(paused_ms)
}

/// Resolves once a stop is requested (or the last handle is dropped).
async fn stop_signal(rx: &mut watch::Receiver<Control>) {
    loop {
        if *rx.borrow() == Control::Stop {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
