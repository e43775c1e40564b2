// src/core/types.rs — Core domain types

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::infra::errors::ConvoGenError;

/// One of the three fixed shifts a work unit can be assigned to.
/// Each shift covers a 6-hour window starting at a fixed hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shift {
    Morning,
    Evening,
    Night,
}

impl Shift {
    /// The fixed rotation cycle used by the schedule builder.
    pub const CYCLE: [Shift; 3] = [Shift::Morning, Shift::Evening, Shift::Night];

    /// Length of a shift window in minutes.
    pub const WINDOW_MINUTES: u32 = 360;

    pub fn start_hour(&self) -> u32 {
        match self {
            Shift::Morning => 8,
            Shift::Evening => 14,
            Shift::Night => 20,
        }
    }

    /// UTC timestamp of the window start on a given date.
    pub fn window_start(&self, date: NaiveDate) -> DateTime<Utc> {
        let time = NaiveTime::from_hms_opt(self.start_hour(), 0, 0)
            .unwrap_or(NaiveTime::MIN);
        Utc.from_utc_datetime(&date.and_time(time))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Shift::Morning => "morning",
            Shift::Evening => "evening",
            Shift::Night => "night",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "morning" => Some(Shift::Morning),
            "evening" => Some(Shift::Evening),
            "night" => Some(Shift::Night),
            _ => None,
        }
    }
}

impl std::fmt::Display for Shift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (date, shift) pair scheduled for conversation generation.
/// Immutable once produced by the schedule builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkUnit {
    pub date: NaiveDate,
    pub shift: Shift,
}

/// Per-attempt input to the external generator. Ephemeral.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub agent_name: String,
    pub scenario: String,
    pub behavior_pattern: String,
    pub min_turns: u8,
    pub max_turns: u8,
}

/// Quality scores attached to a conversation once evaluation succeeds.
/// Coherence, politeness and relevance are 1-5; resolution is 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationScores {
    pub coherence: u8,
    pub politeness: u8,
    pub relevance: u8,
    pub resolution: u8,
}

impl ConversationScores {
    /// CPR score: mean of coherence, politeness and relevance.
    /// Aggregate quality indicator distinct from resolution.
    pub fn cpr(&self) -> f32 {
        (self.coherence as f32 + self.politeness as f32 + self.relevance as f32) / 3.0
    }

    /// Derived customer-satisfaction percentage, used in persisted records.
    pub fn satisfaction_pct(&self) -> f32 {
        self.cpr() / 5.0 * 100.0
    }
}

/// An accepted synthetic conversation.
///
/// Either pending (no scores, `evaluated == false`) or evaluated
/// (scores present, `evaluated == true`); never partially scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedConversation {
    pub id: String,
    pub text: String,
    pub customer_name: String,
    pub scenario: String,
    pub behavior_pattern: String,
    pub shift: Shift,
    pub scheduled_at: DateTime<Utc>,
    pub scores: Option<ConversationScores>,
    pub evaluated: bool,
}

impl GeneratedConversation {
    /// Derived flag: true when an evaluated conversation was not resolved.
    pub fn escalated(&self) -> bool {
        self.scores.map(|s| s.resolution == 0).unwrap_or(false)
    }
}

/// Lifecycle of a generation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
    Stopping,
    Stopped,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Stopped | SessionStatus::Completed | SessionStatus::Failed
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Stopping => "stopping",
            SessionStatus::Stopped => "stopped",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Mutable orchestration state. Owned and exclusively mutated by the
/// orchestrator loop; observers read cloned snapshots via `SessionHandle`.
#[derive(Debug, Clone)]
pub struct GenerationSession {
    pub id: Uuid,
    pub status: SessionStatus,
    pub accepted: Vec<GeneratedConversation>,
    pub target_count: u32,
    pub completed_count: u32,
    pub percent: f64,
    /// Smoothed throughput in percent per second (EMA).
    pub rate_estimate: f64,
    /// Human-readable remaining-time estimate, e.g. "~3m 12s remaining".
    pub eta: Option<String>,
    pub current_step: String,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_accumulated_ms: u64,
    pub last_error: Option<String>,
    /// Latest non-fatal notification (persistence/evaluation trouble).
    pub last_notice: Option<String>,
    pub report: Option<RunReport>,
}

impl GenerationSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: SessionStatus::Idle,
            accepted: Vec::new(),
            target_count: 0,
            completed_count: 0,
            percent: 0.0,
            rate_estimate: 0.0,
            eta: None,
            current_step: String::new(),
            started_at: None,
            paused_accumulated_ms: 0,
            last_error: None,
            last_notice: None,
            report: None,
        }
    }
}

impl Default for GenerationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate over evaluated items, exposed to downstream consumers
/// (export, reporting) when a run ends.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub total_accepted: u32,
    pub evaluated_count: u32,
    pub escalated_count: u32,
    pub mean_cpr: f32,
    pub evaluated: Vec<GeneratedConversation>,
}

impl RunReport {
    pub fn from_items(items: &[GeneratedConversation]) -> Self {
        let evaluated: Vec<GeneratedConversation> =
            items.iter().filter(|c| c.evaluated).cloned().collect();
        let escalated_count = evaluated.iter().filter(|c| c.escalated()).count() as u32;
        let mean_cpr = if evaluated.is_empty() {
            0.0
        } else {
            evaluated
                .iter()
                .filter_map(|c| c.scores.map(|s| s.cpr()))
                .sum::<f32>()
                / evaluated.len() as f32
        };
        Self {
            total_accepted: items.len() as u32,
            evaluated_count: evaluated.len() as u32,
            escalated_count,
            mean_cpr,
            evaluated,
        }
    }
}

/// Everything a run needs beyond the collaborator handles.
/// Assembled by the CLI layer before constructing the orchestrator.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub model: String,
    pub api_key: String,
    pub requested_by: String,
    pub agent_name: String,
    pub min_per_day: u32,
    pub max_per_day: u32,
    pub min_turns: u8,
    pub max_turns: u8,
    pub similarity_threshold: f32,
    pub max_duplicate_retries: u32,
    pub request_timeout: Duration,
}

impl RunParams {
    pub fn validate(&self) -> Result<(), ConvoGenError> {
        if self.model.trim().is_empty() {
            return Err(ConvoGenError::Validation("no model selected".into()));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConvoGenError::Validation("missing API credential".into()));
        }
        if self.requested_by.trim().is_empty() {
            return Err(ConvoGenError::Validation("missing requester identity".into()));
        }
        if self.agent_name.trim().is_empty() {
            return Err(ConvoGenError::Validation("missing agent name".into()));
        }
        if self.start_date > self.end_date {
            return Err(ConvoGenError::Validation(
                "start date is after end date".into(),
            ));
        }
        if self.min_per_day < 1 || self.min_per_day > self.max_per_day {
            return Err(ConvoGenError::Validation(format!(
                "invalid per-day volume range [{}, {}]",
                self.min_per_day, self.max_per_day
            )));
        }
        if self.min_turns < 2 || self.min_turns > self.max_turns {
            return Err(ConvoGenError::Validation(format!(
                "invalid turn range [{}, {}]",
                self.min_turns, self.max_turns
            )));
        }
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(ConvoGenError::Validation(format!(
                "similarity threshold {} outside (0, 1]",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_params() -> RunParams {
        RunParams {
            start_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 6).unwrap(),
            model: "gpt-4.1-mini".into(),
            api_key: "sk-test".into(),
            requested_by: "qa-team".into(),
            agent_name: "Riley".into(),
            min_per_day: 1,
            max_per_day: 3,
            min_turns: 6,
            max_turns: 12,
            similarity_threshold: 0.8,
            max_duplicate_retries: 5,
            request_timeout: Duration::from_secs(120),
        }
    }

    // ─── Shift ──────────────────────────────────────────────────

    #[test]
    fn test_shift_cycle_order() {
        assert_eq!(
            Shift::CYCLE,
            [Shift::Morning, Shift::Evening, Shift::Night]
        );
    }

    #[test]
    fn test_shift_window_start_hours() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(Shift::Morning.window_start(date).format("%H:%M").to_string(), "08:00");
        assert_eq!(Shift::Evening.window_start(date).format("%H:%M").to_string(), "14:00");
        assert_eq!(Shift::Night.window_start(date).format("%H:%M").to_string(), "20:00");
    }

    #[test]
    fn test_shift_roundtrip() {
        for shift in Shift::CYCLE {
            assert_eq!(Shift::parse(shift.as_str()), Some(shift));
        }
        assert_eq!(Shift::parse("afternoon"), None);
    }

    // ─── ConversationScores ─────────────────────────────────────

    #[test]
    fn test_cpr_mean() {
        let s = ConversationScores {
            coherence: 4,
            politeness: 5,
            relevance: 3,
            resolution: 1,
        };
        assert!((s.cpr() - 4.0).abs() < f32::EPSILON);
        assert!((s.satisfaction_pct() - 80.0).abs() < 1e-4);
    }

    #[test]
    fn test_escalated_derivation() {
        let mut c = GeneratedConversation {
            id: "x".into(),
            text: "Customer: hi".into(),
            customer_name: "Dana".into(),
            scenario: "billing dispute".into(),
            behavior_pattern: "calm".into(),
            shift: Shift::Morning,
            scheduled_at: Utc::now(),
            scores: None,
            evaluated: false,
        };
        // Pending item is never escalated
        assert!(!c.escalated());

        c.scores = Some(ConversationScores {
            coherence: 3,
            politeness: 3,
            relevance: 3,
            resolution: 0,
        });
        c.evaluated = true;
        assert!(c.escalated());

        c.scores = Some(ConversationScores {
            coherence: 3,
            politeness: 3,
            relevance: 3,
            resolution: 1,
        });
        assert!(!c.escalated());
    }

    // ─── SessionStatus ──────────────────────────────────────────

    #[test]
    fn test_terminal_statuses() {
        assert!(SessionStatus::Stopped.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(!SessionStatus::Running.is_terminal());
        assert!(!SessionStatus::Paused.is_terminal());
        assert!(!SessionStatus::Stopping.is_terminal());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SessionStatus::Idle.to_string(), "idle");
        assert_eq!(SessionStatus::Stopping.to_string(), "stopping");
    }

    // ─── RunReport ──────────────────────────────────────────────

    #[test]
    fn test_report_aggregates() {
        let base = GeneratedConversation {
            id: "a".into(),
            text: "t".into(),
            customer_name: "n".into(),
            scenario: "s".into(),
            behavior_pattern: "b".into(),
            shift: Shift::Night,
            scheduled_at: Utc::now(),
            scores: None,
            evaluated: false,
        };
        let mut resolved = base.clone();
        resolved.scores = Some(ConversationScores {
            coherence: 5,
            politeness: 5,
            relevance: 5,
            resolution: 1,
        });
        resolved.evaluated = true;
        let mut escalated = base.clone();
        escalated.scores = Some(ConversationScores {
            coherence: 3,
            politeness: 3,
            relevance: 3,
            resolution: 0,
        });
        escalated.evaluated = true;

        let report = RunReport::from_items(&[base, resolved, escalated]);
        assert_eq!(report.total_accepted, 3);
        assert_eq!(report.evaluated_count, 2);
        assert_eq!(report.escalated_count, 1);
        assert!((report.mean_cpr - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_report_empty() {
        let report = RunReport::from_items(&[]);
        assert_eq!(report.total_accepted, 0);
        assert_eq!(report.mean_cpr, 0.0);
    }

    // ─── RunParams validation ───────────────────────────────────

    #[test]
    fn test_valid_params_pass() {
        assert!(valid_params().validate().is_ok());
    }

    #[test]
    fn test_missing_model_rejected() {
        let mut p = valid_params();
        p.model = "  ".into();
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("no model selected"));
    }

    #[test]
    fn test_missing_credential_rejected() {
        let mut p = valid_params();
        p.api_key = String::new();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_missing_requester_rejected() {
        let mut p = valid_params();
        p.requested_by = String::new();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_inverted_dates_rejected() {
        let mut p = valid_params();
        std::mem::swap(&mut p.start_date, &mut p.end_date);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_zero_min_per_day_rejected() {
        let mut p = valid_params();
        p.min_per_day = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_threshold_bounds() {
        let mut p = valid_params();
        p.similarity_threshold = 0.0;
        assert!(p.validate().is_err());
        p.similarity_threshold = 1.0;
        assert!(p.validate().is_ok());
        p.similarity_threshold = 1.2;
        assert!(p.validate().is_err());
    }
}
