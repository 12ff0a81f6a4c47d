use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix of every metric registered below
pub const DEFAULT_NAMESPACE: &str = "ledger_wizard";

lazy_static! {
    // ═══════════════════════════════════════════════════════════════════════════
    // SESSION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Sessions started, by branch variant
    pub static ref SESSIONS_STARTED: IntCounterVec = register_int_counter_vec!(
        "ledger_wizard_sessions_started_total",
        "Total number of wizard sessions started",
        &["variant"]
    )
    .unwrap();

    /// Sessions that walked past their last stage
    pub static ref SESSIONS_COMPLETED: IntCounter = register_int_counter!(
        "ledger_wizard_sessions_completed_total",
        "Total number of wizard sessions completed"
    )
    .unwrap();

    /// Sessions torn down before completion
    pub static ref SESSIONS_ABANDONED: IntCounter = register_int_counter!(
        "ledger_wizard_sessions_abandoned_total",
        "Total number of wizard sessions abandoned"
    )
    .unwrap();

    /// Sessions ended by a terminal failure, by reason
    pub static ref SESSIONS_FAILED: IntCounterVec = register_int_counter_vec!(
        "ledger_wizard_sessions_failed_total",
        "Total number of wizard sessions that failed",
        &["reason"]
    )
    .unwrap();

    /// Current number of open sessions
    pub static ref ACTIVE_SESSIONS: IntGauge = register_int_gauge!(
        "ledger_wizard_sessions_active",
        "Current number of open wizard sessions"
    )
    .unwrap();

    /// Stages entered, by stage kind
    pub static ref STAGE_TRANSITIONS: IntCounterVec = register_int_counter_vec!(
        "ledger_wizard_stage_transitions_total",
        "Total number of stages entered",
        &["kind"]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIRMATION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Resolved confirmation attempts, by outcome and detection channel
    pub static ref CONFIRMATIONS: IntCounterVec = register_int_counter_vec!(
        "ledger_wizard_confirmations_total",
        "Total confirmation attempts resolved",
        &["outcome", "channel"]
    )
    .unwrap();

    /// Manual checks consumed per resolved attempt
    pub static ref CONFIRMATION_CHECKS: Histogram = register_histogram!(
        "ledger_wizard_confirmation_checks",
        "Manual checks consumed per confirmation attempt",
        vec![0.0, 1.0, 2.0, 3.0, 5.0, 10.0]
    )
    .unwrap();

    /// Time from submission to resolution (in milliseconds)
    pub static ref CONFIRMATION_LATENCY: Histogram = register_histogram!(
        "ledger_wizard_confirmation_latency_ms",
        "Confirmation latency in milliseconds",
        vec![500.0, 1000.0, 2000.0, 5000.0, 12000.0, 17000.0, 30000.0, 60000.0]
    )
    .unwrap();

    /// Remote state query failures seen in logs, by severity
    pub static ref QUERY_ERRORS: IntCounterVec = register_int_counter_vec!(
        "ledger_wizard_query_errors_total",
        "Total remote state query failures",
        &["severity"]
    )
    .unwrap();
}
