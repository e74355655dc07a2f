use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

lazy_static! {
    // ── Event counters (increment on each event) ────────────────────────────
    pub static ref SLEEP_TRANSITIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_sleep_transitions_total",
        "Sleep session start/end attempts by outcome",
        &["transition", "outcome"]
    ).unwrap();

    pub static ref RECORDS_CREATED_COUNTER: CounterVec = register_counter_vec!(
        "api_records_created_total",
        "Feeding, sleep and waste records created",
        &["kind"]
    ).unwrap();

    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by status",
        &["status"]
    ).unwrap();

    pub static ref INVITATIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_invitations_total",
        "Family invitations by event",
        &["event"]
    ).unwrap();
}
