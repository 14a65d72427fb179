//! Structured logging functions

use tracing::{debug, error, info, warn};

/// Log a derived candidate that was already taken in the store
pub fn log_allocation_collision(attempt: u32, numeric_id: u64, uuid: &str, uuid_taken: bool) {
    warn!(
        attempt = attempt,
        numeric_id = numeric_id,
        uuid = %uuid,
        uuid_taken = uuid_taken,
        "Identifier candidate collided, retrying"
    );
}

/// Log a successfully allocated identifier pair
pub fn log_allocation_success(attempts_used: u32, numeric_id: u64, uuid: &str) {
    debug!(
        attempts_used = attempts_used,
        numeric_id = numeric_id,
        uuid = %uuid,
        "Allocated identifier pair"
    );
}

/// Log a spent attempt budget
pub fn log_allocation_exhausted(max_attempts: u32) {
    error!(
        max_attempts = max_attempts,
        "Identifier allocation exhausted its attempt budget"
    );
}

/// Log a write rejected by a uniqueness constraint on an identifier column
pub fn log_write_conflict(constraint: &str, numeric_id: u64, remaining_attempts: u32) {
    warn!(
        constraint = %constraint,
        numeric_id = numeric_id,
        remaining_attempts = remaining_attempts,
        "Identifier rejected at write time, allocating again"
    );
}

/// Log a completed account registration
pub fn log_account_registered(user_id: u64, uuid: &str, username: &str) {
    info!(
        user_id = user_id,
        uuid = %uuid,
        username = %username,
        "Account registered"
    );
}

/// Log an event that could not be handed to the publisher
pub fn log_event_publish_failure(event_type: &str, user_id: u64, reason: &str) {
    error!(
        event_type = %event_type,
        user_id = user_id,
        reason = %reason,
        "Failed to publish user event"
    );
}
