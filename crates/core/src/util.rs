use chrono::{Local, NaiveDateTime};
use ulid::Ulid;

/// Returns the current wall-clock time in the display's local timezone.
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Generates a new session id, one per mount of a display.
pub fn new_session_id() -> Ulid {
    Ulid::new()
}
