/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Reservations are placed on a calendar date, separate from the slot's
/// time-of-day bounds.
pub type CalendarDate = chrono::NaiveDate;
