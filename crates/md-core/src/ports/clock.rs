use chrono::{DateTime, Utc};

pub trait ClockPort: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}
