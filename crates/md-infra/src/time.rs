use chrono::{DateTime, Utc};

use md_core::ports::ClockPort;

pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
