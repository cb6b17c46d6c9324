//! Clock port - wall time and sleeping
//!
//! The lock busy-wait sleeps for real minutes in production; tests drive a
//! manual clock instead so waiting scenarios run instantly.

use std::time::Duration;

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn sleep(&self, duration: Duration);
}
