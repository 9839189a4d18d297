use chrono::{DateTime, Local, NaiveDate, Utc};

/// Source of "today". Every caller asks at the moment it needs the date so
/// an operation that crosses midnight sees the new day.
pub trait Clock {
    /// The user's calendar day.
    fn today(&self) -> NaiveDate;
    fn now(&self) -> DateTime<Utc>;
}

/// Local calendar day of the machine running the CLI.
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub use fixed::FixedClock;
