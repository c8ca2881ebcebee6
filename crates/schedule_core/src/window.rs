use chrono::{Datelike, Duration, NaiveDate, Weekday};
use shared::{
    domain::{EventDate, EventDateStatus},
    error::ScheduleError,
};

use crate::config::ScheduleConfig;

/// Owns the rolling set of active event dates and the rotation algorithm.
///
/// The window always holds exactly `window_size` active dates, sorted
/// ascending. Completing a date removes it and appends a new one past the
/// current maximum, so the cardinality is invariant across rotations.
#[derive(Debug, Clone)]
pub struct DateWindowManager {
    interval: Duration,
    dates: Vec<EventDate>,
}

impl DateWindowManager {
    /// Generates a fresh horizon of `window_size` dates at `interval_days`
    /// spacing, anchored on the first `event_weekday` strictly after `start`.
    /// A `start` that already falls on the event weekday anchors one week
    /// later so the window never contains a same-day, already-elapsed slot.
    pub fn generate_horizon(config: &ScheduleConfig, start: NaiveDate) -> Self {
        let anchor = next_weekday_after(start, config.event_weekday);
        let interval = Duration::days(config.interval_days);
        let dates = (0..config.window_size)
            .map(|slot| EventDate::active(anchor + interval * slot as i32))
            .collect();
        Self { interval, dates }
    }

    /// Rebuilds the window from remotely stored dates. Only active entries
    /// participate in the window; they are re-sorted ascending.
    pub fn from_remote(config: &ScheduleConfig, dates: Vec<EventDate>) -> Self {
        let mut dates: Vec<EventDate> = dates
            .into_iter()
            .filter(|entry| entry.status == EventDateStatus::Active)
            .collect();
        dates.sort_by_key(|entry| entry.date);
        Self {
            interval: Duration::days(config.interval_days),
            dates,
        }
    }

    pub fn active(&self) -> &[EventDate] {
        &self.dates
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.iter().any(|entry| entry.id == date)
    }

    /// Removes the completed date from the window and appends a replacement
    /// at `max(remaining) + interval`. Returns the removed date value so the
    /// caller can cascade into the other ledgers.
    pub fn complete_date(&mut self, date_id: NaiveDate) -> Result<NaiveDate, ScheduleError> {
        let index = self
            .dates
            .iter()
            .position(|entry| entry.id == date_id)
            .ok_or_else(|| ScheduleError::NotFound(format!("event date {date_id}")))?;
        let completed = self.dates.remove(index);

        let last = self
            .dates
            .iter()
            .map(|entry| entry.date)
            .max()
            .unwrap_or(completed.date);
        self.dates.push(EventDate::active(last + self.interval));
        self.sort();
        Ok(completed.date)
    }

    /// Moves an event to a new calendar date, changing `id` and `date`
    /// together. Returns the old date value for cascading.
    pub fn rename_date(
        &mut self,
        date_id: NaiveDate,
        new_value: NaiveDate,
    ) -> Result<NaiveDate, ScheduleError> {
        if self
            .dates
            .iter()
            .any(|entry| entry.id == new_value && entry.id != date_id)
        {
            return Err(ScheduleError::Conflict(format!(
                "event date {new_value} already exists"
            )));
        }
        let entry = self
            .dates
            .iter_mut()
            .find(|entry| entry.id == date_id)
            .ok_or_else(|| ScheduleError::NotFound(format!("event date {date_id}")))?;

        let old = entry.date;
        entry.id = new_value;
        entry.date = new_value;
        self.sort();
        Ok(old)
    }

    fn sort(&mut self) {
        self.dates.sort_by_key(|entry| entry.date);
    }
}

/// First occurrence of `weekday` strictly after `start`.
fn next_weekday_after(start: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (weekday.num_days_from_monday() as i64
        - start.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    let ahead = if ahead == 0 { 7 } else { ahead };
    start + Duration::days(ahead)
}

#[cfg(test)]
#[path = "tests/window_tests.rs"]
mod tests;
