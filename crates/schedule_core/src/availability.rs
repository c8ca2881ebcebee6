use std::collections::BTreeSet;

use chrono::NaiveDate;
use shared::{
    domain::{fold_name, AvailabilityRecord, Volunteer, VolunteerId},
    error::ScheduleError,
};

/// Maps each volunteer to the set of event dates they can serve.
///
/// Volunteer names are unique case-insensitively; lookups fold case the same
/// way. Records are never hard-deleted, so a volunteer with no remaining
/// dates stays on the roster with an empty set.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityLedger {
    records: Vec<AvailabilityRecord>,
}

impl AvailabilityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<AvailabilityRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[AvailabilityRecord] {
        &self.records
    }

    /// Creates an empty-availability record for a new volunteer.
    pub fn add_volunteer(&mut self, name: &str) -> Result<Volunteer, ScheduleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ScheduleError::InvalidArgument(
                "volunteer name must not be blank".into(),
            ));
        }
        if self.find_index(name).is_some() {
            return Err(ScheduleError::Duplicate(name.to_string()));
        }

        let record = AvailabilityRecord::empty(VolunteerId::fresh(), name);
        let volunteer = Volunteer {
            id: record.volunteer_id,
            name: record.volunteer_name.clone(),
        };
        self.records.push(record);
        Ok(volunteer)
    }

    /// Upserts the full date set for a volunteer. An existing record (matched
    /// case-insensitively) keeps its id and stored casing; otherwise a new
    /// record is created with a fresh id. Returns the canonical record.
    pub fn set_availability(
        &mut self,
        name: &str,
        dates: BTreeSet<NaiveDate>,
    ) -> Result<&AvailabilityRecord, ScheduleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ScheduleError::InvalidArgument(
                "volunteer name must not be blank".into(),
            ));
        }

        let index = match self.find_index(name) {
            Some(index) => index,
            None => {
                self.records
                    .push(AvailabilityRecord::empty(VolunteerId::fresh(), name));
                self.records.len() - 1
            }
        };
        self.records[index].dates = dates;
        Ok(&self.records[index])
    }

    /// Removes one date from one volunteer's set. Removing a date the
    /// volunteer never offered is a no-op; an unknown volunteer is an error.
    /// Returns the canonical stored name for cascading.
    pub fn remove_date(&mut self, name: &str, date: NaiveDate) -> Result<String, ScheduleError> {
        let index = self
            .find_index(name)
            .ok_or_else(|| ScheduleError::NotFound(format!("volunteer '{}'", name.trim())))?;
        self.records[index].dates.remove(&date);
        Ok(self.records[index].volunteer_name.clone())
    }

    /// Cascade helper: drops `date` from every volunteer's set.
    pub fn remove_all_references_to_date(&mut self, date: NaiveDate) {
        for record in &mut self.records {
            record.dates.remove(&date);
        }
    }

    /// Cascade helper: rewrites `old` to `new` in every volunteer's set.
    pub fn rename_date_references(&mut self, old: NaiveDate, new: NaiveDate) {
        for record in &mut self.records {
            if record.dates.remove(&old) {
                record.dates.insert(new);
            }
        }
    }

    /// Names of everyone available on `date`, in roster order.
    pub fn who_is_available(&self, date: NaiveDate) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| record.dates.contains(&date))
            .map(|record| record.volunteer_name.clone())
            .collect()
    }

    pub fn dates_for(&self, name: &str) -> Option<&BTreeSet<NaiveDate>> {
        self.find_index(name).map(|index| &self.records[index].dates)
    }

    /// Resync merge helper: volunteers known to the remote roster but absent
    /// from the flattened availability rows still get an empty record.
    pub fn ensure_volunteer(&mut self, volunteer: &Volunteer) {
        if self.find_index(&volunteer.name).is_none() {
            self.records
                .push(AvailabilityRecord::empty(volunteer.id, volunteer.name.clone()));
        }
    }

    fn find_index(&self, name: &str) -> Option<usize> {
        let folded = fold_name(name);
        self.records
            .iter()
            .position(|record| fold_name(&record.volunteer_name) == folded)
    }
}

#[cfg(test)]
#[path = "tests/availability_tests.rs"]
mod tests;
