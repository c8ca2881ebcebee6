use chrono::NaiveDate;
use shared::domain::{AllocationId, AllocationRecord, Role};

/// The set of (date, role, person) assignments.
///
/// No uniqueness constraint applies: a role may hold several people on one
/// date, and one person may hold several roles.
#[derive(Debug, Clone, Default)]
pub struct AllocationLedger {
    records: Vec<AllocationRecord>,
}

impl AllocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<AllocationRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[AllocationRecord] {
        &self.records
    }

    pub fn allocate(&mut self, date: NaiveDate, role: Role, person: &str) -> AllocationRecord {
        let record = AllocationRecord {
            id: AllocationId::fresh(),
            date,
            role,
            person: person.to_string(),
        };
        self.records.push(record.clone());
        record
    }

    /// Removes records matching all three fields exactly. A second call with
    /// the same arguments is a no-op, not an error.
    pub fn deallocate(&mut self, date: NaiveDate, role: Role, person: &str) -> usize {
        self.retain_returning_removed(|record| {
            !(record.date == date && record.role == role && record.person == person)
        })
        .len()
    }

    /// Cascade on date completion/removal.
    pub fn remove_all_for_date(&mut self, date: NaiveDate) -> Vec<AllocationRecord> {
        self.retain_returning_removed(|record| record.date != date)
    }

    /// Cascade when a volunteer's availability for `date` is revoked.
    pub fn remove_all_for_person_and_date(
        &mut self,
        person: &str,
        date: NaiveDate,
    ) -> Vec<AllocationRecord> {
        self.retain_returning_removed(|record| {
            !(record.person == person && record.date == date)
        })
    }

    /// Cascade on date rename.
    pub fn rename_date_references(&mut self, old: NaiveDate, new: NaiveDate) -> usize {
        let mut rewritten = 0;
        for record in &mut self.records {
            if record.date == old {
                record.date = new;
                rewritten += 1;
            }
        }
        rewritten
    }

    pub fn who_is_allocated(&self, date: NaiveDate) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| record.date == date)
            .map(|record| record.person.clone())
            .collect()
    }

    pub fn records_for_date(&self, date: NaiveDate) -> Vec<&AllocationRecord> {
        self.records
            .iter()
            .filter(|record| record.date == date)
            .collect()
    }

    fn retain_returning_removed(
        &mut self,
        keep: impl Fn(&AllocationRecord) -> bool,
    ) -> Vec<AllocationRecord> {
        let mut removed = Vec::new();
        self.records.retain(|record| {
            if keep(record) {
                true
            } else {
                removed.push(record.clone());
                false
            }
        });
        removed
    }
}

#[cfg(test)]
#[path = "tests/allocation_tests.rs"]
mod tests;
