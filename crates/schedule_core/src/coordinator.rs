use std::collections::BTreeSet;

use chrono::NaiveDate;
use shared::{
    domain::{AllocationRecord, AvailabilityRecord, EventDate, Role, Volunteer},
    error::ScheduleError,
};

use crate::{
    allocation::AllocationLedger, availability::AvailabilityLedger, config::ScheduleConfig,
    window::DateWindowManager,
};

/// Sequences every composite operation across the three ledgers so each user
/// action is atomic with respect to all of them. All mutation goes through
/// `&mut self`; callers serialize access (the sync gateway holds a single
/// mutex over the coordinator for the whole mutate-and-submit section).
#[derive(Debug, Clone)]
pub struct ConsistencyCoordinator {
    config: ScheduleConfig,
    window: DateWindowManager,
    availability: AvailabilityLedger,
    allocations: AllocationLedger,
}

/// What a composite operation changed, in enough detail for the sync layer
/// to build the equivalent remote write(s).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedMutation {
    EventCompleted {
        date_id: NaiveDate,
        completed_date: NaiveDate,
    },
    DateRenamed {
        old_value: NaiveDate,
        new_value: NaiveDate,
        dates: Vec<EventDate>,
    },
    VolunteerAdded {
        volunteer: Volunteer,
    },
    AvailabilitySet {
        volunteer_name: String,
        dates: Vec<NaiveDate>,
    },
    AvailabilityDateRemoved {
        volunteer_name: String,
        date: NaiveDate,
        cascaded_allocations: Vec<AllocationRecord>,
    },
    Allocated {
        record: AllocationRecord,
    },
    Deallocated {
        date: NaiveDate,
        role: Role,
        person: String,
    },
}

/// Whole-state view used for full resync and by the export path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSnapshot {
    pub dates: Vec<EventDate>,
    pub availability: Vec<AvailabilityRecord>,
    pub allocations: Vec<AllocationRecord>,
}

/// Derived per-date read model. Every configured role is always present in
/// `allocated_by_role`, even with nobody allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateProjection {
    pub date: NaiveDate,
    pub available_unallocated: Vec<String>,
    pub allocated_by_role: Vec<(Role, Vec<String>)>,
}

impl ConsistencyCoordinator {
    /// Fresh state: a generated horizon and empty ledgers.
    pub fn new(config: ScheduleConfig, start: NaiveDate) -> Self {
        let window = DateWindowManager::generate_horizon(&config, start);
        Self {
            config,
            window,
            availability: AvailabilityLedger::new(),
            allocations: AllocationLedger::new(),
        }
    }

    /// Rebuilds the whole state from the four remote collections. Volunteers
    /// with no availability rows still appear, with an empty date set.
    pub fn from_remote(
        config: ScheduleConfig,
        dates: Vec<EventDate>,
        volunteers: &[Volunteer],
        availability: Vec<AvailabilityRecord>,
        allocations: Vec<AllocationRecord>,
    ) -> Self {
        let window = DateWindowManager::from_remote(&config, dates);
        let mut availability = AvailabilityLedger::from_records(availability);
        for volunteer in volunteers {
            availability.ensure_volunteer(volunteer);
        }
        Self {
            config,
            window,
            availability,
            allocations: AllocationLedger::from_records(allocations),
        }
    }

    /// Replaces local state in place (full resync after a failed remote write).
    pub fn restore(
        &mut self,
        dates: Vec<EventDate>,
        volunteers: &[Volunteer],
        availability: Vec<AvailabilityRecord>,
        allocations: Vec<AllocationRecord>,
    ) {
        *self = Self::from_remote(
            self.config.clone(),
            dates,
            volunteers,
            availability,
            allocations,
        );
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    pub fn window(&self) -> &DateWindowManager {
        &self.window
    }

    pub fn availability(&self) -> &AvailabilityLedger {
        &self.availability
    }

    pub fn allocations(&self) -> &AllocationLedger {
        &self.allocations
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            dates: self.window.active().to_vec(),
            availability: self.availability.records().to_vec(),
            allocations: self.allocations.records().to_vec(),
        }
    }

    /// Roster view: one volunteer per availability record.
    pub fn volunteers(&self) -> Vec<Volunteer> {
        self.availability
            .records()
            .iter()
            .map(|record| Volunteer {
                id: record.volunteer_id,
                name: record.volunteer_name.clone(),
            })
            .collect()
    }

    /// Rotates the completed date out of the window, then cascades: no
    /// availability entry and no allocation may keep referencing it.
    pub fn mark_event_complete(
        &mut self,
        date_id: NaiveDate,
    ) -> Result<AppliedMutation, ScheduleError> {
        let completed = self.window.complete_date(date_id)?;
        self.availability.remove_all_references_to_date(completed);
        self.allocations.remove_all_for_date(completed);
        Ok(AppliedMutation::EventCompleted {
            date_id,
            completed_date: completed,
        })
    }

    /// Moves an event to a new date and rewrites every reference to the old
    /// value in both dependent ledgers.
    pub fn rename_date(
        &mut self,
        date_id: NaiveDate,
        new_value: NaiveDate,
    ) -> Result<AppliedMutation, ScheduleError> {
        let old_value = self.window.rename_date(date_id, new_value)?;
        self.availability.rename_date_references(old_value, new_value);
        self.allocations.rename_date_references(old_value, new_value);
        Ok(AppliedMutation::DateRenamed {
            old_value,
            new_value,
            dates: self.window.active().to_vec(),
        })
    }

    pub fn add_volunteer(&mut self, name: &str) -> Result<AppliedMutation, ScheduleError> {
        let volunteer = self.availability.add_volunteer(name)?;
        Ok(AppliedMutation::VolunteerAdded { volunteer })
    }

    /// Upserts a volunteer's date set. Every date must belong to the active
    /// window. No cascade: narrowing availability here does not touch
    /// allocations, which are removed only through
    /// [`Self::remove_volunteer_availability`].
    pub fn set_availability(
        &mut self,
        name: &str,
        dates: BTreeSet<NaiveDate>,
    ) -> Result<AppliedMutation, ScheduleError> {
        if let Some(unknown) = dates.iter().find(|date| !self.window.contains(**date)) {
            return Err(ScheduleError::InvalidArgument(format!(
                "date {unknown} is not in the active window"
            )));
        }
        let record = self.availability.set_availability(name, dates)?;
        Ok(AppliedMutation::AvailabilitySet {
            volunteer_name: record.volunteer_name.clone(),
            dates: record.dates.iter().copied().collect(),
        })
    }

    /// Revokes one volunteer's availability for one date, cascading away any
    /// allocation of that person on that date.
    pub fn remove_volunteer_availability(
        &mut self,
        name: &str,
        date: NaiveDate,
    ) -> Result<AppliedMutation, ScheduleError> {
        let canonical = self.availability.remove_date(name, date)?;
        let cascaded = self
            .allocations
            .remove_all_for_person_and_date(&canonical, date);
        Ok(AppliedMutation::AvailabilityDateRemoved {
            volunteer_name: canonical,
            date,
            cascaded_allocations: cascaded,
        })
    }

    /// Assigns a person to a role on an active date. Availability is not
    /// checked and double-role assignment is not prevented: the coordinator
    /// may override.
    pub fn allocate(
        &mut self,
        date: NaiveDate,
        role: Role,
        person: &str,
    ) -> Result<AppliedMutation, ScheduleError> {
        let person = person.trim();
        if person.is_empty() {
            return Err(ScheduleError::InvalidArgument(
                "person must not be blank".into(),
            ));
        }
        if !self.window.contains(date) {
            return Err(ScheduleError::NotFound(format!("event date {date}")));
        }
        let record = self.allocations.allocate(date, role, person);
        Ok(AppliedMutation::Allocated { record })
    }

    /// Removes the matching assignment(s); calling again is a no-op.
    pub fn deallocate(&mut self, date: NaiveDate, role: Role, person: &str) -> AppliedMutation {
        self.allocations.deallocate(date, role, person);
        AppliedMutation::Deallocated {
            date,
            role,
            person: person.to_string(),
        }
    }

    /// Available-but-unallocated volunteers and the allocations of `date`
    /// grouped by role, with all configured roles always represented.
    pub fn project_date(&self, date: NaiveDate) -> DateProjection {
        let allocated = self.allocations.who_is_allocated(date);
        let available_unallocated = self
            .availability
            .who_is_available(date)
            .into_iter()
            .filter(|name| !allocated.contains(name))
            .collect();

        let records = self.allocations.records_for_date(date);
        let allocated_by_role = self
            .config
            .roles
            .iter()
            .map(|role| {
                let people = records
                    .iter()
                    .filter(|record| record.role == *role)
                    .map(|record| record.person.clone())
                    .collect();
                (*role, people)
            })
            .collect();

        DateProjection {
            date,
            available_unallocated,
            allocated_by_role,
        }
    }
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
