use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScheduleError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn fresh() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(VolunteerId);
id_newtype!(AllocationId);

/// The five fixed duties a volunteer can be assigned to on an event date.
/// The set is closed; it is not configurable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Cuscuz Team")]
    CuscuzTeam,
    #[serde(rename = "Exhibitor")]
    Exhibitor,
    #[serde(rename = "Reception")]
    Reception,
    #[serde(rename = "Hall")]
    Hall,
    #[serde(rename = "Children's Outreach")]
    ChildrensOutreach,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::CuscuzTeam,
        Role::Exhibitor,
        Role::Reception,
        Role::Hall,
        Role::ChildrensOutreach,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Role::CuscuzTeam => "Cuscuz Team",
            Role::Exhibitor => "Exhibitor",
            Role::Reception => "Reception",
            Role::Hall => "Hall",
            Role::ChildrensOutreach => "Children's Outreach",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.label() == s)
            .ok_or_else(|| ScheduleError::InvalidArgument(format!("unknown role '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventDateStatus {
    Active,
    Completed,
}

/// One slot in the rolling event window. While active, the calendar date is
/// its own identifier: `id == date`. Renaming changes both fields together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDate {
    pub id: NaiveDate,
    pub date: NaiveDate,
    pub status: EventDateStatus,
}

impl EventDate {
    pub fn active(date: NaiveDate) -> Self {
        Self {
            id: date,
            date,
            status: EventDateStatus::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volunteer {
    pub id: VolunteerId,
    pub name: String,
}

/// One record per volunteer. Never hard-deleted: an empty date set is valid
/// and doubles as the bare roster entry for a volunteer with no availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub volunteer_id: VolunteerId,
    pub volunteer_name: String,
    pub dates: BTreeSet<NaiveDate>,
}

impl AvailabilityRecord {
    pub fn empty(volunteer_id: VolunteerId, volunteer_name: impl Into<String>) -> Self {
        Self {
            volunteer_id,
            volunteer_name: volunteer_name.into(),
            dates: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub id: AllocationId,
    pub date: NaiveDate,
    #[serde(rename = "function")]
    pub role: Role,
    pub person: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessRole {
    Volunteer,
    Coordinator,
}

/// Shared-secret access keys, loaded once at startup and passed explicitly
/// to whatever layer gates coordinator-only operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessKeys {
    pub volunteer: String,
    pub coordinator: String,
}

impl AccessKeys {
    pub fn resolve(&self, key: &str) -> Option<AccessRole> {
        if key == self.volunteer {
            Some(AccessRole::Volunteer)
        } else if key == self.coordinator {
            Some(AccessRole::Coordinator)
        } else {
            None
        }
    }
}

/// Case-folded form used for volunteer name uniqueness and lookups.
pub fn fold_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
