use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AllocationId, AllocationRecord, AvailabilityRecord, EventDate, EventDateStatus, Role,
    Volunteer, VolunteerId,
};

// ---------------------------------------------------------------------------
// Remote store surface: request/response bodies.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatesResponse {
    pub data: Vec<EventDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolunteersResponse {
    pub data: Vec<Volunteer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub data: Vec<AvailabilityRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationsResponse {
    pub data: Vec<AllocationRecord>,
}

/// Flattened relational form: one row per volunteer x date. Consumers group
/// rows back into [`AvailabilityRecord`]s with [`group_availability_rows`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRow {
    pub volunteer_id: VolunteerId,
    pub volunteer_name: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDatesRequest {
    pub dates: Vec<EventDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkEventCompleteRequest {
    pub date_id: NaiveDate,
    pub completed_date: NaiveDate,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolunteersAction {
    Add,
}

/// `action: "add"` carries a single volunteer; with the action omitted the
/// request replaces the whole volunteers sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateVolunteersRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<VolunteersAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volunteer: Option<Volunteer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volunteers: Option<Vec<Volunteer>>,
}

impl UpdateVolunteersRequest {
    pub fn add(volunteer: Volunteer) -> Self {
        Self {
            action: Some(VolunteersAction::Add),
            volunteer: Some(volunteer),
            volunteers: None,
        }
    }

    pub fn replace(volunteers: Vec<Volunteer>) -> Self {
        Self {
            action: None,
            volunteer: None,
            volunteers: Some(volunteers),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum UpdateAvailabilityRequest {
    UpdateVolunteer {
        volunteer_name: String,
        dates: Vec<NaiveDate>,
        timestamp: DateTime<Utc>,
    },
    RemoveDate {
        volunteer_name: String,
        date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationWrite {
    pub date: NaiveDate,
    #[serde(rename = "function")]
    pub role: Role,
    pub person: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UpdateAllocationsRequest {
    Allocate { allocation: AllocationWrite },
    Deallocate { allocation: AllocationWrite },
}

// ---------------------------------------------------------------------------
// Sheets-style row formats (export/import).
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateSheetRow {
    pub id: NaiveDate,
    pub date: NaiveDate,
    pub status: EventDateStatus,
    pub created_at: DateTime<Utc>,
}

impl DateSheetRow {
    pub fn from_event(entry: &EventDate, created_at: DateTime<Utc>) -> Self {
        Self {
            id: entry.id,
            date: entry.date,
            status: entry.status,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolunteerSheetRow {
    pub id: VolunteerId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl VolunteerSheetRow {
    pub fn from_volunteer(volunteer: &Volunteer, created_at: DateTime<Utc>) -> Self {
        Self {
            id: volunteer.id,
            name: volunteer.name.clone(),
            created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySheetRow {
    pub volunteer_id: VolunteerId,
    pub volunteer_name: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl AvailabilitySheetRow {
    pub fn from_row(row: &AvailabilityRow, created_at: DateTime<Utc>) -> Self {
        Self {
            volunteer_id: row.volunteer_id,
            volunteer_name: row.volunteer_name.clone(),
            date: row.date,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationSheetRow {
    pub id: AllocationId,
    pub date: NaiveDate,
    #[serde(rename = "function")]
    pub role: Role,
    pub person: String,
    pub created_at: DateTime<Utc>,
}

impl AllocationSheetRow {
    pub fn from_record(record: &AllocationRecord, created_at: DateTime<Utc>) -> Self {
        Self {
            id: record.id,
            date: record.date,
            role: record.role,
            person: record.person.clone(),
            created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Row grouping/flattening.
// ---------------------------------------------------------------------------

/// Groups flattened availability rows by volunteer name, preserving the order
/// in which volunteers first appear.
pub fn group_availability_rows(rows: Vec<AvailabilityRow>) -> Vec<AvailabilityRecord> {
    let mut records: Vec<AvailabilityRecord> = Vec::new();
    for row in rows {
        match records
            .iter_mut()
            .find(|record| record.volunteer_name == row.volunteer_name)
        {
            Some(record) => {
                record.dates.insert(row.date);
            }
            None => {
                let mut record = AvailabilityRecord::empty(row.volunteer_id, row.volunteer_name);
                record.dates.insert(row.date);
                records.push(record);
            }
        }
    }
    records
}

pub fn flatten_availability(records: &[AvailabilityRecord]) -> Vec<AvailabilityRow> {
    records
        .iter()
        .flat_map(|record| {
            record.dates.iter().map(|date| AvailabilityRow {
                volunteer_id: record.volunteer_id,
                volunteer_name: record.volunteer_name.clone(),
                date: *date,
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
