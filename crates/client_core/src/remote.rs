use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use shared::{
    domain::{AllocationRecord, EventDate, Volunteer},
    protocol::{
        AllocationWrite, AllocationsResponse, AvailabilityResponse, AvailabilityRow,
        DatesResponse, MarkEventCompleteRequest, UpdateAllocationsRequest,
        UpdateAvailabilityRequest, UpdateDatesRequest, UpdateVolunteersRequest,
        VolunteersResponse,
    },
};
use url::Url;

/// Upper bound on every remote call; a timeout is treated as a write failure
/// and goes through the same full-resync path.
pub const REMOTE_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The remote authoritative store, at its wire surface. The gateway is the
/// only caller.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get_dates(&self) -> Result<Vec<EventDate>>;
    async fn update_dates(&self, dates: &[EventDate]) -> Result<()>;
    async fn mark_event_complete(
        &self,
        date_id: NaiveDate,
        completed_date: NaiveDate,
        timestamp: DateTime<Utc>,
    ) -> Result<()>;
    async fn get_volunteers(&self) -> Result<Vec<Volunteer>>;
    async fn add_volunteer(&self, volunteer: &Volunteer) -> Result<()>;
    async fn get_availability(&self) -> Result<Vec<AvailabilityRow>>;
    async fn update_volunteer_availability(
        &self,
        volunteer_name: &str,
        dates: &[NaiveDate],
        timestamp: DateTime<Utc>,
    ) -> Result<()>;
    async fn remove_availability_date(
        &self,
        volunteer_name: &str,
        date: NaiveDate,
        timestamp: DateTime<Utc>,
    ) -> Result<()>;
    async fn get_allocations(&self) -> Result<Vec<AllocationRecord>>;
    async fn allocate(&self, allocation: &AllocationWrite) -> Result<()>;
    async fn deallocate(&self, allocation: &AllocationWrite) -> Result<()>;
    async fn health(&self) -> Result<()>;
}

/// Null backend for wiring a gateway without connectivity; every call fails.
pub struct MissingRemoteStore;

#[async_trait]
impl RemoteStore for MissingRemoteStore {
    async fn get_dates(&self) -> Result<Vec<EventDate>> {
        Err(anyhow!("remote store is unavailable"))
    }

    async fn update_dates(&self, _dates: &[EventDate]) -> Result<()> {
        Err(anyhow!("remote store is unavailable"))
    }

    async fn mark_event_complete(
        &self,
        _date_id: NaiveDate,
        _completed_date: NaiveDate,
        _timestamp: DateTime<Utc>,
    ) -> Result<()> {
        Err(anyhow!("remote store is unavailable"))
    }

    async fn get_volunteers(&self) -> Result<Vec<Volunteer>> {
        Err(anyhow!("remote store is unavailable"))
    }

    async fn add_volunteer(&self, _volunteer: &Volunteer) -> Result<()> {
        Err(anyhow!("remote store is unavailable"))
    }

    async fn get_availability(&self) -> Result<Vec<AvailabilityRow>> {
        Err(anyhow!("remote store is unavailable"))
    }

    async fn update_volunteer_availability(
        &self,
        _volunteer_name: &str,
        _dates: &[NaiveDate],
        _timestamp: DateTime<Utc>,
    ) -> Result<()> {
        Err(anyhow!("remote store is unavailable"))
    }

    async fn remove_availability_date(
        &self,
        _volunteer_name: &str,
        _date: NaiveDate,
        _timestamp: DateTime<Utc>,
    ) -> Result<()> {
        Err(anyhow!("remote store is unavailable"))
    }

    async fn get_allocations(&self) -> Result<Vec<AllocationRecord>> {
        Err(anyhow!("remote store is unavailable"))
    }

    async fn allocate(&self, _allocation: &AllocationWrite) -> Result<()> {
        Err(anyhow!("remote store is unavailable"))
    }

    async fn deallocate(&self, _allocation: &AllocationWrite) -> Result<()> {
        Err(anyhow!("remote store is unavailable"))
    }

    async fn health(&self) -> Result<()> {
        Err(anyhow!("remote store is unavailable"))
    }
}

/// HTTP client for the remote store webhook surface.
pub struct HttpRemoteStore {
    http: Client,
    base_url: Url,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .with_context(|| format!("invalid remote store base url: {base_url}"))?;
        // Keep the base path segment when joining relative endpoints.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        let http = Client::builder()
            .timeout(REMOTE_REQUEST_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid endpoint path: {path}"))
    }

    async fn post_json<T: serde::Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        self.http
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await
            .with_context(|| format!("request to {path} failed"))?
            .error_for_status()
            .with_context(|| format!("{path} returned an error status"))?;
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn get_dates(&self) -> Result<Vec<EventDate>> {
        let response: DatesResponse = self
            .http
            .get(self.endpoint("get-dates")?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.data)
    }

    async fn update_dates(&self, dates: &[EventDate]) -> Result<()> {
        self.post_json(
            "update-dates",
            &UpdateDatesRequest {
                dates: dates.to_vec(),
            },
        )
        .await
    }

    async fn mark_event_complete(
        &self,
        date_id: NaiveDate,
        completed_date: NaiveDate,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.post_json(
            "mark-event-complete",
            &MarkEventCompleteRequest {
                date_id,
                completed_date,
                timestamp,
            },
        )
        .await
    }

    async fn get_volunteers(&self) -> Result<Vec<Volunteer>> {
        let response: VolunteersResponse = self
            .http
            .get(self.endpoint("get-volunteers")?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.data)
    }

    async fn add_volunteer(&self, volunteer: &Volunteer) -> Result<()> {
        self.post_json(
            "update-volunteers",
            &UpdateVolunteersRequest::add(volunteer.clone()),
        )
        .await
    }

    async fn get_availability(&self) -> Result<Vec<AvailabilityRow>> {
        let response: AvailabilityResponse = self
            .http
            .get(self.endpoint("get-availability")?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.data)
    }

    async fn update_volunteer_availability(
        &self,
        volunteer_name: &str,
        dates: &[NaiveDate],
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.post_json(
            "update-availability",
            &UpdateAvailabilityRequest::UpdateVolunteer {
                volunteer_name: volunteer_name.to_string(),
                dates: dates.to_vec(),
                timestamp,
            },
        )
        .await
    }

    async fn remove_availability_date(
        &self,
        volunteer_name: &str,
        date: NaiveDate,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.post_json(
            "update-availability",
            &UpdateAvailabilityRequest::RemoveDate {
                volunteer_name: volunteer_name.to_string(),
                date,
                timestamp,
            },
        )
        .await
    }

    async fn get_allocations(&self) -> Result<Vec<AllocationRecord>> {
        let response: AllocationsResponse = self
            .http
            .get(self.endpoint("get-allocations")?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.data)
    }

    async fn allocate(&self, allocation: &AllocationWrite) -> Result<()> {
        self.post_json(
            "update-allocations",
            &UpdateAllocationsRequest::Allocate {
                allocation: allocation.clone(),
            },
        )
        .await
    }

    async fn deallocate(&self, allocation: &AllocationWrite) -> Result<()> {
        self.post_json(
            "update-allocations",
            &UpdateAllocationsRequest::Deallocate {
                allocation: allocation.clone(),
            },
        )
        .await
    }

    async fn health(&self) -> Result<()> {
        self.http
            .get(self.endpoint("health")?)
            .send()
            .await
            .context("health probe failed")?
            .error_for_status()
            .context("health probe returned an error status")?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
