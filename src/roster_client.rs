// src/roster_client.rs
//
// Typed client for the external scheduling service. The engine never
// talks to the wire except through here; the exact wire format is owned
// by the service, so the DTOs below stay tolerant (unknown fields are
// ignored, optional fields default).

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::indicators::{DayIndicator, Traffic};
use crate::week::day_key;

pub const ENV_BASE_URL: &str = "ROSTER_API_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// --- Wire Data Structures ---

/// A shift as published by the scheduling service. Immutable once
/// fetched; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftRecord {
    pub shift_id: i64,
    pub role: String,
    pub date: NaiveDate,
    /// 24-hour "HH:MM".
    pub start: String,
    /// 24-hour "HH:MM".
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_traffic: Option<Traffic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_volume: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRecord {
    pub employee_id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_worked_this_week: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_hours_per_week: Option<f64>,
    /// Skill vector, 0..100 per named skill. Absent skills score 0.
    #[serde(default)]
    pub skills: HashMap<String, f64>,
}

impl EmployeeRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A staffing record. Auto records cover the parent shift's full range;
/// manual records may carry a manager-chosen sub-range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    pub id: String,
    pub shift_id: i64,
    pub employee_id: i64,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness: Option<f64>,
    #[serde(default)]
    pub is_manual: bool,
    /// "H:MM am/pm", only meaningful when `is_manual`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorsResponse {
    pub week: String,
    #[serde(default)]
    pub days: Vec<DayIndicator>,
}

/// Everything a roster view needs for one week, fetched in one fan-out.
#[derive(Debug, Clone)]
pub struct WeekBundle {
    pub week: String,
    pub employees: Vec<EmployeeRecord>,
    pub shifts: Vec<ShiftRecord>,
    pub assignments: Vec<AssignmentRecord>,
    pub indicators: IndicatorsResponse,
}

/// Create payload for a manual assignment. The service expects camelCase
/// ids but snake_case time bounds; the renames below pin that down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAssignmentPayload {
    pub week: String,
    pub shift_id: i64,
    pub employee_id: i64,
    pub role: String,
    #[serde(
        rename = "start_time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<String>,
    #[serde(rename = "end_time", default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAssignment {
    pub id: String,
    pub shift_id: i64,
    pub employee_id: i64,
    pub role: String,
    #[serde(default)]
    pub fitness: Option<f64>,
    #[serde(default)]
    pub is_manual: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAssignmentResponse {
    pub week: String,
    pub assignment: CreatedAssignment,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunScheduleResponse {
    pub week: String,
    pub created: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDayScheduleResponse {
    pub week: String,
    pub date: NaiveDate,
    pub created: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAssignmentResponse {
    pub week: String,
    pub deleted: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearDayResponse {
    pub week: String,
    pub date: NaiveDate,
    pub deleted: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    #[serde(default)]
    pub scheduler_order: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}

// --- Error Type ---

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("HTTP request failed")]
    Request(#[from] reqwest::Error),

    #[error("URL parsing error")]
    UrlParse(#[from] url::ParseError),

    #[error("scheduling service error: status={status}, message='{message}'")]
    Api { status: StatusCode, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

// --- Configuration ---

#[derive(Debug, Clone)]
pub struct RosterConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

impl RosterConfig {
    pub fn new(base_url: &str) -> Result<Self, RosterError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RosterError::Config(format!("invalid base URL '{}': {}", base_url, e)))?;
        Ok(Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Reads `ROSTER_API_BASE_URL`, falling back to the local default.
    pub fn from_env() -> Result<Self, RosterError> {
        let base = env::var(ENV_BASE_URL).unwrap_or_else(|_| {
            warn!(
                "{} not set, using default base URL {}",
                ENV_BASE_URL, DEFAULT_BASE_URL
            );
            DEFAULT_BASE_URL.to_string()
        });
        Self::new(&base)
    }
}

// --- Capability Trait ---

/// The five operations the engine needs from the scheduling service.
/// `RosterClient` implements this over HTTP; tests drive the reconciler
/// against an in-memory implementation.
#[async_trait]
pub trait SchedulerApi: Send + Sync {
    async fn fetch_week_bundle(&self, week: &str) -> Result<WeekBundle, RosterError>;
    async fn run_auto_schedule(&self, week: &str) -> Result<RunScheduleResponse, RosterError>;
    async fn run_auto_schedule_day(
        &self,
        week: &str,
        date: NaiveDate,
    ) -> Result<RunDayScheduleResponse, RosterError>;
    async fn create_manual_assignment(
        &self,
        payload: &ManualAssignmentPayload,
    ) -> Result<String, RosterError>;
    async fn delete_manual_assignment(
        &self,
        week: &str,
        assignment_id: &str,
    ) -> Result<(), RosterError>;
    async fn clear_day(&self, week: &str, date: NaiveDate) -> Result<u64, RosterError>;
}

// --- HTTP Client ---

#[derive(Debug, Clone)]
pub struct RosterClient {
    http: Client,
    base_url: Url,
}

impl RosterClient {
    pub fn new(config: RosterConfig) -> Result<Self, RosterError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RosterError> {
        Ok(self.base_url.join(path)?)
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RosterError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| String::new());
            return Err(RosterError::Api { status, message });
        }
        Ok(response.json::<T>().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RosterError> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        let response = self.http.get(url).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RosterError> {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");
        let response = self.http.post(url).json(body).send().await?;
        Self::decode(response).await
    }

    async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RosterError> {
        let url = self.endpoint(path)?;
        debug!(%url, "DELETE");
        let response = self.http.delete(url).send().await?;
        Self::decode(response).await
    }

    pub async fn health(&self) -> Result<HealthResponse, RosterError> {
        self.get_json("/health").await
    }

    pub async fn fetch_config(&self) -> Result<ConfigResponse, RosterError> {
        self.get_json("/config").await
    }

    pub async fn fetch_employees(&self) -> Result<Vec<EmployeeRecord>, RosterError> {
        self.get_json("/employees").await
    }

    pub async fn fetch_shifts(&self, week: &str) -> Result<Vec<ShiftRecord>, RosterError> {
        self.get_json(&format!("/shifts/{}", week)).await
    }

    pub async fn fetch_assignments(
        &self,
        week: &str,
    ) -> Result<Vec<AssignmentRecord>, RosterError> {
        self.get_json(&format!("/schedule/{}", week)).await
    }

    pub async fn fetch_indicators(&self, week: &str) -> Result<IndicatorsResponse, RosterError> {
        self.get_json(&format!("/indicators/{}", week)).await
    }
}

#[derive(Debug, Serialize)]
struct RunSchedulePayload<'a> {
    week: &'a str,
}

#[derive(Debug, Serialize)]
struct RunDaySchedulePayload<'a> {
    week: &'a str,
    date: String,
}

#[async_trait]
impl SchedulerApi for RosterClient {
    /// Fetches the four read-only week resources concurrently. Reads
    /// touch disjoint keys, so the fan-out is safe; writes elsewhere stay
    /// strictly sequential.
    async fn fetch_week_bundle(&self, week: &str) -> Result<WeekBundle, RosterError> {
        info!(week, "fetching week bundle");
        let (employees, shifts, assignments, indicators) = tokio::try_join!(
            self.fetch_employees(),
            self.fetch_shifts(week),
            self.fetch_assignments(week),
            self.fetch_indicators(week),
        )?;
        debug!(
            employees = employees.len(),
            shifts = shifts.len(),
            assignments = assignments.len(),
            "week bundle fetched"
        );
        Ok(WeekBundle {
            week: week.to_string(),
            employees,
            shifts,
            assignments,
            indicators,
        })
    }

    async fn run_auto_schedule(&self, week: &str) -> Result<RunScheduleResponse, RosterError> {
        info!(week, "running auto-schedule");
        self.post_json("/schedule/run", &RunSchedulePayload { week })
            .await
    }

    async fn run_auto_schedule_day(
        &self,
        week: &str,
        date: NaiveDate,
    ) -> Result<RunDayScheduleResponse, RosterError> {
        info!(week, %date, "running auto-schedule for single day");
        self.post_json(
            "/schedule/run-day",
            &RunDaySchedulePayload {
                week,
                date: day_key(date),
            },
        )
        .await
    }

    async fn create_manual_assignment(
        &self,
        payload: &ManualAssignmentPayload,
    ) -> Result<String, RosterError> {
        debug!(
            shift_id = payload.shift_id,
            employee_id = payload.employee_id,
            "creating manual assignment"
        );
        let response: ManualAssignmentResponse =
            self.post_json("/assignments/manual", payload).await?;
        Ok(response.assignment.id)
    }

    async fn delete_manual_assignment(
        &self,
        week: &str,
        assignment_id: &str,
    ) -> Result<(), RosterError> {
        debug!(week, assignment_id, "deleting manual assignment");
        let _: DeleteAssignmentResponse = self
            .delete_json(&format!("/assignments/manual/{}/{}", week, assignment_id))
            .await?;
        Ok(())
    }

    async fn clear_day(&self, week: &str, date: NaiveDate) -> Result<u64, RosterError> {
        info!(week, %date, "clearing all assignments for day");
        let response: ClearDayResponse = self
            .delete_json(&format!("/assignments/day/{}/{}", week, day_key(date)))
            .await?;
        Ok(response.deleted)
    }
}
