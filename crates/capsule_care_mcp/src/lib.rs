use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use rmcp::Json;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, GetPromptRequestParams, GetPromptResult, ListPromptsResult,
    ListResourcesResult, PaginatedRequestParams, RawResource, ReadResourceRequestParams,
    ReadResourceResult, ResourceContents,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer};
use rmcp::{prompt, prompt_handler, prompt_router, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use capsule_care_client::config::DEFAULT_HISTORY_MAX_PAGES;
use capsule_care_client::{
    AdherenceReport, AdherenceSummary, CapsuleCareClient, CreateDoctorRequest,
    CreateEmergencyContactRequest, CreateMedicationIntakeRequest, CreatePrescriptionRequest,
    CreateReminderRequest, CreateUserDoctorRequest, CreateUserMedicationRequest, Doctor,
    EmergencyContact, ExtractedText, History, ImageUpload, LoginRequest, LoginResponse,
    Medication, MedicationIntake, MessageResponse, NewMedication, Notification,
    NotificationQuery, NotificationStatus, PageQuery, Prescription, PrescriptionAnalysis,
    PrescriptionStatus, RegisterRequest, Reminder, UpdateUserProfileRequest, User, UserDoctor,
    UserMedication, expected_doses_per_day, load_history,
};

pub mod compact;
pub mod domains;
pub mod error;
pub mod logging;
mod prompts;

use compact::{compact_list, defaults};
use domains::adherence::CalendarCell;
use domains::resources::MEDICATIONS_URI;
pub use error::{McpError, McpResult};

/// Intake page size used when loading history for adherence views.
pub const HISTORY_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct CapsuleCareMcpHandler {
    client: Arc<dyn CapsuleCareClient>,
    history_max_pages: u32,
    tool_router: rmcp::handler::server::tool::ToolRouter<CapsuleCareMcpHandler>,
    prompt_router: rmcp::handler::server::router::prompt::PromptRouter<CapsuleCareMcpHandler>,
}

// === Tool parameters ===

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct LoginParams {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct RegisterParams {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct IdParam {
    pub id: i64,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateParams {
    pub id: i64,
    /// Partial object; only the given fields change.
    pub fields: serde_json::Value,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct SearchParams {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Return only the key fields (default true)
    pub compact: Option<bool>,
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct ListParams {
    /// Return only the key fields (default true)
    pub compact: Option<bool>,
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct UserMedicationsParams {
    /// Also list medications that are no longer active
    pub include_inactive: Option<bool>,
    /// Return only the key fields (default true)
    pub compact: Option<bool>,
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Return only the key fields (default true)
    pub compact: Option<bool>,
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct AdherenceParams {
    /// Number of days ending today (default 7); ignored when both dates are given
    pub days: Option<u32>,
    /// First day, YYYY-MM-DD
    pub start_date: Option<String>,
    /// Last day, YYYY-MM-DD
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct CalendarParams {
    /// Defaults to the current year
    pub year: Option<i32>,
    /// 1-12, defaults to the current month
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ReminderLogsParams {
    pub reminder_id: i64,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct NotificationListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<NotificationStatus>,
    pub unread_only: Option<bool>,
    /// Return only the key fields (default true)
    pub compact: Option<bool>,
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct PrescriptionListParams {
    pub status: Option<PrescriptionStatus>,
    /// Return only the key fields (default true)
    pub compact: Option<bool>,
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ImagePathParams {
    /// Local path of a JPEG, PNG, WEBP, HEIC or PDF file
    pub path: String,
}

// === Prompt parameters ===

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct WeeklyAdherenceReviewParams {
    /// Days to review (default 7)
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct MedicationCheckInParams {
    /// Limit the check-in to one medication
    pub medication: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct RegisterFromPhotoParams {
    pub image_path: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct MonthlyCalendarReviewParams {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

// === Tool results ===

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ObjectResult {
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct AuthResult {
    pub message: Option<String>,
    pub user: User,
}

impl From<LoginResponse> for AuthResult {
    fn from(response: LoginResponse) -> Self {
        Self {
            message: response.message,
            user: response.user,
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct DeletedResult {
    pub id: i64,
    pub deleted: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CalendarResult {
    pub year: i32,
    pub month: u32,
    /// Sunday-first weeks, seven cells each
    pub rows: Vec<Vec<CalendarCell>>,
    /// Summary over the days of the month itself, padding excluded
    pub summary: AdherenceSummary,
    /// Intake history stopped at the page cap; counts may be low
    pub history_truncated: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct AnalysisResult {
    pub analysis: PrescriptionAnalysis,
    /// Catalog entry pre-filled from the analysis
    pub suggested_medication: NewMedication,
    /// Frequency code matched from the analysis, if any
    pub suggested_frequency: Option<String>,
    pub doses_per_day: Option<f64>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn deleted(id: i64) -> Json<DeletedResult> {
    Json(DeletedResult { id, deleted: true })
}

impl CapsuleCareMcpHandler {
    /// Page cap used when loading intake history.
    pub fn with_history_max_pages(mut self, max_pages: u32) -> Self {
        self.history_max_pages = max_pages.max(1);
        self
    }

    async fn history(&self) -> McpResult<History> {
        Ok(load_history(
            self.client.as_ref(),
            HISTORY_PAGE_SIZE,
            self.history_max_pages,
        )
        .await?)
    }
}

#[tool_router]
#[prompt_router]
impl CapsuleCareMcpHandler {
    pub fn new(client: Arc<dyn CapsuleCareClient>) -> Self {
        Self {
            client,
            history_max_pages: DEFAULT_HISTORY_MAX_PAGES,
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    pub fn tool_count(&self) -> usize {
        self.tool_router.list_all().len()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompt_router.list_all().len()
    }

    // === Auth ===

    #[tool(name = "login", description = "Log in and keep the session token")]
    async fn login(&self, params: Parameters<LoginParams>) -> Result<Json<AuthResult>, String> {
        let p = params.0;
        let response = self
            .client
            .login(&LoginRequest {
                username: p.username,
                password: SecretString::from(p.password),
            })
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(response.into()))
    }

    #[tool(name = "register", description = "Create an account and log in")]
    async fn register(
        &self,
        params: Parameters<RegisterParams>,
    ) -> Result<Json<AuthResult>, String> {
        let p = params.0;
        let response = self
            .client
            .register(&RegisterRequest {
                username: p.username,
                email: p.email,
                password: SecretString::from(p.password),
            })
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(response.into()))
    }

    #[tool(name = "logout", description = "Forget the session token")]
    async fn logout(&self) -> Result<Json<ObjectResult>, String> {
        self.client.logout().await.map_err(|e| e.to_string())?;
        Ok(Json(ObjectResult {
            value: serde_json::json!({ "logged_out": true }),
        }))
    }

    #[tool(name = "get_profile", description = "Get the logged-in user's profile")]
    async fn get_profile(&self) -> Result<Json<User>, String> {
        let user = self.client.get_profile().await.map_err(|e| e.to_string())?;
        Ok(Json(user))
    }

    // === Medications ===

    #[tool(
        name = "search_medications",
        description = "Search the medication catalog by name"
    )]
    async fn search_medications(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let page = self
            .client
            .get_medications(&PageQuery {
                page: p.page,
                per_page: p.per_page,
                search: p.search,
            })
            .await
            .map_err(|e| e.to_string())?;
        let items = compact_list(
            &page.items,
            p.compact.unwrap_or(true),
            defaults::MEDICATION,
            p.fields.as_deref(),
        )
        .map_err(McpError::from)?;
        Ok(Json(ObjectResult {
            value: serde_json::json!({
                "medications": items,
                "total": page.total,
                "page": page.page,
                "pages": page.pages,
            }),
        }))
    }

    #[tool(name = "get_medication", description = "Get a catalog medication by id")]
    async fn get_medication(&self, params: Parameters<IdParam>) -> Result<Json<Medication>, String> {
        let medication = self
            .client
            .get_medication(params.0.id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(medication))
    }

    #[tool(
        name = "list_user_medications",
        description = "List the medications the user tracks, with expected doses per day"
    )]
    async fn list_user_medications(
        &self,
        params: Parameters<UserMedicationsParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let medications = self
            .client
            .get_user_medications()
            .await
            .map_err(|e| e.to_string())?;
        let enriched = domains::medications::enriched_list(
            &medications,
            p.include_inactive.unwrap_or(false),
        )?;
        let value = compact::compact(
            &enriched,
            p.compact.unwrap_or(true),
            defaults::USER_MEDICATION,
            p.fields.as_deref(),
        );
        Ok(Json(ObjectResult {
            value: serde_json::json!({ "medications": value }),
        }))
    }

    #[tool(
        name = "add_user_medication",
        description = "Start tracking a catalog medication with dosage and frequency code"
    )]
    async fn add_user_medication(
        &self,
        params: Parameters<CreateUserMedicationRequest>,
    ) -> Result<Json<UserMedication>, String> {
        let mut request = params.0;
        if let Some(raw) = request.prescribed_frequency.as_deref() {
            request.prescribed_frequency =
                Some(domains::medications::canonical_frequency(raw)?);
        }
        let medication = self
            .client
            .add_user_medication(&request)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(medication))
    }

    #[tool(
        name = "update_user_medication",
        description = "Update fields of a tracked medication"
    )]
    async fn update_user_medication(
        &self,
        params: Parameters<UpdateParams>,
    ) -> Result<Json<UserMedication>, String> {
        let p = params.0;
        let fields = domains::medications::prepare_update(&p.fields)?;
        let medication = self
            .client
            .update_user_medication(p.id, &fields)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(medication))
    }

    #[tool(
        name = "delete_user_medication",
        description = "Stop tracking a medication"
    )]
    async fn delete_user_medication(
        &self,
        params: Parameters<IdParam>,
    ) -> Result<Json<DeletedResult>, String> {
        let id = params.0.id;
        self.client
            .delete_user_medication(id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(deleted(id))
    }

    // === Intakes ===

    #[tool(
        name = "record_intake",
        description = "Log a dose; status defaults to taken and status_at to now"
    )]
    async fn record_intake(
        &self,
        params: Parameters<CreateMedicationIntakeRequest>,
    ) -> Result<Json<MedicationIntake>, String> {
        let request = domains::intakes::prepare_intake(params.0, now())?;
        let intake = self
            .client
            .create_medication_intake(&request)
            .await
            .map_err(|e| e.to_string())?;
        tracing::info!(
            intake = intake.id,
            user_medication = intake.user_medication_id,
            status = ?intake.status,
            "intake recorded"
        );
        Ok(Json(intake))
    }

    #[tool(name = "list_intakes", description = "List logged doses, newest first")]
    async fn list_intakes(&self, params: Parameters<PageParams>) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let page = self
            .client
            .get_medication_intakes(p.page, p.per_page)
            .await
            .map_err(|e| e.to_string())?;
        let items = compact_list(
            &page.items,
            p.compact.unwrap_or(true),
            defaults::INTAKE,
            p.fields.as_deref(),
        )
        .map_err(McpError::from)?;
        Ok(Json(ObjectResult {
            value: serde_json::json!({
                "intakes": items,
                "total": page.total,
                "page": page.page,
                "pages": page.pages,
            }),
        }))
    }

    #[tool(name = "update_intake", description = "Correct a logged dose")]
    async fn update_intake(
        &self,
        params: Parameters<UpdateParams>,
    ) -> Result<Json<MedicationIntake>, String> {
        let p = params.0;
        let fields = domains::intakes::prepare_update(&p.fields)?;
        let intake = self
            .client
            .update_medication_intake(p.id, &fields)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(intake))
    }

    // === Adherence ===

    #[tool(
        name = "get_adherence",
        description = "Per-day adherence (taken vs expected doses) for the last N days or a date range"
    )]
    async fn get_adherence(
        &self,
        params: Parameters<AdherenceParams>,
    ) -> Result<Json<AdherenceReport>, String> {
        let p = params.0;
        let window = domains::adherence::resolve_window(
            p.days,
            p.start_date.as_deref(),
            p.end_date.as_deref(),
            today(),
        )?;
        let history = self.history().await?;
        let report = AdherenceReport::from_history(&history, window);
        tracing::debug!(
            start = %window.start,
            end = %window.end,
            overall_rate = report.summary.overall_rate,
            truncated = report.history_truncated,
            "adherence computed"
        );
        Ok(Json(report))
    }

    #[tool(
        name = "get_calendar_month",
        description = "Month calendar of daily adherence in Sunday-first rows of seven days"
    )]
    async fn get_calendar_month(
        &self,
        params: Parameters<CalendarParams>,
    ) -> Result<Json<CalendarResult>, String> {
        let p = params.0;
        let (year, month, grid) = domains::adherence::resolve_month(p.year, p.month, today())?;
        let history = self.history().await?;
        let report = AdherenceReport::from_history(&history, grid);
        let in_month: Vec<_> = report
            .days
            .iter()
            .filter(|d| d.date.month() == month)
            .cloned()
            .collect();
        Ok(Json(CalendarResult {
            year,
            month,
            rows: domains::adherence::calendar_rows(&report, month),
            summary: AdherenceSummary::from_days(&in_month),
            history_truncated: report.history_truncated,
        }))
    }

    // === Reminders ===

    #[tool(name = "list_reminders", description = "List medication reminders")]
    async fn list_reminders(&self, params: Parameters<ListParams>) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let reminders = self
            .client
            .get_reminders()
            .await
            .map_err(|e| e.to_string())?;
        let items = compact_list(
            &reminders,
            p.compact.unwrap_or(true),
            defaults::REMINDER,
            p.fields.as_deref(),
        )
        .map_err(McpError::from)?;
        Ok(Json(ObjectResult {
            value: serde_json::json!({ "reminders": items }),
        }))
    }

    #[tool(
        name = "create_reminder",
        description = "Create a reminder for a tracked medication (reminder_time as HH:MM)"
    )]
    async fn create_reminder(
        &self,
        params: Parameters<CreateReminderRequest>,
    ) -> Result<Json<Reminder>, String> {
        let request = domains::reminders::prepare_reminder(params.0)?;
        let reminder = self
            .client
            .create_reminder(&request)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(reminder))
    }

    #[tool(name = "update_reminder", description = "Update fields of a reminder")]
    async fn update_reminder(
        &self,
        params: Parameters<UpdateParams>,
    ) -> Result<Json<Reminder>, String> {
        let p = params.0;
        let fields = domains::reminders::prepare_update(&p.fields)?;
        let reminder = self
            .client
            .update_reminder(p.id, &fields)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(reminder))
    }

    #[tool(name = "delete_reminder", description = "Delete a reminder")]
    async fn delete_reminder(
        &self,
        params: Parameters<IdParam>,
    ) -> Result<Json<DeletedResult>, String> {
        let id = params.0.id;
        self.client
            .delete_reminder(id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(deleted(id))
    }

    #[tool(
        name = "get_reminder_logs",
        description = "Delivery history of a reminder"
    )]
    async fn get_reminder_logs(
        &self,
        params: Parameters<ReminderLogsParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let page = self
            .client
            .get_reminder_logs(p.reminder_id, p.page, p.per_page)
            .await
            .map_err(|e| e.to_string())?;
        let value = serde_json::to_value(&page).map_err(McpError::from)?;
        Ok(Json(ObjectResult { value }))
    }

    // === Notifications ===

    #[tool(
        name = "list_notifications",
        description = "List notifications with the unread count"
    )]
    async fn list_notifications(
        &self,
        params: Parameters<NotificationListParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let page = self
            .client
            .get_notifications(&NotificationQuery {
                page: p.page,
                per_page: p.per_page,
                status: p.status,
                unread_only: p.unread_only.unwrap_or(false),
            })
            .await
            .map_err(|e| e.to_string())?;
        let value = domains::notifications::page_view(
            &page,
            p.compact.unwrap_or(true),
            p.fields.as_deref(),
        )?;
        Ok(Json(ObjectResult { value }))
    }

    #[tool(
        name = "mark_notification_read",
        description = "Mark one notification as read"
    )]
    async fn mark_notification_read(
        &self,
        params: Parameters<IdParam>,
    ) -> Result<Json<Notification>, String> {
        let notification = self
            .client
            .mark_notification_read(params.0.id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(notification))
    }

    #[tool(
        name = "mark_all_notifications_read",
        description = "Mark every notification as read"
    )]
    async fn mark_all_notifications_read(&self) -> Result<Json<MessageResponse>, String> {
        let response = self
            .client
            .mark_all_notifications_read()
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(response))
    }

    #[tool(name = "delete_notification", description = "Delete a notification")]
    async fn delete_notification(
        &self,
        params: Parameters<IdParam>,
    ) -> Result<Json<DeletedResult>, String> {
        let id = params.0.id;
        self.client
            .delete_notification(id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(deleted(id))
    }

    // === Doctors ===

    #[tool(name = "search_doctors", description = "Search the doctor directory")]
    async fn search_doctors(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let page = self
            .client
            .get_doctors(&PageQuery {
                page: p.page,
                per_page: p.per_page,
                search: p.search,
            })
            .await
            .map_err(|e| e.to_string())?;
        let items = compact_list(
            &page.items,
            p.compact.unwrap_or(true),
            defaults::DOCTOR,
            p.fields.as_deref(),
        )
        .map_err(McpError::from)?;
        Ok(Json(ObjectResult {
            value: serde_json::json!({
                "doctors": items,
                "total": page.total,
                "page": page.page,
                "pages": page.pages,
            }),
        }))
    }

    #[tool(name = "list_user_doctors", description = "List the user's doctors")]
    async fn list_user_doctors(&self) -> Result<Json<ObjectResult>, String> {
        let doctors = self
            .client
            .get_user_doctors()
            .await
            .map_err(|e| e.to_string())?;
        let value = serde_json::to_value(&doctors).map_err(McpError::from)?;
        Ok(Json(ObjectResult {
            value: serde_json::json!({ "doctors": value }),
        }))
    }

    #[tool(name = "create_doctor", description = "Add a doctor to the directory")]
    async fn create_doctor(
        &self,
        params: Parameters<CreateDoctorRequest>,
    ) -> Result<Json<Doctor>, String> {
        let doctor = self
            .client
            .create_doctor(&params.0)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(doctor))
    }

    #[tool(
        name = "add_user_doctor",
        description = "Link a doctor to the user (primary, specialist, ...)"
    )]
    async fn add_user_doctor(
        &self,
        params: Parameters<CreateUserDoctorRequest>,
    ) -> Result<Json<UserDoctor>, String> {
        let link = self
            .client
            .add_user_doctor(&params.0)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(link))
    }

    // === Prescriptions ===

    #[tool(
        name = "list_prescriptions",
        description = "List prescriptions, optionally by status"
    )]
    async fn list_prescriptions(
        &self,
        params: Parameters<PrescriptionListParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let prescriptions = self
            .client
            .get_prescriptions(p.status)
            .await
            .map_err(|e| e.to_string())?;
        let items = compact_list(
            &prescriptions,
            p.compact.unwrap_or(true),
            defaults::PRESCRIPTION,
            p.fields.as_deref(),
        )
        .map_err(McpError::from)?;
        Ok(Json(ObjectResult {
            value: serde_json::json!({ "prescriptions": items }),
        }))
    }

    #[tool(name = "create_prescription", description = "Record a prescription")]
    async fn create_prescription(
        &self,
        params: Parameters<CreatePrescriptionRequest>,
    ) -> Result<Json<Prescription>, String> {
        let prescription = self
            .client
            .create_prescription(&params.0)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(prescription))
    }

    #[tool(
        name = "update_prescription",
        description = "Update fields of a prescription"
    )]
    async fn update_prescription(
        &self,
        params: Parameters<UpdateParams>,
    ) -> Result<Json<Prescription>, String> {
        let p = params.0;
        domains::ensure_object(&p.fields)?;
        let prescription = self
            .client
            .update_prescription(p.id, &p.fields)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(prescription))
    }

    #[tool(name = "delete_prescription", description = "Delete a prescription")]
    async fn delete_prescription(
        &self,
        params: Parameters<IdParam>,
    ) -> Result<Json<DeletedResult>, String> {
        let id = params.0.id;
        self.client
            .delete_prescription(id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(deleted(id))
    }

    #[tool(
        name = "analyze_prescription",
        description = "Upload a prescription or medication box photo from disk and read the medication details"
    )]
    async fn analyze_prescription(
        &self,
        params: Parameters<ImagePathParams>,
    ) -> Result<Json<AnalysisResult>, String> {
        let upload = ImageUpload::from_path(&params.0.path)
            .await
            .map_err(|e| e.to_string())?;
        let analysis = self
            .client
            .analyze_prescription(upload)
            .await
            .map_err(|e| e.to_string())?;
        let suggested_frequency = analysis
            .analysis
            .frequency
            .as_deref()
            .and_then(|f| domains::medications::canonical_frequency(f).ok());
        let doses_per_day = suggested_frequency
            .as_deref()
            .map(|f| expected_doses_per_day(Some(f)));
        Ok(Json(AnalysisResult {
            suggested_medication: analysis.analysis.to_new_medication(),
            suggested_frequency,
            doses_per_day,
            analysis,
        }))
    }

    #[tool(
        name = "extract_prescription_text",
        description = "Upload an image from disk and return the raw text read from it"
    )]
    async fn extract_prescription_text(
        &self,
        params: Parameters<ImagePathParams>,
    ) -> Result<Json<ExtractedText>, String> {
        let upload = ImageUpload::from_path(&params.0.path)
            .await
            .map_err(|e| e.to_string())?;
        let text = self
            .client
            .extract_text(upload)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(text))
    }

    // === Account ===

    #[tool(
        name = "list_emergency_contacts",
        description = "List emergency contacts"
    )]
    async fn list_emergency_contacts(
        &self,
        params: Parameters<ListParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let contacts = self
            .client
            .get_emergency_contacts()
            .await
            .map_err(|e| e.to_string())?;
        let items = compact_list(
            &contacts,
            p.compact.unwrap_or(true),
            defaults::CONTACT,
            p.fields.as_deref(),
        )
        .map_err(McpError::from)?;
        Ok(Json(ObjectResult {
            value: serde_json::json!({ "contacts": items }),
        }))
    }

    #[tool(
        name = "create_emergency_contact",
        description = "Add an emergency contact"
    )]
    async fn create_emergency_contact(
        &self,
        params: Parameters<CreateEmergencyContactRequest>,
    ) -> Result<Json<EmergencyContact>, String> {
        if params.0.name.trim().is_empty() {
            return Err(McpError::Validation("name must not be empty".into()).into());
        }
        let contact = self
            .client
            .create_emergency_contact(&params.0)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(contact))
    }

    #[tool(
        name = "update_user_profile",
        description = "Update the user's name, phone, birth date, gender or language"
    )]
    async fn update_user_profile(
        &self,
        params: Parameters<UpdateUserProfileRequest>,
    ) -> Result<Json<User>, String> {
        let user = self
            .client
            .update_user_profile(&params.0)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(user))
    }

    // === MCP Prompts ===

    #[prompt(
        name = "weekly-adherence-review",
        description = "Review recent adherence and suggest schedule fixes"
    )]
    async fn weekly_adherence_review(
        &self,
        params: Parameters<WeeklyAdherenceReviewParams>,
    ) -> GetPromptResult {
        let days = params.0.days.unwrap_or(domains::adherence::DEFAULT_WINDOW_DAYS);

        prompts::weekly_adherence_review_prompt(days)
    }

    #[prompt(
        name = "medication-check-in",
        description = "Walk through today's doses and log them"
    )]
    async fn medication_check_in(
        &self,
        params: Parameters<MedicationCheckInParams>,
    ) -> GetPromptResult {
        prompts::medication_check_in_prompt(params.0.medication.as_deref())
    }

    #[prompt(
        name = "register-from-prescription-photo",
        description = "Register a medication from a prescription or box photo"
    )]
    async fn register_from_prescription_photo(
        &self,
        params: Parameters<RegisterFromPhotoParams>,
    ) -> GetPromptResult {
        prompts::register_from_prescription_photo_prompt(&params.0.image_path)
    }

    #[prompt(
        name = "monthly-calendar-review",
        description = "Render and discuss the adherence calendar of a month"
    )]
    async fn monthly_calendar_review(
        &self,
        params: Parameters<MonthlyCalendarReviewParams>,
    ) -> GetPromptResult {
        let today = today();
        let year = params.0.year.unwrap_or_else(|| today.year());
        let month = params
            .0
            .month
            .filter(|m| (1..=12).contains(m))
            .unwrap_or_else(|| today.month());

        prompts::monthly_calendar_review_prompt(year, month)
    }
}

#[tool_handler]
#[prompt_handler(router = self.prompt_router)]
impl rmcp::ServerHandler for CapsuleCareMcpHandler {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo::new(
            rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .enable_resources()
                .build(),
        )
        .with_instructions(
            "CapsuleCare MCP server - track medications, log doses, manage reminders \
             and prescriptions, and review daily adherence.",
        )
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let mut res = RawResource::new(MEDICATIONS_URI, "Active Medications").no_annotation();
        res.description = Some(
            "Active medications with expected daily doses and the last 7 days of adherence"
                .to_string(),
        );
        res.mime_type = Some("application/json".to_string());

        Ok(ListResourcesResult {
            resources: vec![res],
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        if request.uri != MEDICATIONS_URI {
            return Err(ErrorData::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            ));
        }

        let history = self
            .history()
            .await
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        let value = domains::resources::medications_resource(&history, today());
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;

        Ok(ReadResourceResult::new(vec![
            ResourceContents::TextResourceContents {
                uri: request.uri.clone(),
                mime_type: Some("application/json".to_string()),
                text,
                meta: None,
            },
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capsule_care_client::http_client::ReqwestCapsuleCareClient;
    use capsule_care_client::retry::RetryPolicy;
    use capsule_care_client::{IntakeStatus, Session};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn handler_for(server: &MockServer) -> CapsuleCareMcpHandler {
        let client = ReqwestCapsuleCareClient::new(
            &format!("{}/api", server.uri()),
            Session::with_token(SecretString::from("tok")),
        )
        .with_retry_policy(RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_millis(1),
        });
        CapsuleCareMcpHandler::new(Arc::new(client))
    }

    fn offline_handler() -> CapsuleCareMcpHandler {
        let client = ReqwestCapsuleCareClient::new("http://127.0.0.1:9/api", Session::new());
        CapsuleCareMcpHandler::new(Arc::new(client))
    }

    async fn mount_history(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/medications/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "medications": [
                    {"id": 1, "custom_name": "Metformin", "prescribed_frequency": "twice_daily"},
                    {"id": 2, "custom_name": "Old", "prescribed_frequency": "once_daily", "is_active": false}
                ]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/intake"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "intakes": [
                    {"id": 1, "user_medication_id": 1, "status": "taken", "status_at": "2025-03-01T08:00:00"},
                    {"id": 2, "user_medication_id": 1, "status": "taken", "status_at": "2025-03-01T20:00:00"},
                    {"id": 3, "user_medication_id": 1, "status": "taken", "status_at": "2025-03-02T08:00:00"},
                    {"id": 4, "user_medication_id": 1, "status": "missed", "status_at": "2025-03-02T20:00:00"}
                ],
                "total": 4, "page": 1, "per_page": 100, "pages": 1
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn tools_are_registered() {
        let handler = offline_handler();
        let _clone = handler.clone();
        let tools = handler.tool_router.list_all();
        for name in [
            "login",
            "register",
            "logout",
            "get_profile",
            "search_medications",
            "get_medication",
            "list_user_medications",
            "add_user_medication",
            "update_user_medication",
            "delete_user_medication",
            "record_intake",
            "list_intakes",
            "update_intake",
            "get_adherence",
            "get_calendar_month",
            "list_reminders",
            "create_reminder",
            "update_reminder",
            "delete_reminder",
            "get_reminder_logs",
            "list_notifications",
            "mark_notification_read",
            "mark_all_notifications_read",
            "delete_notification",
            "search_doctors",
            "list_user_doctors",
            "create_doctor",
            "add_user_doctor",
            "list_prescriptions",
            "create_prescription",
            "update_prescription",
            "delete_prescription",
            "analyze_prescription",
            "extract_prescription_text",
            "list_emergency_contacts",
            "create_emergency_contact",
            "update_user_profile",
        ] {
            assert!(tools.iter().any(|t| t.name == name), "missing tool {name}");
        }
        assert_eq!(handler.tool_count(), 37);
    }

    #[test]
    fn prompts_are_registered() {
        let handler = offline_handler();
        let prompts = handler.prompt_router.list_all();
        assert!(prompts.iter().any(|p| p.name == "weekly-adherence-review"));
        assert!(prompts.iter().any(|p| p.name == "medication-check-in"));
        assert!(prompts.iter().any(|p| p.name == "register-from-prescription-photo"));
        assert!(prompts.iter().any(|p| p.name == "monthly-calendar-review"));
        assert_eq!(handler.prompt_count(), 4);
    }

    #[tokio::test]
    async fn adherence_over_explicit_window() {
        let server = MockServer::start().await;
        mount_history(&server).await;
        let handler = handler_for(&server);

        let Json(report) = handler
            .get_adherence(Parameters(AdherenceParams {
                start_date: Some("2025-03-01".into()),
                end_date: Some("2025-03-03".into()),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(report.days.len(), 3);
        // Only the active twice-daily medication is expected.
        assert_eq!(report.days[0].expected_count, 2.0);
        assert!(report.days[0].is_compliant);
        assert_eq!(report.days[1].taken_count, 1);
        assert_eq!(report.days[1].adherence_rate, 0.5);
        assert_eq!(report.days[2].taken_count, 0);
        assert_eq!(report.missed_records, 1);
        assert_eq!(report.summary.complete_days, 1);
    }

    async fn mount_truncated_history(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/medications/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "medications": [{"id": 1, "prescribed_frequency": "once_daily"}]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/intake"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "intakes": [
                    {"id": 1, "user_medication_id": 1, "status": "taken", "status_at": "2025-03-01T08:00:00"}
                ],
                "total": 2, "page": 1, "per_page": 1, "pages": 2
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn adherence_flags_truncated_history() {
        let server = MockServer::start().await;
        mount_truncated_history(&server).await;
        let handler = handler_for(&server).with_history_max_pages(1);

        let Json(report) = handler
            .get_adherence(Parameters(AdherenceParams {
                start_date: Some("2025-03-01".into()),
                end_date: Some("2025-03-01".into()),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert!(report.history_truncated);
        assert_eq!(report.days[0].taken_count, 1);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["history_truncated"], true);
    }

    #[tokio::test]
    async fn complete_history_is_not_flagged() {
        let server = MockServer::start().await;
        mount_history(&server).await;
        let handler = handler_for(&server);

        let Json(report) = handler
            .get_adherence(Parameters(AdherenceParams {
                start_date: Some("2025-03-01".into()),
                end_date: Some("2025-03-01".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert!(!report.history_truncated);
    }

    #[tokio::test]
    async fn calendar_month_flags_truncated_history() {
        let server = MockServer::start().await;
        mount_truncated_history(&server).await;
        let handler = handler_for(&server).with_history_max_pages(1);

        let Json(calendar) = handler
            .get_calendar_month(Parameters(CalendarParams {
                year: Some(2025),
                month: Some(3),
            }))
            .await
            .unwrap();
        assert!(calendar.history_truncated);
        assert_eq!(calendar.summary.total_taken, 1);
    }

    #[tokio::test]
    async fn adherence_rejects_bad_window_without_fetching() {
        let handler = offline_handler();
        let err = handler
            .get_adherence(Parameters(AdherenceParams {
                start_date: Some("2025-03-05".into()),
                end_date: Some("2025-03-01".into()),
                ..Default::default()
            }))
            .await
            .err().unwrap();
        assert!(err.contains("start_date"), "{err}");
    }

    #[tokio::test]
    async fn adherence_surfaces_history_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/medications/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "Token has expired"})))
            .mount(&server)
            .await;
        let handler = handler_for(&server);
        let err = handler
            .get_adherence(Parameters(AdherenceParams::default()))
            .await
            .err().unwrap();
        assert!(err.contains("Token has expired"), "{err}");
    }

    #[tokio::test]
    async fn calendar_month_has_full_weeks() {
        let server = MockServer::start().await;
        mount_history(&server).await;
        let handler = handler_for(&server);

        let Json(calendar) = handler
            .get_calendar_month(Parameters(CalendarParams {
                year: Some(2025),
                month: Some(3),
            }))
            .await
            .unwrap();

        // March 2025 starts on a Saturday: six leading February days.
        assert!(calendar.rows.iter().all(|r| r.len() == 7));
        assert!(!calendar.rows[0][0].in_month);
        let first_of_month = &calendar.rows[0][6];
        assert_eq!(first_of_month.day, 1);
        assert_eq!(first_of_month.completion_percent, 100);
        assert_eq!(calendar.summary.days, 31);
        assert_eq!(calendar.summary.complete_days, 1);
        assert_eq!(calendar.summary.partial_days, 1);
    }

    #[tokio::test]
    async fn record_intake_defaults_to_taken() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/notifications/intake"))
            .and(header("authorization", "Bearer tok"))
            .and(body_partial_json(json!({"user_medication_id": 1, "status": "taken"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "message": "Intake recorded",
                "intake": {"id": 9, "user_medication_id": 1, "status": "taken", "status_at": "2025-03-01T08:00:00"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        let handler = handler_for(&server);

        let Json(intake) = handler
            .record_intake(Parameters(CreateMedicationIntakeRequest {
                user_medication_id: 1,
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(intake.id, 9);
        assert_eq!(intake.status, IntakeStatus::Taken);
    }

    #[tokio::test]
    async fn list_user_medications_is_compact_and_active_only() {
        let server = MockServer::start().await;
        mount_history(&server).await;
        let handler = handler_for(&server);

        let Json(result) = handler
            .list_user_medications(Parameters(UserMedicationsParams::default()))
            .await
            .unwrap();
        let meds = result.value["medications"].as_array().unwrap();
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0]["name"], "Metformin");
        assert_eq!(meds[0]["doses_per_day"], 2.0);
        assert!(meds[0].get("created_at").is_none());
    }

    #[tokio::test]
    async fn unknown_frequency_is_rejected_before_any_request() {
        let handler = offline_handler();
        let err = handler
            .add_user_medication(Parameters(CreateUserMedicationRequest {
                medication_id: 3,
                prescribed_frequency: Some("hourly".into()),
                ..Default::default()
            }))
            .await
            .err().unwrap();
        assert!(err.contains("unknown frequency code"), "{err}");
    }

    #[tokio::test]
    async fn notifications_report_unread_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notifications"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "notifications": [
                    {"id": 1, "status": "sent", "title": "Metformin"},
                    {"id": 2, "status": "read", "title": "Metformin"}
                ],
                "total": 2, "page": 1, "per_page": 20, "pages": 1
            })))
            .mount(&server)
            .await;
        let handler = handler_for(&server);

        let Json(result) = handler
            .list_notifications(Parameters(NotificationListParams::default()))
            .await
            .unwrap();
        assert_eq!(result.value["unread_count"], 1);
        assert_eq!(result.value["notifications"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_reports_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/reminders/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "deleted"})))
            .expect(1)
            .mount(&server)
            .await;
        let handler = handler_for(&server);

        let Json(result) = handler
            .delete_reminder(Parameters(IdParam { id: 5 }))
            .await
            .unwrap();
        assert_eq!(result.id, 5);
        assert!(result.deleted);
    }

    #[tokio::test]
    async fn analyze_prescription_suggests_frequency() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ai/analyze-prescription"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "ok",
                "analysis": {"name": "Amoxicillin", "strength": "500mg", "frequency": "three times daily"},
                "confidence": "high",
                "media_file_id": 4
            })))
            .mount(&server)
            .await;
        let handler = handler_for(&server);
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("box.png");
        std::fs::write(&image, b"\x89PNG fake").unwrap();

        let Json(result) = handler
            .analyze_prescription(Parameters(ImagePathParams {
                path: image.display().to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(result.suggested_medication.name, "Amoxicillin");
        assert_eq!(result.suggested_frequency.as_deref(), Some("three_times_daily"));
        assert_eq!(result.doses_per_day, Some(3.0));
    }
}
