//! `CapsuleCareClient` trait, the reqwest implementation and the adherence
//! aggregator that turns intake history into per-day compliance.

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

pub mod adherence;
pub mod config;
pub mod frequency;
pub mod history;
pub mod http_client;
pub mod models;
pub mod observability;
pub mod retry;
pub mod session;
pub mod utils;

pub use adherence::{
    AdherenceReport, AdherenceSummary, COMPLIANCE_THRESHOLD, Classification, DateWindow,
    DayAdherence, compute_adherence,
};
pub use frequency::{FrequencyCode, expected_doses_per_day};
pub use history::{History, load_history};
pub use http_client::ReqwestCapsuleCareClient;
pub use models::*;
pub use session::Session;

#[derive(Debug, Error)]
pub enum CapsuleCareError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("io error: {0}")]
    Io(String),
}

impl CapsuleCareError {
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 | 422 => Self::InvalidInput(message),
            401 | 403 => Self::Auth(message),
            404 => Self::NotFound(message),
            _ => Self::Api { status, message },
        }
    }

    /// Timeouts, connection failures, 429 and 5xx. Safe to retry for reads.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[async_trait]
pub trait CapsuleCareClient: Send + Sync + 'static {
    // === Auth ===

    /// Create an account; the returned token is stored in the session.
    async fn register(&self, request: &RegisterRequest) -> Result<LoginResponse, CapsuleCareError>;
    /// Log in; the returned token is stored in the session.
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, CapsuleCareError>;
    /// Forget the local token and user. No request is sent.
    async fn logout(&self) -> Result<(), CapsuleCareError>;
    async fn get_profile(&self) -> Result<User, CapsuleCareError>;
    async fn forgot_password(&self, email: &str) -> Result<MessageResponse, CapsuleCareError>;
    async fn verify_reset_token(&self, token: &str)
    -> Result<TokenVerification, CapsuleCareError>;
    async fn reset_password(
        &self,
        token: &str,
        password: &SecretString,
    ) -> Result<MessageResponse, CapsuleCareError>;

    // === Medication catalog ===

    async fn get_medications(&self, query: &PageQuery)
    -> Result<Page<Medication>, CapsuleCareError>;
    async fn get_medication(&self, id: i64) -> Result<Medication, CapsuleCareError>;
    async fn create_medication(
        &self,
        medication: &NewMedication,
    ) -> Result<Medication, CapsuleCareError>;
    async fn update_medication(
        &self,
        id: i64,
        fields: &serde_json::Value,
    ) -> Result<Medication, CapsuleCareError>;
    async fn delete_medication(&self, id: i64) -> Result<(), CapsuleCareError>;

    // === User medications ===

    async fn get_user_medications(&self) -> Result<Vec<UserMedication>, CapsuleCareError>;
    async fn get_user_medication(&self, id: i64) -> Result<UserMedication, CapsuleCareError>;
    async fn add_user_medication(
        &self,
        request: &CreateUserMedicationRequest,
    ) -> Result<UserMedication, CapsuleCareError>;
    async fn update_user_medication(
        &self,
        id: i64,
        fields: &serde_json::Value,
    ) -> Result<UserMedication, CapsuleCareError>;
    async fn delete_user_medication(&self, id: i64) -> Result<(), CapsuleCareError>;

    // === Doctors ===

    async fn get_doctors(&self, query: &PageQuery) -> Result<Page<Doctor>, CapsuleCareError>;
    async fn get_doctor(&self, id: i64) -> Result<Doctor, CapsuleCareError>;
    async fn create_doctor(&self, doctor: &CreateDoctorRequest)
    -> Result<Doctor, CapsuleCareError>;
    async fn update_doctor(
        &self,
        id: i64,
        fields: &serde_json::Value,
    ) -> Result<Doctor, CapsuleCareError>;
    async fn delete_doctor(&self, id: i64) -> Result<(), CapsuleCareError>;
    async fn get_user_doctors(&self) -> Result<Vec<UserDoctor>, CapsuleCareError>;
    async fn add_user_doctor(
        &self,
        request: &CreateUserDoctorRequest,
    ) -> Result<UserDoctor, CapsuleCareError>;
    async fn update_user_doctor(
        &self,
        id: i64,
        fields: &serde_json::Value,
    ) -> Result<UserDoctor, CapsuleCareError>;
    async fn delete_user_doctor(&self, id: i64) -> Result<(), CapsuleCareError>;

    // === Reminders ===

    async fn get_reminders(&self) -> Result<Vec<Reminder>, CapsuleCareError>;
    async fn get_reminder(&self, id: i64) -> Result<Reminder, CapsuleCareError>;
    async fn create_reminder(
        &self,
        request: &CreateReminderRequest,
    ) -> Result<Reminder, CapsuleCareError>;
    async fn update_reminder(
        &self,
        id: i64,
        fields: &serde_json::Value,
    ) -> Result<Reminder, CapsuleCareError>;
    async fn delete_reminder(&self, id: i64) -> Result<(), CapsuleCareError>;
    async fn get_reminder_logs(
        &self,
        reminder_id: i64,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Page<ReminderLog>, CapsuleCareError>;
    async fn update_reminder_log(
        &self,
        log_id: i64,
        fields: &serde_json::Value,
    ) -> Result<ReminderLog, CapsuleCareError>;

    // === Prescriptions ===

    async fn get_prescriptions(
        &self,
        status: Option<PrescriptionStatus>,
    ) -> Result<Vec<Prescription>, CapsuleCareError>;
    async fn get_prescription(&self, id: i64) -> Result<Prescription, CapsuleCareError>;
    async fn create_prescription(
        &self,
        request: &CreatePrescriptionRequest,
    ) -> Result<Prescription, CapsuleCareError>;
    async fn update_prescription(
        &self,
        id: i64,
        fields: &serde_json::Value,
    ) -> Result<Prescription, CapsuleCareError>;
    async fn delete_prescription(&self, id: i64) -> Result<(), CapsuleCareError>;

    // === Notifications & intakes ===

    async fn get_notifications(
        &self,
        query: &NotificationQuery,
    ) -> Result<Page<Notification>, CapsuleCareError>;
    async fn get_notification(&self, id: i64) -> Result<Notification, CapsuleCareError>;
    async fn mark_notification_read(&self, id: i64) -> Result<Notification, CapsuleCareError>;
    async fn mark_all_notifications_read(&self) -> Result<MessageResponse, CapsuleCareError>;
    async fn delete_notification(&self, id: i64) -> Result<(), CapsuleCareError>;
    /// One page of the intake history, newest first as the backend orders it.
    async fn get_medication_intakes(
        &self,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Page<MedicationIntake>, CapsuleCareError>;
    async fn create_medication_intake(
        &self,
        request: &CreateMedicationIntakeRequest,
    ) -> Result<MedicationIntake, CapsuleCareError>;
    async fn update_medication_intake(
        &self,
        id: i64,
        fields: &serde_json::Value,
    ) -> Result<MedicationIntake, CapsuleCareError>;

    // === User account ===

    async fn get_user_profile(&self) -> Result<User, CapsuleCareError>;
    async fn update_user_profile(
        &self,
        request: &UpdateUserProfileRequest,
    ) -> Result<User, CapsuleCareError>;
    async fn get_user_settings(&self) -> Result<Vec<UserSetting>, CapsuleCareError>;
    async fn create_user_setting(
        &self,
        setting: &NewUserSetting,
    ) -> Result<UserSetting, CapsuleCareError>;
    async fn update_user_setting(
        &self,
        id: i64,
        fields: &serde_json::Value,
    ) -> Result<UserSetting, CapsuleCareError>;
    async fn delete_user_setting(&self, id: i64) -> Result<(), CapsuleCareError>;
    async fn get_emergency_contacts(&self) -> Result<Vec<EmergencyContact>, CapsuleCareError>;
    async fn create_emergency_contact(
        &self,
        request: &CreateEmergencyContactRequest,
    ) -> Result<EmergencyContact, CapsuleCareError>;
    async fn update_emergency_contact(
        &self,
        id: i64,
        fields: &serde_json::Value,
    ) -> Result<EmergencyContact, CapsuleCareError>;
    async fn delete_emergency_contact(&self, id: i64) -> Result<(), CapsuleCareError>;
    async fn get_activity_logs(
        &self,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Page<ActivityLog>, CapsuleCareError>;

    // === Media & AI ===

    async fn get_media_files(
        &self,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Page<MediaFile>, CapsuleCareError>;
    async fn delete_media_file(&self, id: i64) -> Result<(), CapsuleCareError>;
    /// Upload a prescription or medication box photo for AI analysis.
    async fn analyze_prescription(
        &self,
        upload: ImageUpload,
    ) -> Result<PrescriptionAnalysis, CapsuleCareError>;
    async fn extract_text(&self, upload: ImageUpload) -> Result<ExtractedText, CapsuleCareError>;
}
