//! Request and response shapes of the CapsuleCare REST API.

use schemars::JsonSchema;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

use crate::CapsuleCareError;

fn default_true() -> bool {
    true
}

fn default_one() -> u32 {
    1
}

/// Keeps string timestamps and drops anything else, so one bad record never
/// fails a whole page.
fn deserialize_lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

fn expose<S>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(secret.expose_secret())
}

// === Auth ===

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<Gender>,
    pub language: Option<String>,
    pub profile_image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub email_verified: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub last_login: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
}

/// Returned by both `/auth/login` and `/auth/register`.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
    pub message: Option<String>,
    pub access_token: SecretString,
    pub user: User,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
    pub reset_url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TokenVerification {
    pub valid: bool,
    pub email: Option<String>,
    pub error: Option<String>,
}

// === Medications ===

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Medication {
    pub id: i64,
    pub name: String,
    pub generic_name: Option<String>,
    pub brand_name: Option<String>,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
    pub dosage_form: Option<String>,
    pub strength: Option<String>,
    pub route_of_administration: Option<String>,
    pub uses: Option<String>,
    pub contraindications: Option<String>,
    pub storage_instructions: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub requires_prescription: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct NewMedication {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage_form: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_of_administration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_prescription: Option<bool>,
}

/// A medication the user tracks, linked to a catalog entry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct UserMedication {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub medication_id: i64,
    pub custom_name: Option<String>,
    pub prescribed_dosage: Option<String>,
    /// Frequency code such as `twice_daily`; see [`crate::frequency`].
    pub prescribed_frequency: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub doctor_instructions: Option<String>,
    pub notes: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub medication: Option<Medication>,
}

impl UserMedication {
    /// Custom name first, then the catalog name.
    pub fn display_name(&self) -> String {
        self.custom_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.medication.as_ref().map(|m| m.name.clone()))
            .unwrap_or_else(|| format!("medication #{}", self.id))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CreateUserMedicationRequest {
    pub medication_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescribed_dosage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescribed_frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// === Doctors ===

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Doctor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Primary,
    Specialist,
    Other,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct UserDoctor {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    pub doctor_id: i64,
    pub relationship_type: Option<RelationshipType>,
    #[serde(default)]
    pub is_primary: bool,
    pub relationship_start_date: Option<String>,
    pub relationship_end_date: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub doctor: Option<Doctor>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CreateDoctorRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CreateUserDoctorRequest {
    pub doctor_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<RelationshipType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// === Reminders ===

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyType {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Custom,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Reminder {
    pub id: i64,
    pub user_medication_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Time of day, `HH:MM`.
    pub reminder_time: Option<String>,
    pub time_of_week: Option<String>,
    #[serde(default)]
    pub frequency_type: FrequencyType,
    #[serde(default = "default_one")]
    pub frequency_value: u32,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub event_enabled: bool,
    #[serde(default)]
    pub calendar_reminder: bool,
    #[serde(default)]
    pub push_notification: bool,
    #[serde(default)]
    pub email_notification: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub medication: Option<Medication>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CreateReminderRequest {
    pub user_medication_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_of_week: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_type: Option<FrequencyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_value: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_reminder: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_notification: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_notification: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReminderLogStatus {
    Pending,
    Sent,
    Acknowledged,
    Missed,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ReminderLog {
    pub id: i64,
    pub reminder_id: i64,
    pub scheduled_time: Option<String>,
    pub actual_time: Option<String>,
    pub status: ReminderLogStatus,
    pub notes: Option<String>,
    pub log_metadata: Option<serde_json::Value>,
    pub created_at: Option<String>,
}

// === Prescriptions ===

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Active,
    Expired,
    Cancelled,
}

impl PrescriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Prescription {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    pub doctor_id: Option<i64>,
    pub medication_id: Option<i64>,
    pub prescription_number: Option<String>,
    pub prescribed_date: Option<String>,
    pub expiry_date: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub quantity: Option<u32>,
    pub refills_remaining: Option<u32>,
    pub instructions: Option<String>,
    pub status: PrescriptionStatus,
    pub notes: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CreatePrescriptionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medication_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescription_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescribed_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refills_remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PrescriptionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// === Notifications & intakes ===

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
    Read,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Read => "read",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    #[default]
    Push,
    Email,
    Sms,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Notification {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    pub reminder_id: Option<i64>,
    pub notification_type: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub delivery_method: DeliveryMethod,
    pub scheduled_at: Option<String>,
    pub sent_at: Option<String>,
    pub read_at: Option<String>,
    pub status: NotificationStatus,
    #[serde(default)]
    pub retry_count: u32,
    pub error_message: Option<String>,
    pub created_at: Option<String>,
}

impl Notification {
    pub fn is_unread(&self) -> bool {
        self.read_at.is_none() && self.status != NotificationStatus::Read
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStatus {
    Taken,
    Missed,
    Skipped,
    #[serde(other)]
    Unknown,
}

/// A logged dose event.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct MedicationIntake {
    pub id: i64,
    pub user_medication_id: i64,
    pub reminder_log_id: Option<i64>,
    /// ISO timestamp as sent by the backend; only its `YYYY-MM-DD` prefix is
    /// used for day bucketing. Non-string values decode as `None`.
    #[serde(default, deserialize_with = "deserialize_lenient_timestamp")]
    pub status_at: Option<String>,
    pub dosage_taken: Option<String>,
    pub status: IntakeStatus,
    pub notes: Option<String>,
    pub side_effects_reported: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CreateMedicationIntakeRequest {
    pub user_medication_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_log_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage_taken: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IntakeStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side_effects_reported: Option<String>,
}

// === User account ===

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct UpdateUserProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct UserSetting {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    pub setting_key: String,
    pub setting_value: Option<String>,
    pub data_type: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct NewUserSetting {
    pub setting_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setting_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct EmergencyContact {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    pub name: String,
    pub relationship: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub notify_missed_doses: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CreateEmergencyContactRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_missed_doses: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub action: Option<String>,
    pub old_data: Option<serde_json::Value>,
    pub new_data: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<String>,
}

// === Media & AI ===

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct MediaFile {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    pub related_entity_id: Option<i64>,
    pub related_entity_type: Option<String>,
    pub original_name: Option<String>,
    pub file_path: String,
    pub file_type: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
    pub file_metadata: Option<serde_json::Value>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_processed: bool,
    pub ai_analysis_result: Option<serde_json::Value>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Medication details read off a prescription or box photo.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct AnalyzedMedication {
    pub name: String,
    pub generic_name: Option<String>,
    pub brand_name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub instructions: Option<String>,
    pub notes: Option<String>,
    pub manufacturer: Option<String>,
    pub strength: Option<String>,
    pub route_of_administration: Option<String>,
}

impl AnalyzedMedication {
    /// Catalog entry pre-filled from the analysis.
    pub fn to_new_medication(&self) -> NewMedication {
        NewMedication {
            name: self.name.clone(),
            generic_name: self.generic_name.clone(),
            brand_name: self.brand_name.clone(),
            description: self.instructions.clone(),
            manufacturer: self.manufacturer.clone(),
            dosage_form: None,
            strength: self.strength.clone(),
            route_of_administration: self.route_of_administration.clone(),
            requires_prescription: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct PrescriptionAnalysis {
    pub message: Option<String>,
    pub analysis: AnalyzedMedication,
    #[serde(default)]
    pub confidence: String,
    pub media_file_id: Option<i64>,
    pub file_path: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ExtractedText {
    pub text: String,
    pub file_path: Option<String>,
}

/// An image (or PDF) sent as the multipart `file` field of the AI endpoints.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, CapsuleCareError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CapsuleCareError::Io(format!("{}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let mime_type = mime_for_extension(path).to_string();
        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }
}

fn mime_for_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

// === Pagination ===

/// Paginated list. The backend names the list after the entity, so every
/// known key maps onto `items`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct Page<T> {
    #[serde(
        default,
        alias = "medications",
        alias = "doctors",
        alias = "prescriptions",
        alias = "reminders",
        alias = "notifications",
        alias = "logs",
        alias = "contacts",
        alias = "settings",
        alias = "intakes",
        alias = "media_files"
    )]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "default_one")]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub pages: u32,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 20;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

impl PageQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.unwrap_or(DEFAULT_PAGE).to_string()),
            (
                "per_page",
                self.per_page.unwrap_or(DEFAULT_PER_PAGE).to_string(),
            ),
            ("search", self.search.clone().unwrap_or_default()),
        ]
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct NotificationQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<NotificationStatus>,
    #[serde(default)]
    pub unread_only: bool,
}

impl NotificationQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.unwrap_or(DEFAULT_PAGE).to_string()),
            (
                "per_page",
                self.per_page.unwrap_or(DEFAULT_PER_PAGE).to_string(),
            ),
            ("unread_only", self.unread_only.to_string()),
        ];
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        pairs
    }
}
