//! HTTP client implementation for the CapsuleCare API.
//!
//! This module provides a reqwest-based implementation of the
//! [`CapsuleCareClient`](crate::CapsuleCareClient) trait.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Instant;

use crate::config::Config;
use crate::models::*;
use crate::observability::record_request;
use crate::retry::RetryPolicy;
use crate::session::Session;
use crate::{CapsuleCareClient, CapsuleCareError};

const BODY_SNIPPET_CHARS: usize = 256;

/// Client for the CapsuleCare API using reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestCapsuleCareClient {
    base_url: String,
    session: Session,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ReqwestCapsuleCareClient {
    /// Create a new client instance.
    ///
    /// # Arguments
    /// * `base_url` - API root including the `/api` prefix (e.g. "http://localhost:5000/api")
    /// * `session` - Shared auth state; login and register write to it
    pub fn new(base_url: &str, session: Session) -> Self {
        Self::with_http_client(base_url, session, reqwest::Client::new())
    }

    fn with_http_client(base_url: &str, session: Session, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            client,
            retry: RetryPolicy::default(),
        }
    }

    /// Build a client from configuration, seeding the session with the
    /// configured token if there is one.
    pub fn from_config(config: &Config) -> Result<Self, CapsuleCareError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CapsuleCareError::Config(format!("building http client: {e}")))?;
        let session = match &config.token {
            Some(token) => Session::with_token(token.clone()),
            None => Session::new(),
        };
        Ok(Self::with_http_client(&config.base_url, session, http)
            .with_retry_policy(RetryPolicy::with_max_retries(config.max_retries)))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Attach the bearer token when the session has one.
    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    fn get_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorized(self.client.get(url))
    }

    fn post_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorized(self.client.post(url))
    }

    fn put_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorized(self.client.put(url))
    }

    fn delete_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorized(self.client.delete(url))
    }

    /// Send a request, record metrics and turn non-success statuses into errors.
    async fn send(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, CapsuleCareError> {
        let started = Instant::now();
        match request.send().await {
            Ok(resp) => {
                record_request(operation, resp.status().as_str(), started.elapsed());
                if resp.status().is_success() {
                    Ok(resp)
                } else {
                    Err(self.error_from_response(resp).await)
                }
            }
            Err(e) => {
                record_request(operation, "error", started.elapsed());
                Err(e.into())
            }
        }
    }

    /// GET with retries on transient failures, unwrapping `key` if present.
    async fn get_json<T>(
        &self,
        operation: &'static str,
        url: &str,
        query: &[(&str, String)],
        key: Option<&str>,
    ) -> Result<T, CapsuleCareError>
    where
        T: DeserializeOwned + Send,
    {
        self.retry
            .retry_async_if(
                operation,
                move || async move {
                    let resp = self
                        .send(operation, self.get_request(url).query(query))
                        .await?;
                    let value = read_json(resp).await?;
                    match key {
                        Some(key) => unwrap_envelope(value, key),
                        None => decode_value(value),
                    }
                },
                CapsuleCareError::is_transient,
            )
            .await
    }

    /// Execute a mutation and decode the entity out of its `{ message, <key> }` envelope.
    async fn execute_enveloped<T>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
        key: &str,
    ) -> Result<T, CapsuleCareError>
    where
        T: DeserializeOwned,
    {
        let resp = self.send(operation, request).await?;
        unwrap_envelope(read_json(resp).await?, key)
    }

    /// Execute a request and decode the whole body.
    async fn execute_json<T>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, CapsuleCareError>
    where
        T: DeserializeOwned,
    {
        let resp = self.send(operation, request).await?;
        decode_value(read_json(resp).await?)
    }

    /// Execute a request with no interesting response body.
    async fn execute_empty(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<(), CapsuleCareError> {
        self.send(operation, request).await?;
        Ok(())
    }

    /// Extract error information from a failed response.
    async fn error_from_response(&self, resp: reqwest::Response) -> CapsuleCareError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        CapsuleCareError::from_status(status, error_message(&body))
    }

    fn remember_login(&self, response: &LoginResponse) {
        self.session
            .set_credentials(response.access_token.clone(), response.user.clone());
        tracing::info!(user = %response.user.username, "logged in");
    }
}

/// Read the body as text first so decode failures can quote it.
async fn read_json(resp: reqwest::Response) -> Result<Value, CapsuleCareError> {
    let text = resp.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| {
        let body_snippet: String = text.chars().take(BODY_SNIPPET_CHARS).collect();
        CapsuleCareError::Decode(format!("{} - body: {}", e, body_snippet))
    })
}

fn decode_value<T: DeserializeOwned>(value: Value) -> Result<T, CapsuleCareError> {
    serde_json::from_value(value).map_err(|e| CapsuleCareError::Decode(e.to_string()))
}

/// `{ "message": ..., "<key>": entity }` -> entity. Bodies without the key
/// are decoded as the entity itself.
fn unwrap_envelope<T: DeserializeOwned>(value: Value, key: &str) -> Result<T, CapsuleCareError> {
    let inner = match value {
        Value::Object(mut map) => match map.remove(key) {
            Some(v) => v,
            None => Value::Object(map),
        },
        other => other,
    };
    serde_json::from_value(inner).map_err(|e| CapsuleCareError::Decode(format!("{key}: {e}")))
}

/// Prefer the API's `error`/`message` field over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "message", "msg"]
                .iter()
                .find_map(|k| v.get(k).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.chars().take(BODY_SNIPPET_CHARS).collect())
}

fn page_pairs(page: Option<u32>, per_page: Option<u32>) -> Vec<(&'static str, String)> {
    vec![
        ("page", page.unwrap_or(DEFAULT_PAGE).to_string()),
        ("per_page", per_page.unwrap_or(DEFAULT_PER_PAGE).to_string()),
    ]
}

fn multipart_form(upload: ImageUpload) -> Result<reqwest::multipart::Form, CapsuleCareError> {
    if upload.bytes.is_empty() {
        return Err(CapsuleCareError::InvalidInput(format!(
            "{} is empty",
            upload.file_name
        )));
    }
    let mime = upload.mime_type;
    let part = reqwest::multipart::Part::bytes(upload.bytes)
        .file_name(upload.file_name)
        .mime_str(&mime)
        .map_err(|e| CapsuleCareError::InvalidInput(format!("mime type {mime}: {e}")))?;
    Ok(reqwest::multipart::Form::new().part("file", part))
}

#[async_trait]
impl CapsuleCareClient for ReqwestCapsuleCareClient {
    // === Auth ===

    async fn register(&self, request: &RegisterRequest) -> Result<LoginResponse, CapsuleCareError> {
        let url = format!("{}/auth/register", self.base_url);
        let response: LoginResponse = self
            .execute_json("register", self.client.post(&url).json(request))
            .await?;
        self.remember_login(&response);
        Ok(response)
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, CapsuleCareError> {
        let url = format!("{}/auth/login", self.base_url);
        let response: LoginResponse = self
            .execute_json("login", self.client.post(&url).json(request))
            .await?;
        self.remember_login(&response);
        Ok(response)
    }

    async fn logout(&self) -> Result<(), CapsuleCareError> {
        self.session.clear();
        tracing::info!("logged out");
        Ok(())
    }

    async fn get_profile(&self) -> Result<User, CapsuleCareError> {
        let url = format!("{}/auth/profile", self.base_url);
        let user: User = self.get_json("get_profile", &url, &[], Some("user")).await?;
        self.session.set_user(user.clone());
        Ok(user)
    }

    async fn forgot_password(&self, email: &str) -> Result<MessageResponse, CapsuleCareError> {
        let url = format!("{}/auth/forgot-password", self.base_url);
        self.execute_json(
            "forgot_password",
            self.client.post(&url).json(&json!({ "email": email })),
        )
        .await
    }

    async fn verify_reset_token(
        &self,
        token: &str,
    ) -> Result<TokenVerification, CapsuleCareError> {
        let url = format!("{}/auth/verify-reset-token", self.base_url);
        self.execute_json(
            "verify_reset_token",
            self.client.post(&url).json(&json!({ "token": token })),
        )
        .await
    }

    async fn reset_password(
        &self,
        token: &str,
        password: &SecretString,
    ) -> Result<MessageResponse, CapsuleCareError> {
        let url = format!("{}/auth/reset-password", self.base_url);
        let body = json!({ "token": token, "password": password.expose_secret() });
        self.execute_json("reset_password", self.client.post(&url).json(&body))
            .await
    }

    // === Medication catalog ===

    async fn get_medications(
        &self,
        query: &PageQuery,
    ) -> Result<Page<Medication>, CapsuleCareError> {
        let url = format!("{}/medications", self.base_url);
        self.get_json("get_medications", &url, &query.to_pairs(), None)
            .await
    }

    async fn get_medication(&self, id: i64) -> Result<Medication, CapsuleCareError> {
        let url = format!("{}/medications/{}", self.base_url, id);
        self.get_json("get_medication", &url, &[], Some("medication"))
            .await
    }

    async fn create_medication(
        &self,
        medication: &NewMedication,
    ) -> Result<Medication, CapsuleCareError> {
        let url = format!("{}/medications", self.base_url);
        self.execute_enveloped(
            "create_medication",
            self.post_request(&url).json(medication),
            "medication",
        )
        .await
    }

    async fn update_medication(
        &self,
        id: i64,
        fields: &Value,
    ) -> Result<Medication, CapsuleCareError> {
        let url = format!("{}/medications/{}", self.base_url, id);
        self.execute_enveloped(
            "update_medication",
            self.put_request(&url).json(fields),
            "medication",
        )
        .await
    }

    async fn delete_medication(&self, id: i64) -> Result<(), CapsuleCareError> {
        let url = format!("{}/medications/{}", self.base_url, id);
        self.execute_empty("delete_medication", self.delete_request(&url))
            .await
    }

    // === User medications ===

    async fn get_user_medications(&self) -> Result<Vec<UserMedication>, CapsuleCareError> {
        let url = format!("{}/medications/user", self.base_url);
        self.get_json("get_user_medications", &url, &[], Some("medications"))
            .await
    }

    async fn get_user_medication(&self, id: i64) -> Result<UserMedication, CapsuleCareError> {
        let url = format!("{}/medications/user/{}", self.base_url, id);
        self.get_json("get_user_medication", &url, &[], Some("user_medication"))
            .await
    }

    async fn add_user_medication(
        &self,
        request: &CreateUserMedicationRequest,
    ) -> Result<UserMedication, CapsuleCareError> {
        let url = format!("{}/medications/user", self.base_url);
        self.execute_enveloped(
            "add_user_medication",
            self.post_request(&url).json(request),
            "user_medication",
        )
        .await
    }

    async fn update_user_medication(
        &self,
        id: i64,
        fields: &Value,
    ) -> Result<UserMedication, CapsuleCareError> {
        let url = format!("{}/medications/user/{}", self.base_url, id);
        self.execute_enveloped(
            "update_user_medication",
            self.put_request(&url).json(fields),
            "user_medication",
        )
        .await
    }

    async fn delete_user_medication(&self, id: i64) -> Result<(), CapsuleCareError> {
        let url = format!("{}/medications/user/{}", self.base_url, id);
        self.execute_empty("delete_user_medication", self.delete_request(&url))
            .await
    }

    // === Doctors ===

    async fn get_doctors(&self, query: &PageQuery) -> Result<Page<Doctor>, CapsuleCareError> {
        let url = format!("{}/doctors", self.base_url);
        self.get_json("get_doctors", &url, &query.to_pairs(), None)
            .await
    }

    async fn get_doctor(&self, id: i64) -> Result<Doctor, CapsuleCareError> {
        let url = format!("{}/doctors/{}", self.base_url, id);
        self.get_json("get_doctor", &url, &[], Some("doctor")).await
    }

    async fn create_doctor(
        &self,
        doctor: &CreateDoctorRequest,
    ) -> Result<Doctor, CapsuleCareError> {
        let url = format!("{}/doctors", self.base_url);
        self.execute_enveloped("create_doctor", self.post_request(&url).json(doctor), "doctor")
            .await
    }

    async fn update_doctor(&self, id: i64, fields: &Value) -> Result<Doctor, CapsuleCareError> {
        let url = format!("{}/doctors/{}", self.base_url, id);
        self.execute_enveloped("update_doctor", self.put_request(&url).json(fields), "doctor")
            .await
    }

    async fn delete_doctor(&self, id: i64) -> Result<(), CapsuleCareError> {
        let url = format!("{}/doctors/{}", self.base_url, id);
        self.execute_empty("delete_doctor", self.delete_request(&url))
            .await
    }

    async fn get_user_doctors(&self) -> Result<Vec<UserDoctor>, CapsuleCareError> {
        let url = format!("{}/doctors/user", self.base_url);
        self.get_json("get_user_doctors", &url, &[], Some("doctors"))
            .await
    }

    async fn add_user_doctor(
        &self,
        request: &CreateUserDoctorRequest,
    ) -> Result<UserDoctor, CapsuleCareError> {
        let url = format!("{}/doctors/user", self.base_url);
        self.execute_enveloped(
            "add_user_doctor",
            self.post_request(&url).json(request),
            "user_doctor",
        )
        .await
    }

    async fn update_user_doctor(
        &self,
        id: i64,
        fields: &Value,
    ) -> Result<UserDoctor, CapsuleCareError> {
        let url = format!("{}/doctors/user/{}", self.base_url, id);
        self.execute_enveloped(
            "update_user_doctor",
            self.put_request(&url).json(fields),
            "user_doctor",
        )
        .await
    }

    async fn delete_user_doctor(&self, id: i64) -> Result<(), CapsuleCareError> {
        let url = format!("{}/doctors/user/{}", self.base_url, id);
        self.execute_empty("delete_user_doctor", self.delete_request(&url))
            .await
    }

    // === Reminders ===

    async fn get_reminders(&self) -> Result<Vec<Reminder>, CapsuleCareError> {
        let url = format!("{}/reminders", self.base_url);
        self.get_json("get_reminders", &url, &[], Some("reminders"))
            .await
    }

    async fn get_reminder(&self, id: i64) -> Result<Reminder, CapsuleCareError> {
        let url = format!("{}/reminders/{}", self.base_url, id);
        self.get_json("get_reminder", &url, &[], Some("reminder"))
            .await
    }

    async fn create_reminder(
        &self,
        request: &CreateReminderRequest,
    ) -> Result<Reminder, CapsuleCareError> {
        let url = format!("{}/reminders", self.base_url);
        self.execute_enveloped(
            "create_reminder",
            self.post_request(&url).json(request),
            "reminder",
        )
        .await
    }

    async fn update_reminder(
        &self,
        id: i64,
        fields: &Value,
    ) -> Result<Reminder, CapsuleCareError> {
        let url = format!("{}/reminders/{}", self.base_url, id);
        self.execute_enveloped(
            "update_reminder",
            self.put_request(&url).json(fields),
            "reminder",
        )
        .await
    }

    async fn delete_reminder(&self, id: i64) -> Result<(), CapsuleCareError> {
        let url = format!("{}/reminders/{}", self.base_url, id);
        self.execute_empty("delete_reminder", self.delete_request(&url))
            .await
    }

    async fn get_reminder_logs(
        &self,
        reminder_id: i64,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Page<ReminderLog>, CapsuleCareError> {
        let url = format!("{}/reminders/{}/logs", self.base_url, reminder_id);
        self.get_json("get_reminder_logs", &url, &page_pairs(page, per_page), None)
            .await
    }

    async fn update_reminder_log(
        &self,
        log_id: i64,
        fields: &Value,
    ) -> Result<ReminderLog, CapsuleCareError> {
        let url = format!("{}/reminders/logs/{}", self.base_url, log_id);
        self.execute_enveloped(
            "update_reminder_log",
            self.put_request(&url).json(fields),
            "log",
        )
        .await
    }

    // === Prescriptions ===

    async fn get_prescriptions(
        &self,
        status: Option<PrescriptionStatus>,
    ) -> Result<Vec<Prescription>, CapsuleCareError> {
        let url = format!("{}/prescriptions", self.base_url);
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(status) = status {
            pairs.push(("status", status.as_str().to_string()));
        }
        self.get_json("get_prescriptions", &url, &pairs, Some("prescriptions"))
            .await
    }

    async fn get_prescription(&self, id: i64) -> Result<Prescription, CapsuleCareError> {
        let url = format!("{}/prescriptions/{}", self.base_url, id);
        self.get_json("get_prescription", &url, &[], Some("prescription"))
            .await
    }

    async fn create_prescription(
        &self,
        request: &CreatePrescriptionRequest,
    ) -> Result<Prescription, CapsuleCareError> {
        let url = format!("{}/prescriptions", self.base_url);
        self.execute_enveloped(
            "create_prescription",
            self.post_request(&url).json(request),
            "prescription",
        )
        .await
    }

    async fn update_prescription(
        &self,
        id: i64,
        fields: &Value,
    ) -> Result<Prescription, CapsuleCareError> {
        let url = format!("{}/prescriptions/{}", self.base_url, id);
        self.execute_enveloped(
            "update_prescription",
            self.put_request(&url).json(fields),
            "prescription",
        )
        .await
    }

    async fn delete_prescription(&self, id: i64) -> Result<(), CapsuleCareError> {
        let url = format!("{}/prescriptions/{}", self.base_url, id);
        self.execute_empty("delete_prescription", self.delete_request(&url))
            .await
    }

    // === Notifications & intakes ===

    async fn get_notifications(
        &self,
        query: &NotificationQuery,
    ) -> Result<Page<Notification>, CapsuleCareError> {
        let url = format!("{}/notifications", self.base_url);
        self.get_json("get_notifications", &url, &query.to_pairs(), None)
            .await
    }

    async fn get_notification(&self, id: i64) -> Result<Notification, CapsuleCareError> {
        let url = format!("{}/notifications/{}", self.base_url, id);
        self.get_json("get_notification", &url, &[], Some("notification"))
            .await
    }

    async fn mark_notification_read(&self, id: i64) -> Result<Notification, CapsuleCareError> {
        let url = format!("{}/notifications/{}/read", self.base_url, id);
        self.execute_enveloped(
            "mark_notification_read",
            self.put_request(&url),
            "notification",
        )
        .await
    }

    async fn mark_all_notifications_read(&self) -> Result<MessageResponse, CapsuleCareError> {
        let url = format!("{}/notifications/mark-all-read", self.base_url);
        self.execute_json("mark_all_notifications_read", self.put_request(&url))
            .await
    }

    async fn delete_notification(&self, id: i64) -> Result<(), CapsuleCareError> {
        let url = format!("{}/notifications/{}", self.base_url, id);
        self.execute_empty("delete_notification", self.delete_request(&url))
            .await
    }

    async fn get_medication_intakes(
        &self,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Page<MedicationIntake>, CapsuleCareError> {
        let url = format!("{}/notifications/intake", self.base_url);
        self.get_json(
            "get_medication_intakes",
            &url,
            &page_pairs(page, per_page),
            None,
        )
        .await
    }

    async fn create_medication_intake(
        &self,
        request: &CreateMedicationIntakeRequest,
    ) -> Result<MedicationIntake, CapsuleCareError> {
        let url = format!("{}/notifications/intake", self.base_url);
        self.execute_enveloped(
            "create_medication_intake",
            self.post_request(&url).json(request),
            "intake",
        )
        .await
    }

    async fn update_medication_intake(
        &self,
        id: i64,
        fields: &Value,
    ) -> Result<MedicationIntake, CapsuleCareError> {
        let url = format!("{}/notifications/intake/{}", self.base_url, id);
        self.execute_enveloped(
            "update_medication_intake",
            self.put_request(&url).json(fields),
            "intake",
        )
        .await
    }

    // === User account ===

    async fn get_user_profile(&self) -> Result<User, CapsuleCareError> {
        let url = format!("{}/users/profile", self.base_url);
        self.get_json("get_user_profile", &url, &[], Some("user"))
            .await
    }

    async fn update_user_profile(
        &self,
        request: &UpdateUserProfileRequest,
    ) -> Result<User, CapsuleCareError> {
        let url = format!("{}/users/profile", self.base_url);
        let user: User = self
            .execute_enveloped(
                "update_user_profile",
                self.put_request(&url).json(request),
                "user",
            )
            .await?;
        if self.session.user().is_some_and(|u| u.id == user.id) {
            self.session.set_user(user.clone());
        }
        Ok(user)
    }

    async fn get_user_settings(&self) -> Result<Vec<UserSetting>, CapsuleCareError> {
        let url = format!("{}/users/settings", self.base_url);
        self.get_json("get_user_settings", &url, &[], Some("settings"))
            .await
    }

    async fn create_user_setting(
        &self,
        setting: &NewUserSetting,
    ) -> Result<UserSetting, CapsuleCareError> {
        let url = format!("{}/users/settings", self.base_url);
        self.execute_enveloped(
            "create_user_setting",
            self.post_request(&url).json(setting),
            "setting",
        )
        .await
    }

    async fn update_user_setting(
        &self,
        id: i64,
        fields: &Value,
    ) -> Result<UserSetting, CapsuleCareError> {
        let url = format!("{}/users/settings/{}", self.base_url, id);
        self.execute_enveloped(
            "update_user_setting",
            self.put_request(&url).json(fields),
            "setting",
        )
        .await
    }

    async fn delete_user_setting(&self, id: i64) -> Result<(), CapsuleCareError> {
        let url = format!("{}/users/settings/{}", self.base_url, id);
        self.execute_empty("delete_user_setting", self.delete_request(&url))
            .await
    }

    async fn get_emergency_contacts(&self) -> Result<Vec<EmergencyContact>, CapsuleCareError> {
        let url = format!("{}/users/emergency-contacts", self.base_url);
        self.get_json("get_emergency_contacts", &url, &[], Some("contacts"))
            .await
    }

    async fn create_emergency_contact(
        &self,
        request: &CreateEmergencyContactRequest,
    ) -> Result<EmergencyContact, CapsuleCareError> {
        let url = format!("{}/users/emergency-contacts", self.base_url);
        self.execute_enveloped(
            "create_emergency_contact",
            self.post_request(&url).json(request),
            "contact",
        )
        .await
    }

    async fn update_emergency_contact(
        &self,
        id: i64,
        fields: &Value,
    ) -> Result<EmergencyContact, CapsuleCareError> {
        let url = format!("{}/users/emergency-contacts/{}", self.base_url, id);
        self.execute_enveloped(
            "update_emergency_contact",
            self.put_request(&url).json(fields),
            "contact",
        )
        .await
    }

    async fn delete_emergency_contact(&self, id: i64) -> Result<(), CapsuleCareError> {
        let url = format!("{}/users/emergency-contacts/{}", self.base_url, id);
        self.execute_empty("delete_emergency_contact", self.delete_request(&url))
            .await
    }

    async fn get_activity_logs(
        &self,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Page<ActivityLog>, CapsuleCareError> {
        let url = format!("{}/users/activity-logs", self.base_url);
        self.get_json("get_activity_logs", &url, &page_pairs(page, per_page), None)
            .await
    }

    // === Media & AI ===

    async fn get_media_files(
        &self,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Page<MediaFile>, CapsuleCareError> {
        let url = format!("{}/media", self.base_url);
        self.get_json("get_media_files", &url, &page_pairs(page, per_page), None)
            .await
    }

    async fn delete_media_file(&self, id: i64) -> Result<(), CapsuleCareError> {
        let url = format!("{}/media/{}", self.base_url, id);
        self.execute_empty("delete_media_file", self.delete_request(&url))
            .await
    }

    async fn analyze_prescription(
        &self,
        upload: ImageUpload,
    ) -> Result<PrescriptionAnalysis, CapsuleCareError> {
        let url = format!("{}/ai/analyze-prescription", self.base_url);
        let form = multipart_form(upload)?;
        self.execute_json("analyze_prescription", self.post_request(&url).multipart(form))
            .await
    }

    async fn extract_text(&self, upload: ImageUpload) -> Result<ExtractedText, CapsuleCareError> {
        let url = format!("{}/ai/extract-text", self.base_url);
        let form = multipart_form(upload)?;
        self.execute_json("extract_text", self.post_request(&url).multipart(form))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let client = ReqwestCapsuleCareClient::new("http://localhost:5000/api/", Session::new());
        assert_eq!(client.base_url(), "http://localhost:5000/api");
    }

    #[test]
    fn from_config_seeds_session_token() {
        let config = Config {
            token: Some(SecretString::new("tok".into())),
            ..Config::default()
        };
        let client = ReqwestCapsuleCareClient::from_config(&config).expect("client");
        assert!(client.session().is_authenticated());
        assert_eq!(client.retry.max_retries, config.max_retries);
    }

    #[test]
    fn error_message_prefers_json_fields() {
        assert_eq!(error_message(r#"{"error": "Invalid credentials"}"#), "Invalid credentials");
        assert_eq!(error_message(r#"{"message": "Not allowed"}"#), "Not allowed");
        assert_eq!(error_message(r#"{"msg": "Missing Authorization Header"}"#), "Missing Authorization Header");
        assert_eq!(error_message("plain failure"), "plain failure");
        assert_eq!(error_message(&"x".repeat(1000)).len(), 256);
    }

    #[test]
    fn envelope_is_unwrapped_when_present() {
        let wrapped = json!({"message": "ok", "doctor": {"id": 3, "first_name": "Ada", "last_name": "Lee"}});
        let doctor: Doctor = unwrap_envelope(wrapped, "doctor").expect("doctor");
        assert_eq!(doctor.id, 3);

        let bare = json!({"id": 4, "first_name": "Bo", "last_name": "Ng"});
        let doctor: Doctor = unwrap_envelope(bare, "doctor").expect("doctor");
        assert_eq!(doctor.id, 4);
    }

    #[test]
    fn envelope_decode_failure_is_decode_error() {
        let err = unwrap_envelope::<Doctor>(json!({"doctor": "nope"}), "doctor").unwrap_err();
        assert!(matches!(err, CapsuleCareError::Decode(_)));
    }

    #[test]
    fn empty_upload_is_rejected() {
        let upload = ImageUpload {
            file_name: "rx.jpg".into(),
            mime_type: "image/jpeg".into(),
            bytes: Vec::new(),
        };
        assert!(matches!(
            multipart_form(upload),
            Err(CapsuleCareError::InvalidInput(_))
        ));
    }

    #[test]
    fn page_pairs_apply_defaults() {
        let pairs = page_pairs(None, Some(50));
        assert_eq!(
            pairs,
            vec![("page", "1".to_string()), ("per_page", "50".to_string())]
        );
    }
}
