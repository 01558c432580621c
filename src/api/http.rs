use std::sync::RwLock;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroizing;

use super::types::{
    query_date, AppointmentDetailRecord, AppointmentRecord, Envelope, ErrorEnvelope,
    FeedbackRecord, LoginBody, LoginData, MedicalReportRecord, MessageResponse,
    NurseProfileRecord, OptionalEnvelope, PatientRecord, SubmitReportBody,
};
use super::{ApiError, LoginGrant, NursingBackend};
use crate::config::{ApiConfig, ServicePrefixes};
use crate::models::{
    map_appointments, Appointment, AppointmentDetail, Feedback, MedicalReport, NurseProfile,
    PatientSummary,
};

#[derive(Debug, Clone, Copy)]
enum Service {
    Auth,
    Appointment,
    Nurse,
    Patient,
}

/// REST client for the care platform.
pub struct HttpBackend {
    base_url: String,
    prefixes: ServicePrefixes,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    confirm_retries: u32,
    token: RwLock<Option<Zeroizing<String>>>,
}

impl HttpBackend {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::HttpClient(e.to_string()))?;
        Ok(Self::with_client(config, client))
    }

    /// Use a pre-built client (custom TLS, proxy settings, tests).
    pub fn with_client(config: &ApiConfig, client: reqwest::blocking::Client) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            prefixes: config.prefixes.clone(),
            client,
            timeout_secs: config.timeout_secs,
            confirm_retries: config.confirm_retries,
            token: RwLock::new(None),
        }
    }

    fn url(&self, service: Service, path: &str) -> String {
        let prefix = match service {
            Service::Auth => &self.prefixes.auth,
            Service::Appointment => &self.prefixes.appointment,
            Service::Nurse => &self.prefixes.nurse,
            Service::Patient => &self.prefixes.patient,
        };
        let prefix = prefix.trim_matches('/');
        let path = path.trim_start_matches('/');
        if prefix.is_empty() {
            format!("{}/{}", self.base_url, path)
        } else {
            format!("{}/{}/{}", self.base_url, prefix, path)
        }
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.read() {
            Ok(guard) => match guard.as_ref() {
                Some(token) => request.bearer_auth(token.as_str()),
                None => request,
            },
            Err(_) => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        self.with_auth(request).send().map_err(|e| {
            if e.is_connect() {
                ApiError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                ApiError::Timeout(self.timeout_secs)
            } else {
                ApiError::HttpClient(e.to_string())
            }
        })
    }

    /// Turn a non-2xx response into an error, keeping the backend's reason.
    fn check_status(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        let body = response.text().unwrap_or_default();
        let reason = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|e| e.reason())
            .unwrap_or(body);
        Err(ApiError::Rejected {
            status: status.as_u16(),
            reason,
        })
    }

    fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        response
            .json()
            .map_err(|e| ApiError::ResponseParsing(e.to_string()))
    }

    fn get_data<T: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.url(service, path);
        tracing::debug!(%url, "GET");
        let response = self.send(self.client.get(&url).query(query))?;
        let envelope: Envelope<T> = Self::parse(Self::check_status(response)?)?;
        Ok(envelope.data)
    }

    /// GET where 404 or a null `data` means "nothing stored yet".
    fn get_optional<T: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
    ) -> Result<Option<T>, ApiError> {
        let url = self.url(service, path);
        tracing::debug!(%url, "GET (optional)");
        let response = self.send(self.client.get(&url))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let envelope: OptionalEnvelope<T> = Self::parse(Self::check_status(response)?)?;
        Ok(envelope.data)
    }

    fn patch<B: Serialize>(
        &self,
        service: Service,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let url = self.url(service, path);
        tracing::debug!(%url, "PATCH");
        let mut request = self.client.patch(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = Self::check_status(self.send(request)?)?;
        // Write calls answer `{status, message}`; an empty body is fine too.
        let text = response.text().unwrap_or_default();
        if let Ok(msg) = serde_json::from_str::<MessageResponse>(&text) {
            tracing::debug!(status = ?msg.status, message = ?msg.message, "PATCH ok");
        }
        Ok(())
    }
}

impl NursingBackend for HttpBackend {
    fn authorize(&self, access_token: Option<&str>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = access_token.map(|t| Zeroizing::new(t.to_string()));
        }
    }

    fn login(&self, phone_number: &str, password: &str) -> Result<LoginGrant, ApiError> {
        let url = self.url(Service::Auth, "accounts/login");
        tracing::debug!(%url, "POST login");
        let body = LoginBody {
            phone_number,
            password,
        };
        let response = self.send(self.client.post(&url).json(&body))?;
        // 401 on login carries a reason the user needs to see.
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().unwrap_or_default();
            let reason = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.reason())
                .unwrap_or_else(|| "invalid credentials".into());
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }
        let envelope: Envelope<LoginData> = Self::parse(Self::check_status(response)?)?;
        Ok(LoginGrant {
            account: envelope.data.account_info.into(),
            access_token: envelope.data.token.access_token,
        })
    }

    fn nurse_profile(&self) -> Result<NurseProfile, ApiError> {
        let record: NurseProfileRecord = self.get_data(Service::Nurse, "nurses/me", &[])?;
        Ok(record.into())
    }

    fn list_appointments(
        &self,
        nurse_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>, ApiError> {
        let records: Vec<AppointmentRecord> = self.get_data(
            Service::Appointment,
            "appointments",
            &[
                ("nursing-id", nurse_id.to_string()),
                ("est-date-from", query_date(from)),
                ("est-date-to", query_date(to)),
            ],
        )?;
        map_appointments(records)
    }

    fn appointment_history(&self, nurse_id: &str) -> Result<Vec<Appointment>, ApiError> {
        let records: Vec<AppointmentRecord> = self.get_data(
            Service::Appointment,
            "appointments",
            &[("nursing-id", nurse_id.to_string())],
        )?;
        map_appointments(records)
    }

    fn appointment(&self, appointment_id: &str) -> Result<Option<Appointment>, ApiError> {
        let records: Vec<AppointmentRecord> = self.get_data(
            Service::Appointment,
            "appointments",
            &[("id", appointment_id.to_string())],
        )?;
        records
            .into_iter()
            .next()
            .map(Appointment::try_from)
            .transpose()
    }

    fn appointment_detail(
        &self,
        package_id: &str,
        date: NaiveDate,
    ) -> Result<AppointmentDetail, ApiError> {
        let record: AppointmentDetailRecord = self.get_data(
            Service::Appointment,
            "cuspackage",
            &[
                ("cus-package-id", package_id.to_string()),
                ("est-date", query_date(date)),
            ],
        )?;
        AppointmentDetail::try_from(record)
    }

    fn start_appointment(&self, appointment_id: &str) -> Result<(), ApiError> {
        self.patch::<()>(
            Service::Appointment,
            &format!("appointments/{appointment_id}/update-status-upcoming"),
            None,
        )
    }

    fn mark_task_done(&self, task_id: &str) -> Result<(), ApiError> {
        let path = format!("cuspackage/custask/{task_id}/update-status-done");
        let mut attempt = 0;
        loop {
            match self.patch::<()>(Service::Appointment, &path, None) {
                Err(e) if e.is_transient() && attempt < self.confirm_retries => {
                    attempt += 1;
                    tracing::warn!(task_id, attempt, error = %e, "Retrying task confirmation");
                }
                other => return other,
            }
        }
    }

    fn medical_report(&self, appointment_id: &str) -> Result<Option<MedicalReport>, ApiError> {
        let record: Option<MedicalReportRecord> =
            self.get_optional(Service::Appointment, &format!("medical-record/{appointment_id}"))?;
        record.map(MedicalReport::try_from).transpose()
    }

    fn submit_medical_report(&self, report_id: &str, text: &str) -> Result<(), ApiError> {
        self.patch(
            Service::Appointment,
            &format!("medical-record/{report_id}"),
            Some(&SubmitReportBody {
                nursing_report: text,
            }),
        )
    }

    fn feedback(&self, medical_record_id: &str) -> Result<Option<Feedback>, ApiError> {
        let record: Option<FeedbackRecord> =
            self.get_optional(Service::Nurse, &format!("feedbacks/{medical_record_id}"))?;
        record.map(Feedback::try_from).transpose()
    }

    fn nurse_feedback(&self, nurse_id: &str) -> Result<Vec<Feedback>, ApiError> {
        let records: Vec<FeedbackRecord> =
            self.get_data(Service::Nurse, &format!("feedbacks/nursing/{nurse_id}"), &[])?;
        records.into_iter().map(Feedback::try_from).collect()
    }

    fn patient(&self, patient_id: &str) -> Result<PatientSummary, ApiError> {
        let record: PatientRecord =
            self.get_data(Service::Patient, &format!("patients/{patient_id}"), &[])?;
        Ok(record.into())
    }
}
