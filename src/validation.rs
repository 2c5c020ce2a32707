//! Form validation for sign-up, patient registration and appointment forms.
//!
//! Every rule runs; callers get the complete list of failing fields.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde::Serialize;

use crate::models::enums::AppointmentStatus;
use crate::models::physician::is_on_roster;
use crate::models::{AppointmentUpdate, NewAppointment, NewUser, PatientRegistration};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+\d{10,15}$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, thiserror::Error)]
#[error("{} field(s) failed validation", .errors.len())]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn fields(&self) -> Vec<&'static str> {
        self.errors.iter().map(|e| e.field).collect()
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

pub fn is_valid_phone(value: &str) -> bool {
    PHONE_PATTERN.is_match(value)
}

#[derive(Default)]
struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    fn require(&mut self, field: &'static str, ok: bool, message: impl Into<String>) {
        if !ok {
            self.errors.push(FieldError {
                field,
                message: message.into(),
            });
        }
    }

    fn length(&mut self, field: &'static str, label: &str, value: &str, min: usize, max: usize) {
        let len = value.trim().chars().count();
        if len < min {
            self.require(field, false, format!("{label} must be at least {min} characters"));
        } else if len > max {
            self.require(field, false, format!("{label} must be at most {max} characters"));
        }
    }

    fn optional_max(&mut self, field: &'static str, label: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            self.length(field, label, value, 0, max);
        }
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                errors: self.errors,
            })
        }
    }
}

fn user_rules(v: &mut Validator, name: &str, email: &str, phone: &str) {
    v.length("name", "Name", name, 2, 50);
    v.require("email", is_valid_email(email.trim()), "Invalid email address");
    v.require("phone", is_valid_phone(phone.trim()), "Invalid phone number");
}

pub fn validate_new_user(user: &NewUser) -> Result<(), ValidationErrors> {
    let mut v = Validator::default();
    user_rules(&mut v, &user.name, &user.email, &user.phone);
    v.finish()
}

pub fn validate_registration(patient: &PatientRegistration) -> Result<(), ValidationErrors> {
    let mut v = Validator::default();
    user_rules(&mut v, &patient.name, &patient.email, &patient.phone);

    v.require("userId", !patient.user_id.trim().is_empty(), "User id is required");
    v.require(
        "birthDate",
        patient.birth_date <= Utc::now().date_naive(),
        "Birth date cannot be in the future",
    );
    v.length("address", "Address", &patient.address, 5, 500);
    v.length("occupation", "Occupation", &patient.occupation, 2, 500);
    v.length(
        "emergencyContactName",
        "Contact name",
        &patient.emergency_contact_name,
        2,
        50,
    );
    v.require(
        "emergencyContactNumber",
        is_valid_phone(patient.emergency_contact_number.trim()),
        "Invalid phone number",
    );
    physician_rule(&mut v, Some(patient.primary_physician.as_str()));
    v.length(
        "insuranceProvider",
        "Insurance name",
        &patient.insurance_provider,
        2,
        50,
    );
    v.length(
        "insurancePolicyNumber",
        "Policy number",
        &patient.insurance_policy_number,
        2,
        50,
    );
    v.optional_max("allergies", "Allergies", patient.allergies.as_deref(), 1000);
    v.optional_max(
        "currentMedication",
        "Current medication",
        patient.current_medication.as_deref(),
        1000,
    );
    v.optional_max(
        "familyMedicalHistory",
        "Family medical history",
        patient.family_medical_history.as_deref(),
        1000,
    );
    v.optional_max(
        "pastMedicalHistory",
        "Past medical history",
        patient.past_medical_history.as_deref(),
        1000,
    );
    v.optional_max(
        "identificationNumber",
        "Identification number",
        patient.identification_number.as_deref(),
        50,
    );
    v.require(
        "treatmentConsent",
        patient.treatment_consent,
        "You must consent to treatment in order to proceed",
    );
    v.require(
        "disclosureConsent",
        patient.disclosure_consent,
        "You must consent to disclosure in order to proceed",
    );
    v.require(
        "privacyConsent",
        patient.privacy_consent,
        "You must consent to privacy in order to proceed",
    );
    v.finish()
}

/// Physicians are picked from the clinic roster.
fn physician_rule(v: &mut Validator, physician: Option<&str>) {
    match physician.map(str::trim) {
        Some(name) if name.chars().count() >= 2 => v.require(
            "primaryPhysician",
            is_on_roster(name),
            format!("{name} is not on the physician roster"),
        ),
        _ => v.require("primaryPhysician", false, "Select at least one doctor"),
    }
}

/// Create form: doctor, time, reason.
pub fn validate_new_appointment(appointment: &NewAppointment) -> Result<(), ValidationErrors> {
    let mut v = Validator::default();
    v.require("userId", !appointment.user_id.trim().is_empty(), "User id is required");
    v.require("patient", !appointment.patient.trim().is_empty(), "Patient is required");
    physician_rule(&mut v, Some(appointment.primary_physician.as_str()));
    v.length("reason", "Reason", &appointment.reason, 2, 500);
    v.optional_max("note", "Note", appointment.note.as_deref(), 500);
    v.finish()
}

/// Schedule and cancel forms, picked by the target status.
pub fn validate_update(update: &AppointmentUpdate) -> Result<(), ValidationErrors> {
    let mut v = Validator::default();
    match update.status {
        AppointmentStatus::Scheduled => {
            physician_rule(&mut v, update.primary_physician.as_deref());
            v.require("schedule", update.schedule.is_some(), "Schedule is required");
        }
        AppointmentStatus::Cancelled => match update.cancellation_reason.as_deref() {
            Some(reason) => v.length("cancellationReason", "Reason", reason, 2, 500),
            None => v.require("cancellationReason", false, "Reason is required"),
        },
        AppointmentStatus::Pending => {
            if update.primary_physician.is_some() {
                physician_rule(&mut v, update.primary_physician.as_deref());
            }
        }
    }
    v.finish()
}
