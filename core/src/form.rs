//! Patient create/update forms.
//!
//! # Design
//! `PatientForm` holds raw text exactly as typed. `validate` checks every
//! field and reports all failures at once, keyed by `Field`, so a UI can show
//! each message under its input. Only a fully valid form turns into a
//! request payload; a rejected form never reaches the network.
//!
//! `PatientFormModel` carries the dialog state around a submission: open,
//! success, and the error line. `submit` blocks until the server answers,
//! so the host knows a submission is in flight for as long as the call
//! runs. The host passes `today` explicitly so the birth-date rule is
//! testable.

use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::ClinicApi;
use crate::transport::Transport;
use crate::types::{NewPatient, Patient, Phn, UpdatePatient};

/// How long the dialog stays open to show the success notice.
pub const CLOSE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Phn,
    Name,
    Phone,
    Email,
    BirthDate,
    Address,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Phn => "phn",
            Field::Name => "name",
            Field::Phone => "phone",
            Field::Email => "email",
            Field::BirthDate => "birthDate",
            Field::Address => "address",
        }
    }
}

/// Field-level validation failures, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", summary(.errors))]
pub struct ValidationErrors {
    errors: Vec<(Field, &'static str)>,
}

impl ValidationErrors {
    fn push(&mut self, field: Field, message: &'static str) {
        self.errors.push((field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Messages for one field.
    pub fn for_field(&self, field: Field) -> Vec<&'static str> {
        self.errors
            .iter()
            .filter(|(f, _)| *f == field)
            .map(|(_, message)| *message)
            .collect()
    }

    pub fn has(&self, field: Field) -> bool {
        self.errors.iter().any(|(f, _)| *f == field)
    }

    pub fn first_message(&self) -> Option<&'static str> {
        self.errors.first().map(|(_, message)| *message)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &'static str)> + '_ {
        self.errors.iter().copied()
    }
}

fn summary(errors: &[(Field, &'static str)]) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{}: {message}", field.as_str()))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPatient {
    pub phn: Phn,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub birth_date: NaiveDate,
    pub address: String,
}

impl ValidPatient {
    pub fn into_new(self) -> NewPatient {
        NewPatient {
            phn: self.phn,
            name: self.name,
            phone: self.phone,
            email: self.email,
            birth_date: self.birth_date,
            address: self.address,
        }
    }

    pub fn into_update(self, original_phn: Phn) -> UpdatePatient {
        UpdatePatient {
            original_phn,
            phn: self.phn,
            name: self.name,
            phone: self.phone,
            email: self.email,
            birth_date: self.birth_date,
            address: self.address,
        }
    }
}

/// Raw form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientForm {
    pub phn: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    /// `YYYY-MM-DD`, as produced by a date input.
    pub birth_date: String,
    pub address: String,
}

impl PatientForm {
    /// Prefills the form with an existing record.
    pub fn from_patient(patient: &Patient) -> Self {
        Self {
            phn: patient.phn.to_string(),
            name: patient.name.clone(),
            phone: patient.phone.clone(),
            email: patient.email.clone(),
            birth_date: patient.birth_date.format("%Y-%m-%d").to_string(),
            address: patient.address.clone(),
        }
    }

    pub fn validate(&self, today: NaiveDate) -> Result<ValidPatient, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.phn.chars().count() != 6 {
            errors.push(Field::Phn, "PHN must be 6 digits.");
        }
        if !all_digits(&self.phn) {
            errors.push(Field::Phn, "PHN must be a number.");
        }

        if self.name.chars().count() < 3 {
            errors.push(Field::Name, "Name must be at least 3 characters.");
        }
        if self.name.is_empty() || !self.name.chars().all(|c| c.is_ascii_alphabetic() || c.is_whitespace()) {
            errors.push(Field::Name, "Name must contain only letters.");
        }

        if self.phone.chars().count() != 10 {
            errors.push(Field::Phone, "Phone number must be 10 digits.");
        }
        if !all_digits(&self.phone) {
            errors.push(Field::Phone, "Phone must contain only numbers.");
        }

        if !is_valid_email(&self.email) {
            errors.push(Field::Email, "Invalid email format.");
        }

        let birth_date = NaiveDate::parse_from_str(self.birth_date.trim(), "%Y-%m-%d")
            .ok()
            .filter(|date| *date <= today);
        if birth_date.is_none() {
            errors.push(Field::BirthDate, "Date of Birth must be in the past.");
        }

        if self.address.chars().count() < 5 {
            errors.push(Field::Address, "Address must be at least 5 characters.");
        }

        let phn = self.phn.parse::<Phn>().ok();
        match (phn, birth_date) {
            (Some(phn), Some(birth_date)) if errors.is_empty() => Ok(ValidPatient {
                phn,
                name: self.name.clone(),
                phone: self.phone.clone(),
                email: self.email.clone(),
                birth_date,
                address: self.address.clone(),
            }),
            _ => Err(errors),
        }
    }
}

fn all_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// `local@domain.tld`. The local part uses letters, digits and `_'+.-`
/// without leading, trailing or doubled dots. The domain has at least two
/// labels of letters, digits and inner hyphens, ending in an alphabetic TLD
/// of two or more letters.
fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '\'' | '+' | '.' | '-'))
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..");
    if !local_ok {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
        && labels
            .last()
            .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()))
}

/// Whether the form creates a record or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update { original: Phn },
}

impl FormMode {
    fn error_key(&self) -> &'static str {
        match self {
            FormMode::Create => "message",
            FormMode::Update { .. } => "error",
        }
    }

    fn fallback(&self) -> &'static str {
        match self {
            FormMode::Create => "Failed to create patient.",
            FormMode::Update { .. } => "Failed to update patient.",
        }
    }

    pub fn success_notice(&self) -> &'static str {
        match self {
            FormMode::Create => "Patient created successfully!",
            FormMode::Update { .. } => "Patient updated successfully!",
        }
    }
}

/// Result of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Saved. The host closes the dialog after `close_after` and reloads the
    /// patient list.
    Saved { close_after: Duration },
    /// Client-side validation failed; nothing was sent.
    Invalid(ValidationErrors),
    /// The server or network rejected the request; `message` is shown.
    Failed { message: String },
}

/// Dialog state around a `PatientForm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientFormModel {
    mode: FormMode,
    pub values: PatientForm,
    open: bool,
    success: bool,
    error: Option<String>,
    field_errors: ValidationErrors,
}

impl PatientFormModel {
    pub fn create() -> Self {
        Self::with(FormMode::Create, PatientForm::default())
    }

    pub fn update(patient: &Patient) -> Self {
        Self::with(
            FormMode::Update { original: patient.phn },
            PatientForm::from_patient(patient),
        )
    }

    fn with(mode: FormMode, values: PatientForm) -> Self {
        Self {
            mode,
            values,
            open: false,
            success: false,
            error: None,
            field_errors: ValidationErrors::default(),
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn succeeded(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn field_errors(&self) -> &ValidationErrors {
        &self.field_errors
    }

    /// Validates against `today` and, if valid, sends the form.
    ///
    /// A successful create resets the inputs; a successful update keeps
    /// them. The dialog is left open so the success notice can show; the
    /// returned outcome tells the host when to close it.
    pub fn submit<T: Transport>(&mut self, api: &ClinicApi<T>, today: NaiveDate) -> SubmitOutcome {
        self.error = None;
        self.success = false;

        let valid = match self.values.validate(today) {
            Ok(valid) => valid,
            Err(errors) => {
                debug!(count = errors.len(), "form rejected by validation");
                self.field_errors = errors.clone();
                return SubmitOutcome::Invalid(errors);
            }
        };
        self.field_errors = ValidationErrors::default();

        let result = match &self.mode {
            FormMode::Create => api.create_patient(&valid.into_new()).map(|_| ()),
            FormMode::Update { original } => api.update_patient(&valid.into_update(*original)).map(|_| ()),
        };

        match result {
            Ok(()) => {
                self.success = true;
                match &mut self.mode {
                    FormMode::Create => self.values = PatientForm::default(),
                    FormMode::Update { original } => {
                        // later edits address the record under its new PHN
                        if let Ok(phn) = self.values.phn.parse() {
                            *original = phn;
                        }
                    }
                }
                SubmitOutcome::Saved {
                    close_after: CLOSE_DELAY,
                }
            }
            Err(e) => {
                warn!(error = %e, "patient form submission failed");
                let message = e.user_message(self.mode.error_key(), self.mode.fallback());
                self.error = Some(message.clone());
                SubmitOutcome::Failed { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Days;

    use super::*;
    use crate::config::ClientConfig;
    use crate::error::ApiError;
    use crate::session::Session;
    use crate::testing::{response, ScriptedTransport};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn valid_form() -> PatientForm {
        PatientForm {
            phn: "123456".to_string(),
            name: "Jane Roe".to_string(),
            phone: "2505550000".to_string(),
            email: "jane@example.com".to_string(),
            birth_date: "1990-04-01".to_string(),
            address: "1 Main St".to_string(),
        }
    }

    fn patient() -> Patient {
        Patient {
            phn: Phn::new(123456).unwrap(),
            name: "Jane Roe".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 4, 1).unwrap(),
            phone: "2505550000".to_string(),
            email: "jane@example.com".to_string(),
            address: "1 Main St".to_string(),
        }
    }

    fn api(transport: &ScriptedTransport) -> ClinicApi<&ScriptedTransport> {
        let session = Session::in_memory();
        session.store_tokens("a1", "r1").unwrap();
        ClinicApi::from_config(&ClientConfig::default(), transport, Arc::new(session), |_| {})
    }

    #[test]
    fn valid_form_passes() {
        let valid = valid_form().validate(today()).unwrap();
        assert_eq!(valid.phn.value(), 123456);
        assert_eq!(valid.birth_date, NaiveDate::from_ymd_opt(1990, 4, 1).unwrap());
    }

    #[test]
    fn phn_with_letter_is_rejected() {
        let form = PatientForm {
            phn: "12a456".to_string(),
            ..valid_form()
        };
        let errors = form.validate(today()).unwrap_err();
        assert_eq!(errors.for_field(Field::Phn), vec!["PHN must be a number."]);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn short_phn_reports_length() {
        let form = PatientForm {
            phn: "1234".to_string(),
            ..valid_form()
        };
        let errors = form.validate(today()).unwrap_err();
        assert_eq!(errors.for_field(Field::Phn), vec!["PHN must be 6 digits."]);
    }

    #[test]
    fn birth_date_cannot_be_in_the_future() {
        let tomorrow = today().checked_add_days(Days::new(1)).unwrap();
        let yesterday = today().checked_sub_days(Days::new(1)).unwrap();

        // a date means its midnight, which has already passed today
        for (date, ok) in [(tomorrow, false), (today(), true), (yesterday, true)] {
            let form = PatientForm {
                birth_date: date.format("%Y-%m-%d").to_string(),
                ..valid_form()
            };
            assert_eq!(form.validate(today()).is_ok(), ok, "{date}");
        }
    }

    #[test]
    fn unparsable_birth_date_is_rejected() {
        let form = PatientForm {
            birth_date: "yesterday".to_string(),
            ..valid_form()
        };
        let errors = form.validate(today()).unwrap_err();
        assert!(errors.has(Field::BirthDate));
    }

    #[test]
    fn every_failing_field_is_reported() {
        let form = PatientForm {
            phn: String::new(),
            name: "J3".to_string(),
            phone: "12345".to_string(),
            email: "not-an-email".to_string(),
            birth_date: String::new(),
            address: "here".to_string(),
        };
        let errors = form.validate(today()).unwrap_err();
        for field in [
            Field::Phn,
            Field::Name,
            Field::Phone,
            Field::Email,
            Field::BirthDate,
            Field::Address,
        ] {
            assert!(errors.has(field), "{}", field.as_str());
        }
        assert_eq!(
            errors.for_field(Field::Name),
            vec!["Name must be at least 3 characters.", "Name must contain only letters."]
        );
    }

    #[test]
    fn validation_errors_display_names_each_field() {
        let form = PatientForm {
            phone: "12345".to_string(),
            address: "here".to_string(),
            ..valid_form()
        };
        let errors = form.validate(today()).unwrap_err();
        assert_eq!(
            errors.to_string(),
            "phone: Phone number must be 10 digits.; address: Address must be at least 5 characters."
        );

        let err: ApiError = errors.into();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn email_syntax() {
        for good in [
            "a@b.co",
            "jane.roe@mail.example.org",
            "x+tag@host-name.io",
            "o'brien_1@example.com",
        ] {
            assert!(is_valid_email(good), "{good}");
        }
        for bad in [
            "",
            "jane",
            "jane@",
            "@example.com",
            "a@b",
            "a@@b.com",
            "a b@c.com",
            "a@b..com",
            "a@b.c",
            "a..b@example.com",
            "a.@example.com",
            ".a@example.com",
            "a<b>@example.com",
            "a\"b@example.com",
            "a@example.12",
        ] {
            assert!(!is_valid_email(bad), "{bad}");
        }
    }

    #[test]
    fn invalid_submit_sends_nothing() {
        let transport = ScriptedTransport::new();
        let api = api(&transport);
        let mut model = PatientFormModel::create();
        model.values.phn = "12a456".to_string();

        let outcome = model.submit(&api, today());

        assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
        assert!(model.field_errors().has(Field::Phn));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn successful_create_resets_form() {
        let transport = ScriptedTransport::new();
        transport.push(response(
            201,
            r#"{"message":"Patient created successfully","patient":{"phn":123456,"name":"Jane Roe","birth_date":"1990-04-01","phone":"2505550000","email":"jane@example.com","address":"1 Main St"}}"#,
        ));
        let api = api(&transport);
        let mut model = PatientFormModel::create();
        model.open();
        model.values = valid_form();

        let outcome = model.submit(&api, today());

        assert_eq!(outcome, SubmitOutcome::Saved { close_after: CLOSE_DELAY });
        assert!(model.succeeded());
        assert!(model.is_open());
        assert_eq!(model.values, PatientForm::default());
        let body: serde_json::Value =
            serde_json::from_str(transport.requests()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["birthDate"], "1990-04-01");
    }

    #[test]
    fn create_failure_without_message_uses_fallback() {
        let transport = ScriptedTransport::new();
        transport.push(response(400, r#"{"error":"Patient with this PHN already exists."}"#));
        let api = api(&transport);
        let mut model = PatientFormModel::create();
        model.values = valid_form();

        let outcome = model.submit(&api, today());

        assert_eq!(
            outcome,
            SubmitOutcome::Failed {
                message: "Failed to create patient.".to_string()
            }
        );
        assert_eq!(model.error(), Some("Failed to create patient."));
        assert_eq!(model.values, valid_form());
    }

    #[test]
    fn update_failure_shows_server_error() {
        let transport = ScriptedTransport::new();
        transport.push(response(400, r#"{"error":"New PHN is already in use."}"#));
        let api = api(&transport);
        let mut model = PatientFormModel::update(&patient());
        model.values.phn = "654321".to_string();

        let outcome = model.submit(&api, today());

        assert_eq!(
            outcome,
            SubmitOutcome::Failed {
                message: "New PHN is already in use.".to_string()
            }
        );
        let sent = &transport.requests()[0];
        assert!(sent.path.ends_with("/patients/123456/update/"));
    }

    #[test]
    fn successful_update_tracks_new_phn() {
        let transport = ScriptedTransport::new();
        transport.push(response(200, r#"{"message":"Patient updated successfully."}"#));
        let api = api(&transport);
        let mut model = PatientFormModel::update(&patient());
        assert_eq!(model.values.birth_date, "1990-04-01");
        model.values.phn = "654321".to_string();

        assert!(matches!(model.submit(&api, today()), SubmitOutcome::Saved { .. }));
        assert_eq!(
            model.mode(),
            &FormMode::Update {
                original: Phn::new(654321).unwrap()
            }
        );
        assert_eq!(model.values.phn, "654321");
    }
}
