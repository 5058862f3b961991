//! Headless state of the patient dashboard page.
//!
//! Owns the paged patient table, the row the user selected, and the patient
//! marked current. Every action talks to the API first and only updates
//! local state once the server agreed.

use tracing::{debug, warn};

use crate::api::ClinicApi;
use crate::error::ApiError;
use crate::pagination::{Paginator, PAGE_SIZE};
use crate::transport::Transport;
use crate::types::Patient;

pub const LOAD_FAILED: &str = "Failed to load patients.";
pub const SET_CURRENT_FAILED: &str = "Failed to set current patient.";

#[derive(Debug, Clone)]
pub struct Dashboard {
    table: Paginator<Patient>,
    search_term: String,
    selected: Option<Patient>,
    current: Option<Patient>,
    error: Option<String>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            table: Paginator::new(PAGE_SIZE),
            search_term: String::new(),
            selected: None,
            current: None,
            error: None,
        }
    }

    pub fn table(&self) -> &Paginator<Patient> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut Paginator<Patient> {
        &mut self.table
    }

    pub fn selected(&self) -> Option<&Patient> {
        self.selected.as_ref()
    }

    pub fn current(&self) -> Option<&Patient> {
        self.current.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    /// Fetches the full patient list. On failure the previous rows stay and
    /// the page shows a load error.
    pub fn load<T: Transport>(&mut self, api: &ClinicApi<T>) {
        match api.search_patients("") {
            Ok(results) => {
                self.table.reload(results.results);
                self.error = None;
            }
            Err(e) => {
                warn!(error = %e, "loading patients failed");
                self.error = Some(LOAD_FAILED.to_string());
            }
        }
    }

    /// Runs the server-side search for the current term and shows the
    /// results from page 1.
    pub fn search<T: Transport>(&mut self, api: &ClinicApi<T>) -> Result<(), ApiError> {
        let results = api.search_patients(&self.search_term)?;
        debug!(term = %self.search_term, hits = results.results.len(), "search finished");
        self.table.replace(results.results);
        Ok(())
    }

    /// Clicking a row: marks the patient current on the server, then selects
    /// it and shows it as current.
    pub fn select<T: Transport>(&mut self, api: &ClinicApi<T>, patient: Patient) -> Result<(), ApiError> {
        api.set_current_patient(patient.phn)?;
        self.selected = Some(patient.clone());
        self.current = Some(patient);
        self.load(api);
        Ok(())
    }

    /// Marks the selected row current. Returns the message to show on
    /// failure; does nothing without a selection.
    pub fn set_selected_current<T: Transport>(&mut self, api: &ClinicApi<T>) -> Result<(), String> {
        let Some(patient) = self.selected.clone() else {
            return Ok(());
        };
        match api.set_current_patient(patient.phn) {
            Ok(()) => {
                self.current = Some(patient);
                self.load(api);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "setting current patient failed");
                Err(e.user_message("error", SET_CURRENT_FAILED))
            }
        }
    }

    /// Deletes the selected patient. Afterwards nothing is selected and no
    /// patient is shown as current.
    pub fn delete_selected<T: Transport>(&mut self, api: &ClinicApi<T>) -> Result<(), ApiError> {
        let Some(patient) = self.selected.as_ref() else {
            return Ok(());
        };
        api.delete_patient(patient.phn)?;
        self.load(api);
        self.current = None;
        self.selected = None;
        Ok(())
    }

    /// Re-reads the current patient from the server.
    pub fn sync_current<T: Transport>(&mut self, api: &ClinicApi<T>) -> Result<(), ApiError> {
        self.current = api.current_patient()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::config::ClientConfig;
    use crate::session::Session;
    use crate::testing::{response, ScriptedTransport};
    use crate::types::Phn;

    fn api(transport: &ScriptedTransport) -> ClinicApi<&ScriptedTransport> {
        let session = Session::in_memory();
        session.store_tokens("a1", "r1").unwrap();
        ClinicApi::from_config(&ClientConfig::default(), transport, Arc::new(session), |_| {})
    }

    fn patient(phn: u32, name: &str) -> Patient {
        Patient {
            phn: Phn::new(phn).unwrap(),
            name: name.to_string(),
            birth_date: NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
            phone: "2505550000".to_string(),
            email: "p@example.com".to_string(),
            address: "1 Main St".to_string(),
        }
    }

    fn results(patients: &[Patient]) -> String {
        serde_json::json!({
            "count": patients.len(),
            "next": null,
            "previous": null,
            "results": patients,
        })
        .to_string()
    }

    fn many(n: u32) -> Vec<Patient> {
        (1..=n).map(|i| patient(100000 + i, "Pat Doe")).collect()
    }

    #[test]
    fn load_failure_sets_error_and_keeps_rows() {
        let transport = ScriptedTransport::new();
        transport.push(response(200, &results(&many(3))));
        transport.push(response(500, "oops"));
        let api = api(&transport);
        let mut dashboard = Dashboard::new();

        dashboard.load(&api);
        assert_eq!(dashboard.table().len(), 3);
        assert!(dashboard.error().is_none());

        dashboard.load(&api);
        assert_eq!(dashboard.table().len(), 3);
        assert_eq!(dashboard.error(), Some(LOAD_FAILED));
    }

    #[test]
    fn new_search_returns_to_first_page() {
        let transport = ScriptedTransport::new();
        transport.push(response(200, &results(&many(23))));
        transport.push(response(200, &results(&many(15))));
        let api = api(&transport);
        let mut dashboard = Dashboard::new();

        dashboard.load(&api);
        dashboard.table_mut().go_to(3);
        assert_eq!(dashboard.table().page(), 3);

        dashboard.set_search_term("Pat");
        dashboard.search(&api).unwrap();

        assert_eq!(dashboard.table().page(), 1);
        assert_eq!(dashboard.table().len(), 15);
        assert!(transport.requests()[1].path.ends_with("/patients/search/?search=Pat"));
    }

    #[test]
    fn select_marks_current_and_reloads() {
        let transport = ScriptedTransport::new();
        transport.push(response(200, r#"{"message":"Patient 123456 set as current patient"}"#));
        transport.push(response(200, &results(&[patient(123456, "Jane Roe")])));
        let api = api(&transport);
        let mut dashboard = Dashboard::new();

        dashboard.select(&api, patient(123456, "Jane Roe")).unwrap();

        assert_eq!(dashboard.selected().map(|p| p.phn.value()), Some(123456));
        assert_eq!(dashboard.current().map(|p| p.phn.value()), Some(123456));
        assert!(transport.requests()[0].path.ends_with("/patients/123456/set-current/"));
    }

    #[test]
    fn failed_select_changes_nothing() {
        let transport = ScriptedTransport::new();
        transport.push(response(400, r#"{"error":"Patient not found."}"#));
        let api = api(&transport);
        let mut dashboard = Dashboard::new();

        assert!(dashboard.select(&api, patient(123456, "Jane Roe")).is_err());
        assert!(dashboard.selected().is_none());
        assert!(dashboard.current().is_none());
    }

    #[test]
    fn deleting_current_patient_clears_selection_and_current() {
        let transport = ScriptedTransport::new();
        let jane = patient(123456, "Jane Roe");
        transport.push(response(200, r#"{"message":"ok"}"#));
        transport.push(response(200, &results(&[jane.clone()])));
        transport.push(response(200, r#"{"message":"Patient deleted successfully"}"#));
        transport.push(response(200, &results(&[])));
        let api = api(&transport);
        let mut dashboard = Dashboard::new();

        dashboard.select(&api, jane).unwrap();
        dashboard.delete_selected(&api).unwrap();

        assert!(dashboard.selected().is_none());
        assert!(dashboard.current().is_none());
        assert!(dashboard.table().is_empty());
        assert_eq!(transport.requests()[2].path, "http://127.0.0.1:8000/api/patients/123456/delete/");
    }

    #[test]
    fn delete_without_selection_is_noop() {
        let transport = ScriptedTransport::new();
        let api = api(&transport);
        let mut dashboard = Dashboard::new();

        dashboard.delete_selected(&api).unwrap();
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn set_current_failure_reports_server_error() {
        let transport = ScriptedTransport::new();
        let jane = patient(123456, "Jane Roe");
        transport.push(response(200, r#"{"message":"ok"}"#));
        transport.push(response(200, &results(&[jane.clone()])));
        transport.push(response(400, r#"{"error":"Patient not found."}"#));
        let api = api(&transport);
        let mut dashboard = Dashboard::new();
        dashboard.select(&api, jane).unwrap();

        let err = dashboard.set_selected_current(&api).unwrap_err();
        assert_eq!(err, "Patient not found.");
    }

    #[test]
    fn sync_current_handles_missing_current() {
        let transport = ScriptedTransport::new();
        transport.push(response(404, r#"{"error":"No current patient set"}"#));
        let api = api(&transport);
        let mut dashboard = Dashboard::new();

        dashboard.sync_current(&api).unwrap();
        assert!(dashboard.current().is_none());
    }
}
