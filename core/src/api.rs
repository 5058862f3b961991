//! Typed access to the clinic REST API.
//!
//! `ClinicApi` pairs the stateless `PatientClient` with an `AuthClient`: each
//! call builds a request, dispatches it with credentials (refreshing once if
//! needed) and parses the response.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::auth::{AuthClient, SessionExpired};
use crate::client::PatientClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::session::Session;
use crate::transport::Transport;
use crate::types::{Credentials, NewPatient, Patient, Phn, SearchResults, UpdatePatient};

pub struct ClinicApi<T> {
    client: PatientClient,
    auth: AuthClient<T>,
}

impl<T: Transport> ClinicApi<T> {
    pub fn new(client: PatientClient, auth: AuthClient<T>) -> Self {
        Self { client, auth }
    }

    /// Wires a client from `config`. `on_session_expired` runs when a
    /// refresh is rejected and the user must sign in again.
    pub fn from_config(
        config: &ClientConfig,
        transport: T,
        session: Arc<Session>,
        on_session_expired: impl Fn(&SessionExpired) + Send + Sync + 'static,
    ) -> Self {
        let client = PatientClient::new(&config.api_url);
        let auth = AuthClient::new(transport, session, client.clone())
            .with_login_path(config.login_path.clone())
            .on_session_expired(on_session_expired);
        Self::new(client, auth)
    }

    pub fn session(&self) -> &Arc<Session> {
        self.auth.session()
    }

    pub fn auth(&self) -> &AuthClient<T> {
        &self.auth
    }

    /// Exchanges credentials for a token pair and stores it in the session.
    pub fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        let request = self.client.build_obtain_token(&credentials)?;
        let tokens = self
            .client
            .parse_obtain_token(self.auth.send_anonymous(&request)?)?;
        self.session().store_tokens(&tokens.access, &tokens.refresh)?;
        debug!(username, "logged in");
        Ok(())
    }

    /// Revokes the refresh token on the server, then clears the session.
    /// The session is cleared even when the server call fails.
    pub fn logout(&self) -> Result<(), ApiError> {
        let result = match self.session().refresh_token() {
            Some(refresh) => self
                .client
                .build_logout(&refresh)
                .and_then(|request| self.auth.dispatch(&request))
                .and_then(|response| self.client.parse_logout(response)),
            None => Ok(()),
        };
        if let Err(e) = &result {
            warn!(error = %e, "server-side logout failed");
        }
        self.session().clear()?;
        result
    }

    pub fn list_patients(&self) -> Result<SearchResults, ApiError> {
        let response = self.auth.dispatch(&self.client.build_list_patients())?;
        self.client.parse_list_patients(response)
    }

    pub fn search_patients(&self, term: &str) -> Result<SearchResults, ApiError> {
        let response = self.auth.dispatch(&self.client.build_search_patients(term))?;
        self.client.parse_search_patients(response)
    }

    pub fn create_patient(&self, input: &NewPatient) -> Result<Patient, ApiError> {
        let request = self.client.build_create_patient(input)?;
        self.client.parse_create_patient(self.auth.dispatch(&request)?)
    }

    pub fn update_patient(&self, input: &UpdatePatient) -> Result<String, ApiError> {
        let request = self.client.build_update_patient(input)?;
        self.client.parse_update_patient(self.auth.dispatch(&request)?)
    }

    pub fn delete_patient(&self, phn: Phn) -> Result<(), ApiError> {
        let response = self.auth.dispatch(&self.client.build_delete_patient(phn))?;
        self.client.parse_delete_patient(response)
    }

    pub fn set_current_patient(&self, phn: Phn) -> Result<(), ApiError> {
        let response = self.auth.dispatch(&self.client.build_set_current_patient(phn))?;
        self.client.parse_set_current_patient(response)
    }

    /// `None` when no patient is marked current.
    pub fn current_patient(&self) -> Result<Option<Patient>, ApiError> {
        let response = self.auth.dispatch(&self.client.build_get_current_patient())?;
        match self.client.parse_get_current_patient(response) {
            Ok(patient) => Ok(Some(patient)),
            Err(ApiError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn unset_current_patient(&self) -> Result<(), ApiError> {
        let response = self.auth.dispatch(&self.client.build_unset_current_patient())?;
        self.client.parse_unset_current_patient(response)
    }
}
