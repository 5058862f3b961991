//! Stateless HTTP request builder and response parser for the clinic API.
//!
//! # Design
//! `PatientClient` holds only a `base_url` and carries no mutable state
//! between calls. Each endpoint is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. Credentials are not attached here; `AuthClient` does that
//! at dispatch time.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    AccessToken, Acknowledgement, CreatedPatient, Credentials, NewPatient, Patient, Phn,
    RefreshRequest, SearchResults, TokenPair, UpdatePatient,
};

/// Synchronous, stateless client for the clinic API.
#[derive(Debug, Clone)]
pub struct PatientClient {
    base_url: String,
}

impl PatientClient {
    /// `base_url` includes the API prefix, e.g. `http://127.0.0.1:8000/api`.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn empty(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            path: self.url(path),
            headers: Vec::new(),
            body: None,
        }
    }

    fn json<B: Serialize>(&self, method: HttpMethod, path: &str, body: &B) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method,
            path: self.url(path),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    // -- session --

    pub fn build_obtain_token(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json(HttpMethod::Post, "/token/", credentials)
    }

    pub fn parse_obtain_token(&self, response: HttpResponse) -> Result<TokenPair, ApiError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    pub fn build_refresh_token(&self, refresh: &str) -> Result<HttpRequest, ApiError> {
        self.json(HttpMethod::Post, "/token/refresh/", &RefreshRequest { refresh })
    }

    /// Returns the new access token.
    pub fn parse_refresh_token(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response, 200)?;
        decode::<AccessToken>(&response).map(|token| token.access)
    }

    pub fn build_logout(&self, refresh: &str) -> Result<HttpRequest, ApiError> {
        self.json(HttpMethod::Post, "/logout/", &RefreshRequest { refresh })
    }

    pub fn parse_logout(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 200)
    }

    // -- patients --

    pub fn build_list_patients(&self) -> HttpRequest {
        self.empty(HttpMethod::Get, "/patients/")
    }

    pub fn parse_list_patients(&self, response: HttpResponse) -> Result<SearchResults, ApiError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    /// Server-side name search. An empty term omits the query string and
    /// returns every patient.
    pub fn build_search_patients(&self, term: &str) -> HttpRequest {
        if term.is_empty() {
            return self.empty(HttpMethod::Get, "/patients/search/");
        }
        let encoded: String = url::form_urlencoded::byte_serialize(term.as_bytes()).collect();
        self.empty(HttpMethod::Get, &format!("/patients/search/?search={encoded}"))
    }

    pub fn parse_search_patients(&self, response: HttpResponse) -> Result<SearchResults, ApiError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    pub fn build_create_patient(&self, input: &NewPatient) -> Result<HttpRequest, ApiError> {
        self.json(HttpMethod::Post, "/patients/create/", input)
    }

    pub fn parse_create_patient(&self, response: HttpResponse) -> Result<Patient, ApiError> {
        check_status(&response, 201)?;
        decode::<CreatedPatient>(&response).map(|created| created.patient)
    }

    /// Addressed by `original_phn`; the body carries both PHNs.
    pub fn build_update_patient(&self, input: &UpdatePatient) -> Result<HttpRequest, ApiError> {
        let path = format!("/patients/{}/update/", input.original_phn);
        self.json(HttpMethod::Put, &path, input)
    }

    /// Returns the server's confirmation message.
    pub fn parse_update_patient(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response, 200)?;
        decode::<Acknowledgement>(&response).map(|ack| ack.message)
    }

    pub fn build_delete_patient(&self, phn: Phn) -> HttpRequest {
        self.empty(HttpMethod::Delete, &format!("/patients/{phn}/delete/"))
    }

    pub fn parse_delete_patient(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 200)
    }

    pub fn build_set_current_patient(&self, phn: Phn) -> HttpRequest {
        self.empty(HttpMethod::Post, &format!("/patients/{phn}/set-current/"))
    }

    pub fn parse_set_current_patient(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 200)
    }

    pub fn build_get_current_patient(&self) -> HttpRequest {
        self.empty(HttpMethod::Get, "/patients/current/")
    }

    pub fn parse_get_current_patient(&self, response: HttpResponse) -> Result<Patient, ApiError> {
        check_status(&response, 200)?;
        decode(&response)
    }

    pub fn build_unset_current_patient(&self) -> HttpRequest {
        self.empty(HttpMethod::Post, "/patients/unset-current/")
    }

    pub fn parse_unset_current_patient(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 200)
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    let body = response.body.clone();
    match response.status {
        401 => Err(ApiError::AuthFailed {
            status: response.status,
            body,
        }),
        404 => Err(ApiError::NotFound { body }),
        status => Err(ApiError::Server { status, body }),
    }
}
