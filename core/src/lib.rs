//! Headless client core for the clinic patient dashboard.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! owning the network (host-does-IO pattern); a `Transport` executes the
//! round-trip. On top of that sit the authenticated dispatcher, the typed
//! patient API and the view-models a UI shell drives.
//!
//! # Design
//! - `PatientClient` is stateless: it holds only `base_url`.
//! - `AuthClient` owns the only mutable shared state, an injected `Session`,
//!   and renews an expired access token at most once per request.
//! - `Dashboard`, `Paginator` and `PatientFormModel` are plain state with
//!   methods; rendering is left to the host.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod form;
pub mod http;
pub mod pagination;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use api::ClinicApi;
pub use auth::{AuthClient, SessionExpired};
pub use client::PatientClient;
pub use config::ClientConfig;
pub use dashboard::Dashboard;
pub use error::ApiError;
pub use form::{Field, PatientForm, PatientFormModel, SubmitOutcome, ValidationErrors};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use pagination::{Paginator, PAGE_SIZE};
pub use session::{FileTokenStore, MemoryTokenStore, Session, TokenStore};
pub use transport::{Transport, TransportError, UreqTransport};
pub use types::{NewPatient, Patient, Phn, SearchResults, UpdatePatient};
