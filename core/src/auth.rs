//! Bearer-token attachment with a single refresh-and-retry on 401.
//!
//! # Design
//! Per request the dispatch loop walks
//! `SENT -> (SUCCESS | FAILED | NEEDS_REFRESH)` and, from `NEEDS_REFRESH`,
//! `REFRESHING -> (RETRIED_SENT -> SUCCESS | FAILED) | (REFRESH_FAILED ->
//! FAILED)`. The attempt number is loop state (`Attempt`); the pending
//! request is never mutated, the retry is a fresh descriptor carrying the
//! new bearer header.
//!
//! Refreshes are single-flight: they run under `refresh_lock`, and a caller
//! that acquires the lock after someone else already replaced the access
//! token it was sent with retries with the current token instead of
//! refreshing again.
//!
//! A rejected refresh clears the session and notifies the host through the
//! session-expired handler; navigation is the host's business.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::client::PatientClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, AUTHORIZATION};
use crate::session::Session;
use crate::transport::Transport;

/// Emitted when the refresh token is rejected and the session was cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionExpired {
    /// Where the host should send the user to sign in again.
    pub login_path: String,
}

type SessionExpiredHandler = Box<dyn Fn(&SessionExpired) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retry,
}

/// Sends requests with the session's credentials and transparently renews an
/// expired access token once per request.
pub struct AuthClient<T> {
    transport: T,
    session: Arc<Session>,
    endpoints: PatientClient,
    login_path: String,
    refresh_lock: Mutex<()>,
    on_session_expired: Option<SessionExpiredHandler>,
}

impl<T: Transport> AuthClient<T> {
    pub fn new(transport: T, session: Arc<Session>, endpoints: PatientClient) -> Self {
        Self {
            transport,
            session,
            endpoints,
            login_path: "/login".to_string(),
            refresh_lock: Mutex::new(()),
            on_session_expired: None,
        }
    }

    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    /// Registers the callback run after a failed refresh cleared the session.
    pub fn on_session_expired(mut self, handler: impl Fn(&SessionExpired) + Send + Sync + 'static) -> Self {
        self.on_session_expired = Some(Box::new(handler));
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Returns `request` with `Authorization: Bearer <token>` when the
    /// session holds an access token, or unchanged otherwise.
    pub fn attach_token(&self, request: &HttpRequest) -> HttpRequest {
        match self.session.access_token() {
            Some(token) => request.with_header(AUTHORIZATION, &format!("Bearer {token}")),
            None => request.clone(),
        }
    }

    /// Sends `request` without credentials and without refresh handling.
    pub fn send_anonymous(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        Ok(self.transport.execute(request)?)
    }

    /// Sends `request` with the current credentials.
    ///
    /// Non-success responses are returned as data for the caller to
    /// classify, with one exception: a 401 on the first attempt triggers a
    /// refresh and, if it succeeds, exactly one retry whose response is
    /// returned instead. When no refresh is possible the original 401 is
    /// returned. Only a transport failure yields `Err`.
    pub fn dispatch(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut attempt = Attempt::First;
        let mut outgoing = self.attach_token(request);

        loop {
            debug!(method = request.method.as_str(), path = %request.path, ?attempt, "sending request");
            let response = self.transport.execute(&outgoing)?;

            if !response.is_unauthorized() {
                return Ok(response);
            }
            if attempt == Attempt::Retry {
                debug!(path = %request.path, "retried request rejected again, giving up");
                return Ok(response);
            }

            attempt = Attempt::Retry;
            match self.renew_access_token(outgoing.bearer_token()) {
                Some(token) => {
                    outgoing = request.with_header(AUTHORIZATION, &format!("Bearer {token}"));
                }
                None => return Ok(response),
            }
        }
    }

    /// Produces an access token to retry with, or `None` when the original
    /// 401 has to stand.
    fn renew_access_token(&self, stale: Option<&str>) -> Option<String> {
        let _guard = self.refresh_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(current) = self.session.access_token() {
            if stale != Some(current.as_str()) {
                debug!("access token already renewed by another request");
                return Some(current);
            }
        }

        let Some(refresh) = self.session.refresh_token() else {
            debug!("no refresh token, propagating 401");
            return None;
        };

        match self.request_refresh(&refresh) {
            Ok(access) => {
                if let Err(e) = self.session.set_access_token(&access) {
                    warn!(error = %e, "failed to persist refreshed access token");
                }
                info!("access token refreshed");
                Some(access)
            }
            Err(e) => {
                warn!(error = %e, "refresh token rejected, clearing session");
                if let Err(e) = self.session.clear() {
                    warn!(error = %e, "failed to clear session store");
                }
                self.notify_session_expired();
                None
            }
        }
    }

    fn request_refresh(&self, refresh: &str) -> Result<String, ApiError> {
        let request = self.endpoints.build_refresh_token(refresh)?;
        let response = self.transport.execute(&request)?;
        self.endpoints.parse_refresh_token(response)
    }

    fn notify_session_expired(&self) {
        let event = SessionExpired {
            login_path: self.login_path.clone(),
        };
        if let Some(handler) = &self.on_session_expired {
            handler(&event);
        }
    }
}
