//! In-memory stand-in for the clinic REST backend.
//!
//! Serves the `/api` routes the dashboard client calls, with opaque bearer
//! tokens. Tests drive token lifetimes directly through `AppState`
//! (`expire_access_tokens`, `revoke_refresh_tokens`) instead of waiting on
//! clocks.

mod error;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub use error::AppError;

const MAX_PAGE_SIZE: usize = 100;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    pub phn: u32,
    pub name: String,
    pub birth_date: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

#[derive(Deserialize)]
pub struct CreatePatient {
    pub phn: Option<u32>,
    pub name: Option<String>,
    #[serde(rename = "birthDate")]
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdatePatient {
    pub phn: Option<u32>,
    pub name: Option<String>,
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshBody {
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
    pub search: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// Page-number envelope shared by list and search.
#[derive(Debug, Serialize, Deserialize)]
pub struct Page {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Patient>,
}

#[derive(Default)]
struct Store {
    patients: BTreeMap<u32, Patient>,
    current: Option<u32>,
    users: HashMap<String, String>,
    access_tokens: HashSet<String>,
    refresh_tokens: HashSet<String>,
    refresh_calls: usize,
}

#[derive(Clone, Default)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
}

impl AppState {
    /// State with one account able to log in.
    pub fn with_user(username: &str, password: &str) -> Self {
        let mut store = Store::default();
        store.users.insert(username.to_string(), password.to_string());
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// Issues a token pair without going through the login route.
    pub async fn issue_tokens(&self) -> TokenPair {
        let mut store = self.store.write().await;
        let tokens = TokenPair {
            access: Uuid::new_v4().to_string(),
            refresh: Uuid::new_v4().to_string(),
        };
        store.access_tokens.insert(tokens.access.clone());
        store.refresh_tokens.insert(tokens.refresh.clone());
        tokens
    }

    /// Invalidates every access token; refresh tokens stay valid.
    pub async fn expire_access_tokens(&self) {
        self.store.write().await.access_tokens.clear();
    }

    /// Invalidates every refresh token.
    pub async fn revoke_refresh_tokens(&self) {
        self.store.write().await.refresh_tokens.clear();
    }

    /// Number of calls to the refresh endpoint so far.
    pub async fn refresh_calls(&self) -> usize {
        self.store.read().await.refresh_calls
    }

    pub async fn insert_patient(&self, patient: Patient) {
        self.store.write().await.patients.insert(patient.phn, patient);
    }
}

pub fn app() -> Router {
    app_with_state(AppState::default())
}

pub fn app_with_state(state: AppState) -> Router {
    let protected = Router::new()
        .route("/patients/", get(list_patients))
        .route("/patients/search/", get(search_patients))
        .route("/patients/create/", post(create_patient))
        .route("/patients/current/", get(get_current_patient))
        .route("/patients/unset-current/", post(unset_current_patient))
        .route("/patients/{phn}/update/", put(update_patient))
        .route("/patients/{phn}/delete/", delete(delete_patient))
        .route("/patients/{phn}/set-current/", post(set_current_patient))
        .route("/logout/", post(logout))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    let public = Router::new()
        .route("/token/", post(obtain_token))
        .route("/token/refresh/", post(refresh_token));

    Router::new()
        .nest("/api", public.merge(protected))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, AppError> {
    let Some(token) = bearer(request.headers()) else {
        return Err(AppError::Unauthorized(
            "Authentication credentials were not provided.".to_string(),
        ));
    };
    if !state.store.read().await.access_tokens.contains(&token) {
        tracing::debug!("rejected unknown or expired access token");
        return Err(AppError::Unauthorized(
            "Given token not valid for any token type".to_string(),
        ));
    }
    Ok(next.run(request).await)
}

// --- tokens ---

async fn obtain_token(
    State(state): State<AppState>,
    Json(input): Json<Credentials>,
) -> Result<Json<TokenPair>, AppError> {
    let known = {
        let store = state.store.read().await;
        store.users.get(&input.username) == Some(&input.password)
    };
    if !known {
        return Err(AppError::Unauthorized(
            "No active account found with the given credentials".to_string(),
        ));
    }
    tracing::info!(username = %input.username, "issued tokens");
    Ok(Json(state.issue_tokens().await))
}

async fn refresh_token(
    State(state): State<AppState>,
    Json(input): Json<RefreshBody>,
) -> Result<Json<Value>, AppError> {
    let mut store = state.store.write().await;
    store.refresh_calls += 1;
    if !store.refresh_tokens.contains(&input.refresh) {
        return Err(AppError::Unauthorized("Token is invalid or expired".to_string()));
    }
    let access = Uuid::new_v4().to_string();
    store.access_tokens.insert(access.clone());
    Ok(Json(json!({ "access": access })))
}

async fn logout(State(state): State<AppState>, Json(input): Json<RefreshBody>) -> Result<Json<Value>, AppError> {
    let mut store = state.store.write().await;
    if !store.refresh_tokens.remove(&input.refresh) {
        return Err(AppError::BadRequest("Token is invalid or expired".to_string()));
    }
    Ok(Json(json!({ "message": "Logout successful" })))
}

// --- patients ---

fn paginate(patients: Vec<Patient>, params: &SearchParams) -> Result<Page, AppError> {
    let page_size = params.page_size.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = params.page.unwrap_or(1);
    let count = patients.len();
    let pages = count.div_ceil(page_size).max(1);
    if page == 0 || page > pages {
        return Err(AppError::NotFound("Invalid page.".to_string()));
    }

    let results = patients
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();
    Ok(Page {
        count,
        next: (page < pages).then(|| format!("?page={}", page + 1)),
        previous: (page > 1).then(|| format!("?page={}", page - 1)),
        results,
    })
}

async fn list_patients(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page>, AppError> {
    let patients: Vec<Patient> = state.store.read().await.patients.values().cloned().collect();
    paginate(patients, &params).map(Json)
}

/// Case-insensitive substring match on the name.
async fn search_patients(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page>, AppError> {
    let term = params.search.clone().unwrap_or_default().to_lowercase();
    let patients: Vec<Patient> = state
        .store
        .read()
        .await
        .patients
        .values()
        .filter(|patient| patient.name.to_lowercase().contains(&term))
        .cloned()
        .collect();
    paginate(patients, &params).map(Json)
}

async fn create_patient(
    State(state): State<AppState>,
    Json(input): Json<CreatePatient>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let (Some(phn), Some(name), Some(birth_date), Some(phone), Some(email), Some(address)) = (
        input.phn,
        input.name,
        input.birth_date,
        input.phone,
        input.email,
        input.address,
    ) else {
        return Err(AppError::BadRequest("All fields are required.".to_string()));
    };

    let mut store = state.store.write().await;
    if store.patients.contains_key(&phn) {
        return Err(AppError::BadRequest("Patient with this PHN already exists.".to_string()));
    }
    let patient = Patient {
        phn,
        name,
        birth_date,
        phone,
        email,
        address,
    };
    store.patients.insert(phn, patient.clone());
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Patient created successfully", "patient": patient })),
    ))
}

async fn update_patient(
    State(state): State<AppState>,
    Path(original_phn): Path<u32>,
    Json(input): Json<UpdatePatient>,
) -> Result<Json<Value>, AppError> {
    let (Some(phn), Some(name), Some(birth_date), Some(phone), Some(email), Some(address)) = (
        input.phn,
        input.name.filter(|v| !v.is_empty()),
        input.birth_date.filter(|v| !v.is_empty()),
        input.phone.filter(|v| !v.is_empty()),
        input.email.filter(|v| !v.is_empty()),
        input.address.filter(|v| !v.is_empty()),
    ) else {
        return Err(AppError::MissingFields);
    };

    let mut store = state.store.write().await;
    if !store.patients.contains_key(&original_phn) {
        return Err(AppError::NotFound("Patient not found.".to_string()));
    }
    if phn != original_phn && store.patients.contains_key(&phn) {
        return Err(AppError::BadRequest("New PHN is already in use.".to_string()));
    }

    store.patients.remove(&original_phn);
    store.patients.insert(
        phn,
        Patient {
            phn,
            name,
            birth_date,
            phone,
            email,
            address,
        },
    );
    if store.current == Some(original_phn) {
        store.current = Some(phn);
    }
    Ok(Json(json!({ "message": "Patient updated successfully." })))
}

async fn delete_patient(State(state): State<AppState>, Path(phn): Path<u32>) -> Result<Json<Value>, AppError> {
    let mut store = state.store.write().await;
    if store.patients.remove(&phn).is_none() {
        return Err(AppError::NotFound("Patient not found".to_string()));
    }
    if store.current == Some(phn) {
        store.current = None;
    }
    Ok(Json(json!({ "message": "Patient deleted successfully" })))
}

async fn set_current_patient(
    State(state): State<AppState>,
    Path(phn): Path<u32>,
) -> Result<Json<Value>, AppError> {
    let mut store = state.store.write().await;
    if !store.patients.contains_key(&phn) {
        return Err(AppError::NotFound("Patient not found.".to_string()));
    }
    store.current = Some(phn);
    Ok(Json(json!({ "message": format!("Patient {phn} set as current patient") })))
}

async fn get_current_patient(State(state): State<AppState>) -> Result<Json<Patient>, AppError> {
    let store = state.store.read().await;
    store
        .current
        .and_then(|phn| store.patients.get(&phn))
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No current patient set".to_string()))
}

async fn unset_current_patient(State(state): State<AppState>) -> Json<Value> {
    state.store.write().await.current = None;
    Json(json!({ "message": "Current patient unset" }))
}
