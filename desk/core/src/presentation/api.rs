// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::application::contracting::ContractingService;
use crate::application::error::ServiceError;
use crate::application::proposal_service::ProposalService;
use crate::domain::proposal::{ProposalId, ProposalStatus};
use crate::domain::repository::RepositoryError;

pub struct AppState {
    pub proposal_service: Arc<dyn ProposalService>,
    pub contracting_service: Arc<dyn ContractingService>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(proposal_service: Arc<dyn ProposalService>, contracting_service: Arc<dyn ContractingService>) -> Self {
        Self {
            proposal_service,
            contracting_service,
            start_time: Instant::now(),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/proposals", get(list_proposals_handler).post(create_proposal_handler))
        .route("/api/proposals/{id}", get(get_proposal_handler))
        .route("/api/proposals/{id}/status", put(set_status_handler))
        .route("/api/proposals/{id}/approve", post(approve_handler))
        .route("/api/contracts", post(contract_proposal_handler))
        .route("/api/contracts/check-status/{proposal_id}", get(check_status_handler))
        .route("/api/contracts/{proposal_id}", get(get_contract_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Error half of every handler: a malformed request or a service failure.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Service(ServiceError),
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError::Service(e)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(e) => match e {
                ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::NotFound(_) | ServiceError::ContractNotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::IllegalTransition { .. } | ServiceError::InvalidState { .. } => StatusCode::CONFLICT,
                ServiceError::Repository(RepositoryError::NotFound(_)) => StatusCode::NOT_FOUND,
                ServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Service(e) => e.to_string(),
        };

        if status.is_server_error() {
            error!(error = %message, "Request failed");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn parse_proposal_id(raw: &str) -> Result<ProposalId, ApiError> {
    ProposalId::from_string(raw).map_err(|_| ApiError::BadRequest(format!("Invalid proposal ID: {}", raw)))
}

fn parse_status(raw: &str) -> Result<ProposalStatus, ApiError> {
    raw.parse::<ProposalStatus>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct CreateProposalRequest {
    pub client_name: String,
    pub coverage_amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ContractRequest {
    pub proposal_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListProposalsQuery {
    pub status: Option<String>,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

async fn create_proposal_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateProposalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let proposal = state
        .proposal_service
        .create_proposal(&request.client_name, request.coverage_amount)
        .await?;

    Ok((StatusCode::CREATED, Json(proposal)))
}

async fn list_proposals_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListProposalsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let proposals = state.proposal_service.list_proposals(status).await?;
    Ok(Json(proposals))
}

async fn get_proposal_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_proposal_id(&id)?;
    let proposal = state.proposal_service.get_proposal(id).await?;
    Ok(Json(proposal))
}

async fn set_status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<SetStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_proposal_id(&id)?;
    let status = parse_status(&request.status)?;
    let change = state.proposal_service.set_proposal_status(id, status).await?;
    Ok(Json(change))
}

async fn approve_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_proposal_id(&id)?;
    let change = state.proposal_service.approve_proposal(id).await?;
    Ok(Json(change))
}

async fn contract_proposal_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ContractRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_proposal_id(&request.proposal_id)?;
    let issuance = state.contracting_service.contract_proposal(id).await?;

    let status = if issuance.already_existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(issuance)))
}

async fn get_contract_handler(
    State(state): State<Arc<AppState>>,
    Path(proposal_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_proposal_id(&proposal_id)?;
    let contract = state.contracting_service.get_contract(id).await?;
    Ok(Json(contract))
}

async fn check_status_handler(
    State(state): State<Arc<AppState>>,
    Path(proposal_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_proposal_id(&proposal_id)?;
    let check = state.contracting_service.check_status(id).await?;
    Ok(Json(check))
}
