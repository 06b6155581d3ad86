use crate::{
    entities::pick_wave::{PickTask, PickWave, WaveStatus},
    errors::ServiceError,
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WaveListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Wave status filter (IN_PROGRESS, COMPLETED)
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "880e8400-e29b-41d4-a716-446655440000",
    "wave_number": "WAVE-000007",
    "status": "IN_PROGRESS",
    "order_count": 2,
    "task_count": 5
}))]
pub struct WaveSummary {
    pub id: Uuid,
    #[schema(example = "WAVE-000007")]
    pub wave_number: String,
    /// Wave status (IN_PROGRESS, COMPLETED)
    pub status: String,
    pub order_ids: Vec<Uuid>,
    pub order_count: usize,
    pub task_count: usize,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<PickWave> for WaveSummary {
    fn from(wave: PickWave) -> Self {
        Self {
            id: wave.id,
            wave_number: wave.wave_number,
            status: wave.status.to_string(),
            order_count: wave.order_ids.len(),
            task_count: wave.task_ids.len(),
            order_ids: wave.order_ids,
            created_at: wave.created_at,
            completed_at: wave.completed_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PickTaskSummary {
    pub id: Uuid,
    pub wave_id: Uuid,
    pub outbound_order_id: Uuid,
    pub product_id: Uuid,
    pub source_location_id: Uuid,
    /// LPN the picked units are collected onto
    #[schema(example = "LPN-00000043")]
    pub target_lpn: String,
    pub quantity_to_pick: i32,
    pub quantity_picked: Option<i32>,
    /// Task status (PENDING, COMPLETED)
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl From<PickTask> for PickTaskSummary {
    fn from(task: PickTask) -> Self {
        Self {
            id: task.id,
            wave_id: task.wave_id,
            outbound_order_id: task.outbound_order_id,
            product_id: task.product_id,
            source_location_id: task.source_location_id,
            target_lpn: task.target_lpn,
            quantity_to_pick: task.quantity_to_pick,
            quantity_picked: task.quantity_picked,
            status: task.status.to_string(),
            created_at: task.created_at,
            confirmed_at: task.confirmed_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "outbound_order_ids": ["550e8400-e29b-41d4-a716-446655440000"]
}))]
pub struct CreateWaveRequest {
    /// Outbound orders to release together; all must be PLANNED
    pub outbound_order_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ConfirmPickRequest {
    /// Units actually picked; under-picks are allowed, over-picks are not
    #[validate(range(min = 0))]
    pub quantity_picked: i32,
}

fn parse_wave_status(value: &str) -> Result<WaveStatus, ServiceError> {
    let status = match value {
        "IN_PROGRESS" => WaveStatus::InProgress,
        "COMPLETED" => WaveStatus::Completed,
        other => {
            return Err(ServiceError::ValidationError(format!(
                "Unsupported wave status '{}'",
                other
            )))
        }
    };
    Ok(status)
}

#[utoipa::path(
    post,
    path = "/api/v1/waves",
    request_body = CreateWaveRequest,
    responses(
        (status = 200, description = "Wave created, stock reserved", body = ApiResponse<WaveSummary>),
        (status = 400, description = "Empty selection", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order not pickable", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock, nothing reserved", body = crate::errors::ErrorResponse)
    ),
    tag = "picking"
)]
pub async fn create_wave(
    State(state): State<AppState>,
    Json(payload): Json<CreateWaveRequest>,
) -> ApiResult<WaveSummary> {
    let wave = state
        .picking_service
        .create_wave(payload.outbound_order_ids)
        .await?;
    Ok(Json(ApiResponse::success(WaveSummary::from(wave))))
}

#[utoipa::path(
    get,
    path = "/api/v1/waves",
    params(WaveListQuery),
    responses(
        (status = 200, description = "Waves listed", body = ApiResponse<PaginatedResponse<WaveSummary>>)
    ),
    tag = "picking"
)]
pub async fn list_waves(
    State(state): State<AppState>,
    Query(query): Query<WaveListQuery>,
) -> ApiResult<PaginatedResponse<WaveSummary>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let status = query.status.as_deref().map(parse_wave_status).transpose()?;

    let (waves, total) = state.picking_service.list_waves(page, limit, status).await?;
    let items: Vec<WaveSummary> = waves.into_iter().map(WaveSummary::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/waves/:id",
    params(
        ("id" = Uuid, Path, description = "Wave ID")
    ),
    responses(
        (status = 200, description = "Wave fetched", body = ApiResponse<WaveSummary>),
        (status = 404, description = "Wave not found", body = crate::errors::ErrorResponse)
    ),
    tag = "picking"
)]
pub async fn get_wave(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<WaveSummary> {
    let wave = state.picking_service.get_wave(id).await?;
    Ok(Json(ApiResponse::success(WaveSummary::from(wave))))
}

#[utoipa::path(
    get,
    path = "/api/v1/waves/:id/tasks",
    params(
        ("id" = Uuid, Path, description = "Wave ID")
    ),
    responses(
        (status = 200, description = "Wave tasks in walk order", body = ApiResponse<Vec<PickTaskSummary>>),
        (status = 404, description = "Wave not found", body = crate::errors::ErrorResponse)
    ),
    tag = "picking"
)]
pub async fn list_wave_tasks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<PickTaskSummary>> {
    let tasks = state.picking_service.list_wave_tasks(id).await?;
    let items: Vec<PickTaskSummary> = tasks.into_iter().map(PickTaskSummary::from).collect();
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/pick-tasks/:id",
    params(
        ("id" = Uuid, Path, description = "Pick task ID")
    ),
    responses(
        (status = 200, description = "Pick task fetched", body = ApiResponse<PickTaskSummary>),
        (status = 404, description = "Task not found", body = crate::errors::ErrorResponse)
    ),
    tag = "picking"
)]
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PickTaskSummary> {
    let task = state.picking_service.get_task(id).await?;
    Ok(Json(ApiResponse::success(PickTaskSummary::from(task))))
}

#[utoipa::path(
    post,
    path = "/api/v1/pick-tasks/:id/confirm",
    params(
        ("id" = Uuid, Path, description = "Pick task ID")
    ),
    request_body = ConfirmPickRequest,
    responses(
        (status = 200, description = "Pick confirmed", body = ApiResponse<PickTaskSummary>),
        (status = 409, description = "Over-pick or already confirmed", body = crate::errors::ErrorResponse)
    ),
    tag = "picking"
)]
pub async fn confirm_pick_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmPickRequest>,
) -> ApiResult<PickTaskSummary> {
    payload.validate()?;
    let task = state
        .picking_service
        .confirm_pick_task(id, payload.quantity_picked)
        .await?;
    Ok(Json(ApiResponse::success(PickTaskSummary::from(task))))
}
