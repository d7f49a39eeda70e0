pub mod auth;
mod config;

use axum::http::{HeaderName, HeaderValue};
use axum::middleware;
use axum::response::Response as AxumResponse;
use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::{Method, StatusCode, header},
    routing::{get, post},
};
pub use config::{AppConfig, ConfigError, UserConfig};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Span, info_span};
use uuid::Uuid;

use chorepoints_shared::api;
use chorepoints_shared::domain::{GoalStatus, GoalType, RewardStatus};

use crate::notify::{Event, LogNotifier, SharedNotifier};
use crate::storage::models::{Goal, Reward, Task};
use crate::storage::{StorageError, Store, goals, rewards, routines, tasks};
use auth::UserCtx;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Store,
    pub notifier: SharedNotifier,
    tz: chrono_tz::Tz,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig, store: Store) -> Self {
        let tz = config.tz().unwrap_or(chrono_tz::UTC);
        Self {
            config,
            store,
            notifier: std::sync::Arc::new(LogNotifier),
            tz,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: SharedNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Family-local wall clock, for routine bonus windows and instance dates.
    pub fn now_local(&self) -> chrono::NaiveDateTime {
        chrono::Utc::now().with_timezone(&self.tz).naive_local()
    }
}

#[derive(Clone, Debug)]
struct ReqId(pub String);

pub fn router(state: AppState) -> Router {
    let private = Router::new()
        .route("/api/v1/children", get(api_list_children))
        .route("/api/v1/children/{id}/balance", get(api_balance))
        .route("/api/v1/tasks", post(api_create_task))
        .route("/api/v1/tasks/{id}/complete", post(api_complete_task))
        .route("/api/v1/tasks/{id}/approve", post(api_approve_task))
        .route("/api/v1/tasks/{id}/reject", post(api_reject_task))
        .route("/api/v1/routines", post(api_create_routine))
        .route("/api/v1/routines/{id}/complete", post(api_complete_routine))
        .route("/api/v1/routines/{id}/reorder", post(api_reorder_routine))
        .route(
            "/api/v1/routine-tasks/{id}/complete",
            post(api_complete_routine_task),
        )
        .route(
            "/api/v1/routine-tasks/{id}/approve",
            post(api_approve_routine_task),
        )
        .route("/api/v1/goals", post(api_create_goal))
        .route("/api/v1/goals/{id}/request", post(api_request_goal))
        .route("/api/v1/goals/{id}/approve", post(api_approve_goal))
        .route("/api/v1/goals/{id}/reject", post(api_reject_goal))
        .route("/api/v1/goals/{id}/reactivate", post(api_reactivate_goal))
        .route("/api/v1/goals/{id}/complete", post(api_complete_goal))
        .route("/api/v1/rewards", post(api_create_reward))
        .route("/api/v1/rewards/{id}/redeem", post(api_redeem_reward))
        .route("/api/v1/rewards/{id}/fulfill", post(api_fulfill_reward))
        .route("/api/v1/rewards/{id}/deny", post(api_deny_reward))
        .route("/api/v1/dashboard/parent", get(api_parent_dashboard))
        .route("/api/v1/dashboard/child/{id}", get(api_child_dashboard))
        .with_state(state.clone())
        // Outermost layer runs first: resolve the user, then record it on
        // the request span.
        .layer(middleware::from_fn(set_auth_span_fields))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_user,
        ));

    // Trace with request context (method, path, request_id)
    let trace = TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
        let request_id = req
            .extensions()
            .get::<ReqId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
            user_id = tracing::field::Empty,
            role = tracing::field::Empty,
        )
    });

    let app = Router::new()
        .route("/healthz", get(health))
        .merge(private)
        .with_state(state.clone())
        .layer(trace)
        .layer(middleware::from_fn(add_request_id));

    // Optionally add CORS for dev if configured
    if let Some(origin) = &state.config.dev_cors_origin {
        let hv = header::HeaderValue::from_str(origin)
            .unwrap_or(header::HeaderValue::from_static("http://localhost:5173"));
        let cors = CorsLayer::new()
            .allow_origin(hv)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                HeaderName::from_static(auth::USER_HEADER),
            ]);
        app.layer(cors)
    } else {
        app
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn add_request_id(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let hdr = HeaderName::from_static("x-request-id");
    // Use provided x-request-id if present, else generate
    let rid = req
        .headers()
        .get(&hdr)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(ReqId(rid.clone()));
    let mut resp = next.run(req).await;
    if let Ok(hv) = HeaderValue::from_str(&rid) {
        resp.headers_mut().insert(hdr, hv);
    }
    Ok(resp)
}

async fn set_auth_span_fields(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    if let Some(ctx) = req.extensions().get::<UserCtx>() {
        let span = Span::current();
        span.record("user_id", tracing::field::display(&ctx.user_id));
        span.record("role", tracing::field::display(ctx.role));
    }
    Ok(next.run(req).await)
}

async fn api_list_children(
    State(state): State<AppState>,
    Extension(_ctx): Extension<UserCtx>,
) -> Result<Json<Vec<api::ChildDto>>, AppError> {
    let rows = state
        .store
        .list_children()
        .await
        .map_err(AppError::internal)?;
    let items = rows
        .into_iter()
        .map(|c| api::ChildDto {
            id: c.id,
            display_name: c.display_name,
        })
        .collect();
    Ok(Json(items))
}

async fn api_balance(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::BalanceDto>, AppError> {
    let child = ctx.acting_child(&id)?.to_string();
    let total_points = state
        .store
        .get_balance(&child)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(api::BalanceDto {
        child_id: child,
        total_points,
    }))
}

// Tasks

async fn api_create_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Json(body): Json<api::CreateTaskReq>,
) -> Result<Json<api::CreatedResp>, AppError> {
    ctx.require_parent()?;
    if body.points <= 0 {
        return Err(AppError::bad_request("points must be positive"));
    }
    let id = state
        .store
        .create_task(tasks::CreateTask {
            parent_id: ctx.family_root.clone(),
            child_id: body.child_id,
            title: body.title,
            points: body.points,
            recurrence: body.recurrence,
            category: body.category,
            timing_mode: body.timing_mode,
        })
        .await
        .map_err(AppError::internal)?;
    Ok(Json(api::CreatedResp { id }))
}

async fn api_complete_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<i32>,
    Json(body): Json<api::CompleteTaskReq>,
) -> Result<Json<api::AppliedResp>, AppError> {
    let task = require_task(&state, id).await?;
    let child = ctx.acting_child(&task.child_id)?.to_string();
    let applied = match instance_date(&task, body.date, state.now_local().date()) {
        Some(date) => state
            .store
            .complete_task_instance(id, date, &child, body.photo_ref)
            .await
            .map_err(AppError::internal)?,
        None => state
            .store
            .complete_task(id, &child, body.photo_ref)
            .await
            .map_err(AppError::internal)?,
    };
    if applied {
        state.notifier.notify(Event::TaskCompleted {
            task_id: id,
            child_id: child,
        });
    }
    Ok(Json(api::AppliedResp { applied }))
}

async fn api_approve_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<i32>,
    Json(body): Json<api::ApproveTaskReq>,
) -> Result<Json<api::AppliedResp>, AppError> {
    ctx.require_parent()?;
    let task = require_task(&state, id).await?;
    let applied = match instance_date(&task, body.date, state.now_local().date()) {
        Some(date) => state
            .store
            .approve_task_instance(id, date)
            .await
            .map_err(AppError::internal)?,
        None => state
            .store
            .approve_task(id)
            .await
            .map_err(AppError::internal)?,
    };
    if applied {
        state.notifier.notify(Event::TaskApproved {
            task_id: id,
            child_id: task.child_id.clone(),
        });
        // Freshly awarded points may push an automatic goal over its target
        state
            .store
            .evaluate_goals_for_child(&task.child_id)
            .await
            .map_err(AppError::internal)?;
    }
    Ok(Json(api::AppliedResp { applied }))
}

async fn api_reject_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<i32>,
    Json(body): Json<api::ApproveTaskReq>,
) -> Result<Json<api::AppliedResp>, AppError> {
    ctx.require_parent()?;
    let task = require_task(&state, id).await?;
    let applied = match instance_date(&task, body.date, state.now_local().date()) {
        Some(date) => state
            .store
            .reject_task_instance(id, date)
            .await
            .map_err(AppError::internal)?,
        None => state
            .store
            .reject_task(id)
            .await
            .map_err(AppError::internal)?,
    };
    Ok(Json(api::AppliedResp { applied }))
}

// Routines

async fn api_create_routine(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Json(body): Json<api::CreateRoutineReq>,
) -> Result<Json<api::CreatedResp>, AppError> {
    ctx.require_parent()?;
    let start = parse_time(&body.start_time)?;
    let end = parse_time(&body.end_time)?;
    let id = state
        .store
        .create_routine(routines::CreateRoutine {
            parent_id: ctx.family_root.clone(),
            child_id: body.child_id,
            title: body.title,
            start_time: start,
            end_time: end,
            recurrence: body.recurrence,
            bonus_points: body.bonus_points,
        })
        .await
        .map_err(AppError::internal)?;
    Ok(Json(api::CreatedResp { id }))
}

async fn api_complete_routine(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<i32>,
) -> Result<Json<api::RoutineCompletionResp>, AppError> {
    let routine = state
        .store
        .get_routine(id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("routine not found: {id}")))?;
    let child = ctx.acting_child(&routine.child_id)?.to_string();
    let bonus = state
        .store
        .complete_routine(id, &child, state.now_local())
        .await
        .map_err(AppError::internal)?;
    match bonus {
        Some(bonus) => {
            state.notifier.notify(Event::RoutineCompleted {
                routine_id: id,
                child_id: child.clone(),
                bonus,
            });
            if bonus > 0 {
                // The bonus may push an automatic goal over its target
                state
                    .store
                    .evaluate_goals_for_child(&child)
                    .await
                    .map_err(AppError::internal)?;
            }
            Ok(Json(api::RoutineCompletionResp {
                applied: true,
                bonus_awarded: bonus,
            }))
        }
        None => Ok(Json(api::RoutineCompletionResp {
            applied: false,
            bonus_awarded: 0,
        })),
    }
}

async fn api_reorder_routine(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<i32>,
    Json(body): Json<api::ReorderTasksReq>,
) -> Result<Json<api::AppliedResp>, AppError> {
    ctx.require_parent()?;
    state
        .store
        .reorder_routine_tasks(id, body.ordering)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(api::AppliedResp { applied: true }))
}

async fn api_complete_routine_task(
    State(state): State<AppState>,
    Extension(_ctx): Extension<UserCtx>,
    Path(id): Path<i32>,
) -> Result<Json<api::AppliedResp>, AppError> {
    let applied = state
        .store
        .complete_routine_task(id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(api::AppliedResp { applied }))
}

async fn api_approve_routine_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<i32>,
) -> Result<Json<api::AppliedResp>, AppError> {
    ctx.require_parent()?;
    let applied = state
        .store
        .approve_routine_task(id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(api::AppliedResp { applied }))
}

// Goals

async fn api_create_goal(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Json(body): Json<api::CreateGoalReq>,
) -> Result<Json<api::CreatedResp>, AppError> {
    ctx.require_parent()?;
    if body.target_points <= 0 {
        return Err(AppError::bad_request("target_points must be positive"));
    }
    if body.end_date < body.start_date {
        return Err(AppError::bad_request("end_date before start_date"));
    }
    let id = state
        .store
        .create_goal(goals::CreateGoal {
            parent_id: ctx.family_root.clone(),
            child_id: body.child_id,
            title: body.title,
            target_points: body.target_points,
            goal_type: body.goal_type,
            start_date: body.start_date,
            end_date: body.end_date,
            requires_approval: body.requires_approval,
            reward_id: body.reward_id,
        })
        .await
        .map_err(AppError::internal)?;
    Ok(Json(api::CreatedResp { id }))
}

async fn api_request_goal(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<i32>,
) -> Result<Json<api::AppliedResp>, AppError> {
    let goal = require_goal(&state, id).await?;
    let child = ctx.acting_child(&goal.child_id)?.to_string();
    let applied = state
        .store
        .request_goal_completion(id, &child)
        .await
        .map_err(AppError::internal)?;
    if applied {
        state.notifier.notify(Event::GoalRequested {
            goal_id: id,
            child_id: child,
        });
    }
    Ok(Json(api::AppliedResp { applied }))
}

async fn api_approve_goal(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<i32>,
) -> Result<Json<api::AppliedResp>, AppError> {
    ctx.require_parent()?;
    let goal = require_goal(&state, id).await?;
    let applied = state
        .store
        .approve_goal(id, &ctx.family_root)
        .await
        .map_err(AppError::internal)?;
    if applied {
        state.notifier.notify(Event::GoalApproved {
            goal_id: id,
            child_id: goal.child_id.clone(),
        });
        // The award itself is earning progress for other automatic goals
        state
            .store
            .evaluate_goals_for_child(&goal.child_id)
            .await
            .map_err(AppError::internal)?;
    }
    Ok(Json(api::AppliedResp { applied }))
}

async fn api_reject_goal(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<i32>,
    Json(body): Json<api::RejectGoalReq>,
) -> Result<Json<api::AppliedResp>, AppError> {
    ctx.require_parent()?;
    let goal = require_goal(&state, id).await?;
    let applied = state
        .store
        .reject_goal(id, &ctx.family_root, &body.comment)
        .await
        .map_err(AppError::internal)?;
    if applied {
        state.notifier.notify(Event::GoalRejected {
            goal_id: id,
            child_id: goal.child_id,
        });
    }
    Ok(Json(api::AppliedResp { applied }))
}

async fn api_reactivate_goal(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<i32>,
) -> Result<Json<api::AppliedResp>, AppError> {
    ctx.require_parent()?;
    let applied = state
        .store
        .reactivate_goal(id, &ctx.family_root)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(api::AppliedResp { applied }))
}

async fn api_complete_goal(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<i32>,
) -> Result<Json<api::AppliedResp>, AppError> {
    let goal = require_goal(&state, id).await?;
    let child = ctx.acting_child(&goal.child_id)?.to_string();
    let applied = state
        .store
        .complete_goal_directly(id, &child)
        .await
        .map_err(AppError::internal)?;
    if applied {
        state.notifier.notify(Event::GoalApproved {
            goal_id: id,
            child_id: child.clone(),
        });
        state
            .store
            .evaluate_goals_for_child(&child)
            .await
            .map_err(AppError::internal)?;
    }
    Ok(Json(api::AppliedResp { applied }))
}

// Rewards

async fn api_create_reward(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Json(body): Json<api::CreateRewardReq>,
) -> Result<Json<api::CreatedResp>, AppError> {
    ctx.require_parent()?;
    if body.point_cost <= 0 {
        return Err(AppError::bad_request("point_cost must be positive"));
    }
    let id = state
        .store
        .create_reward(rewards::CreateReward {
            parent_id: ctx.family_root.clone(),
            title: body.title,
            description: body.description,
            point_cost: body.point_cost,
        })
        .await
        .map_err(AppError::internal)?;
    Ok(Json(api::CreatedResp { id }))
}

async fn api_redeem_reward(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<i32>,
) -> Result<Json<api::AppliedResp>, AppError> {
    let child = match ctx.child_id.as_deref() {
        Some(c) => c.to_string(),
        None => return Err(AppError::forbidden()),
    };
    let applied = state
        .store
        .redeem_reward(id, &child)
        .await
        .map_err(AppError::internal)?;
    if applied {
        state.notifier.notify(Event::RewardRedeemed {
            reward_id: id,
            child_id: child,
        });
    }
    Ok(Json(api::AppliedResp { applied }))
}

async fn api_fulfill_reward(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<i32>,
) -> Result<Json<api::AppliedResp>, AppError> {
    ctx.require_parent()?;
    let applied = state
        .store
        .fulfill_reward(id, &ctx.user_id)
        .await
        .map_err(AppError::internal)?;
    if applied {
        state.notifier.notify(Event::RewardFulfilled { reward_id: id });
    }
    Ok(Json(api::AppliedResp { applied }))
}

async fn api_deny_reward(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<i32>,
    Json(body): Json<api::DenyRewardReq>,
) -> Result<Json<api::AppliedResp>, AppError> {
    ctx.require_parent()?;
    let applied = state
        .store
        .deny_reward(id, &ctx.user_id, body.note)
        .await
        .map_err(AppError::internal)?;
    if applied {
        state.notifier.notify(Event::RewardDenied { reward_id: id });
    }
    Ok(Json(api::AppliedResp { applied }))
}

// Dashboards

async fn api_parent_dashboard(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
) -> Result<Json<api::ParentDashboardDto>, AppError> {
    ctx.require_parent()?;
    let d = state
        .store
        .parent_dashboard(&ctx.family_root)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(api::ParentDashboardDto {
        children: d
            .children
            .into_iter()
            .map(|s| api::ParentDashboardChildDto {
                id: s.child.id,
                display_name: s.child.display_name,
                total_points_earned: s.total_points_earned,
                goals_met: s.goals_met,
            })
            .collect(),
        active_rewards: dto_rewards(d.active_rewards)?,
        redeemed_rewards: dto_rewards(d.redeemed_rewards)?,
        pending_goal_approvals: dto_goals(d.pending_goal_approvals)?,
    }))
}

async fn api_child_dashboard(
    State(state): State<AppState>,
    Extension(ctx): Extension<UserCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::ChildDashboardDto>, AppError> {
    let child = ctx.acting_child(&id)?.to_string();
    let d = state
        .store
        .child_dashboard(&child)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(api::ChildDashboardDto {
        child_id: child,
        remaining_points: d.remaining_points,
        points_progress_pct: d.points_progress_pct,
        available_rewards: dto_rewards(d.available_rewards)?,
        active_goals: dto_goals(d.active_goals)?,
        completed_goals: dto_goals(d.completed_goals)?,
        redeemed_rewards: dto_rewards(d.redeemed_rewards)?,
    }))
}

// Helpers

async fn require_task(state: &AppState, id: i32) -> Result<Task, AppError> {
    state
        .store
        .get_task(id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("task not found: {id}")))
}

async fn require_goal(state: &AppState, id: i32) -> Result<Goal, AppError> {
    state
        .store
        .get_goal(id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("goal not found: {id}")))
}

/// Recurring tasks always address a dated instance; the body date defaults
/// to today in the family's timezone. One-off tasks ignore the date.
fn instance_date(
    task: &Task,
    requested: Option<chrono::NaiveDate>,
    today: chrono::NaiveDate,
) -> Option<chrono::NaiveDate> {
    if !task.is_recurring() {
        return None;
    }
    Some(requested.unwrap_or(today))
}

fn parse_time(s: &str) -> Result<chrono::NaiveTime, AppError> {
    chrono::NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| chrono::NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| AppError::bad_request(format!("invalid time of day: {s}")))
}

fn dto_rewards(rows: Vec<Reward>) -> Result<Vec<api::RewardDto>, AppError> {
    rows.into_iter()
        .map(|r| {
            let status: RewardStatus = r.status.parse().map_err(AppError::internal)?;
            Ok(api::RewardDto {
                id: r.id,
                title: r.title,
                description: r.description,
                point_cost: r.point_cost,
                status,
                redeemed_by: r.redeemed_by,
            })
        })
        .collect()
}

fn dto_goals(rows: Vec<Goal>) -> Result<Vec<api::GoalDto>, AppError> {
    rows.into_iter()
        .map(|g| {
            let status: GoalStatus = g.status.parse().map_err(AppError::internal)?;
            let goal_type: GoalType = g.goal_type.parse().map_err(AppError::internal)?;
            Ok(api::GoalDto {
                id: g.id,
                child_id: g.child_id,
                title: g.title,
                target_points: g.target_points,
                goal_type,
                status,
                requires_approval: g.requires_approval,
                end_date: g.end_date,
            })
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    Internal(String),
}

impl AppError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        Self::BadRequest(msg.into())
    }
    pub(crate) fn unauthorized() -> Self {
        Self::Unauthorized
    }
    pub(crate) fn forbidden() -> Self {
        Self::Forbidden
    }
    fn not_found<T: Into<String>>(msg: T) -> Self {
        Self::NotFound(msg.into())
    }
    fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::internal(e)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg, kind, detail) = match self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m, "bad_request", None),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized".into(),
                "unauthorized",
                None,
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".into(), "forbidden", None),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m, "not_found", None),
            // Do not leak internal error details to clients, but log them
            AppError::Internal(m) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
                "internal",
                Some(m),
            ),
        };
        if let Some(detail) = detail {
            tracing::error!(status = %status, kind = kind, message = %msg, detail = %detail, "request failed");
        } else {
            tracing::error!(status = %status, kind = kind, message = %msg, "request failed");
        }
        let body = axum::Json(ErrorBody { error: msg });
        (status, body).into_response()
    }
}
