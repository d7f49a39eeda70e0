use serde::{Deserialize, Serialize};

use crate::domain::{GoalStatus, GoalType, RewardStatus};

/// Uniform response for lifecycle transitions. `applied == false` means the
/// precondition did not hold (wrong status, wrong owner, insufficient
/// balance); callers branch on it instead of catching errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppliedResp {
    pub applied: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceDto {
    pub child_id: String,
    pub total_points: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChildDto {
    pub id: String,
    pub display_name: String,
}

// Tasks

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTaskReq {
    pub child_id: String,
    pub title: String,
    pub points: i32,
    pub recurrence: Option<String>,
    pub category: Option<String>,
    pub timing_mode: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResp {
    pub id: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompleteTaskReq {
    /// Calendar date selecting the instance of a recurring task. Absent for
    /// one-off tasks.
    pub date: Option<chrono::NaiveDate>,
    pub photo_ref: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApproveTaskReq {
    pub date: Option<chrono::NaiveDate>,
}

// Routines

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoutineReq {
    pub child_id: String,
    pub title: String,
    /// "HH:MM" local time of day.
    pub start_time: String,
    pub end_time: String,
    pub recurrence: Option<String>,
    pub bonus_points: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReorderTasksReq {
    /// routine-task id -> new sequence order. Unknown ids are ignored.
    pub ordering: std::collections::HashMap<i32, i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoutineCompletionResp {
    pub applied: bool,
    /// Bonus points awarded; 0 is a valid, recorded completion.
    pub bonus_awarded: i32,
}

// Goals

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGoalReq {
    pub child_id: String,
    pub title: String,
    pub target_points: i32,
    pub goal_type: GoalType,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub requires_approval: bool,
    pub reward_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RejectGoalReq {
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GoalDto {
    pub id: i32,
    pub child_id: String,
    pub title: String,
    pub target_points: i32,
    pub goal_type: GoalType,
    pub status: GoalStatus,
    pub requires_approval: bool,
    pub end_date: chrono::NaiveDate,
}

// Rewards

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRewardReq {
    pub title: String,
    pub description: Option<String>,
    pub point_cost: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DenyRewardReq {
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RewardDto {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub point_cost: i32,
    pub status: RewardStatus,
    pub redeemed_by: Option<String>,
}

// Dashboards

#[derive(Debug, Serialize, Deserialize)]
pub struct ParentDashboardDto {
    pub children: Vec<ParentDashboardChildDto>,
    pub active_rewards: Vec<RewardDto>,
    pub redeemed_rewards: Vec<RewardDto>,
    pub pending_goal_approvals: Vec<GoalDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ParentDashboardChildDto {
    pub id: String,
    pub display_name: String,
    pub total_points_earned: i32,
    pub goals_met: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChildDashboardDto {
    pub child_id: String,
    pub remaining_points: i32,
    /// Percentage of the fixed 100-point threshold, capped at 100.
    pub points_progress_pct: i32,
    pub available_rewards: Vec<RewardDto>,
    pub active_goals: Vec<GoalDto>,
    pub completed_goals: Vec<GoalDto>,
    pub redeemed_rewards: Vec<RewardDto>,
}
