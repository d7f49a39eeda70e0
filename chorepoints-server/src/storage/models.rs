use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::prelude::*;

use crate::storage::schema::{
    balances, children, goal_progress, goals, point_deltas, rewards, routine_completions,
    routine_task_links, routine_tasks, routines, task_instances, tasks,
};

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = children)]
pub struct Child {
    pub id: String,
    pub display_name: String,
}

#[derive(Insertable)]
#[diesel(table_name = children)]
pub struct NewChild<'a> {
    pub id: &'a str,
    pub display_name: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = balances)]
pub struct Balance {
    pub child_id: String,
    pub total_points: i32,
}

#[derive(Insertable)]
#[diesel(table_name = balances)]
pub struct NewBalance<'a> {
    pub child_id: &'a str,
    pub total_points: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = point_deltas)]
pub struct PointDelta {
    pub id: i32,
    pub child_id: String,
    pub delta: i32,
    pub reason: String,
    pub source_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = point_deltas)]
pub struct NewPointDelta<'a> {
    pub child_id: &'a str,
    pub delta: i32,
    pub reason: &'a str,
    pub source_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = tasks)]
pub struct Task {
    pub id: i32,
    pub parent_id: String,
    pub child_id: String,
    pub title: String,
    pub points: i32,
    pub recurrence: Option<String>,
    pub category: Option<String>,
    pub timing_mode: String,
    pub status: String,
    pub photo_ref: Option<String>,
    pub completed_at: Option<NaiveDateTime>,
    pub approved_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Task {
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }
}

#[derive(Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTask<'a> {
    pub parent_id: &'a str,
    pub child_id: &'a str,
    pub title: &'a str,
    pub points: i32,
    pub recurrence: Option<&'a str>,
    pub category: Option<&'a str>,
    pub timing_mode: &'a str,
    pub status: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = task_instances)]
#[diesel(belongs_to(Task, foreign_key = task_id))]
pub struct TaskInstance {
    pub id: i32,
    pub task_id: i32,
    pub on_date: NaiveDate,
    pub status: String,
    pub photo_ref: Option<String>,
    pub completed_at: Option<NaiveDateTime>,
    pub approved_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = task_instances)]
pub struct NewTaskInstance<'a> {
    pub task_id: i32,
    pub on_date: NaiveDate,
    pub status: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = routines)]
pub struct Routine {
    pub id: i32,
    pub parent_id: String,
    pub child_id: String,
    pub title: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub recurrence: Option<String>,
    pub bonus_points: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = routines)]
pub struct NewRoutine<'a> {
    pub parent_id: &'a str,
    pub child_id: &'a str,
    pub title: &'a str,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub recurrence: Option<&'a str>,
    pub bonus_points: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = routine_tasks)]
pub struct RoutineTask {
    pub id: i32,
    pub parent_id: Option<String>,
    pub title: String,
    pub time_limit: Option<i32>,
    pub points: i32,
    pub category: Option<String>,
    pub status: String,
}

#[derive(Insertable)]
#[diesel(table_name = routine_tasks)]
pub struct NewRoutineTask<'a> {
    pub parent_id: Option<&'a str>,
    pub title: &'a str,
    pub time_limit: Option<i32>,
    pub points: i32,
    pub category: Option<&'a str>,
    pub status: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = routine_task_links)]
pub struct RoutineTaskLink {
    pub routine_id: i32,
    pub routine_task_id: i32,
    pub seq_order: i32,
    pub depends_on: Option<i32>,
}

#[derive(Insertable)]
#[diesel(table_name = routine_task_links)]
pub struct NewRoutineTaskLink {
    pub routine_id: i32,
    pub routine_task_id: i32,
    pub seq_order: i32,
    pub depends_on: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = routine_completions)]
pub struct RoutineCompletion {
    pub id: i32,
    pub routine_id: i32,
    pub child_id: String,
    pub on_date: NaiveDate,
    pub completed_at: NaiveDateTime,
    pub bonus_awarded: i32,
}

#[derive(Insertable)]
#[diesel(table_name = routine_completions)]
pub struct NewRoutineCompletion<'a> {
    pub routine_id: i32,
    pub child_id: &'a str,
    pub on_date: NaiveDate,
    pub completed_at: NaiveDateTime,
    pub bonus_awarded: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = rewards)]
pub struct Reward {
    pub id: i32,
    pub parent_id: String,
    pub title: String,
    pub description: Option<String>,
    pub point_cost: i32,
    pub status: String,
    pub redeemed_by: Option<String>,
    pub redeemed_at: Option<NaiveDateTime>,
    pub fulfilled_at: Option<NaiveDateTime>,
    pub fulfilled_by: Option<String>,
    pub denied_at: Option<NaiveDateTime>,
    pub denied_by: Option<String>,
    pub denial_note: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = rewards)]
pub struct NewReward<'a> {
    pub parent_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub point_cost: i32,
    pub status: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = goals)]
pub struct Goal {
    pub id: i32,
    pub parent_id: String,
    pub child_id: String,
    pub title: String,
    pub target_points: i32,
    pub goal_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub reward_id: Option<i32>,
    pub requires_approval: bool,
    pub requested_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub rejected_at: Option<NaiveDateTime>,
    pub rejection_comment: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = goals)]
pub struct NewGoal<'a> {
    pub parent_id: &'a str,
    pub child_id: &'a str,
    pub title: &'a str,
    pub target_points: i32,
    pub goal_type: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: &'a str,
    pub reward_id: Option<i32>,
    pub requires_approval: bool,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = goal_progress)]
pub struct GoalProgressRow {
    pub goal_id: i32,
    pub current_count: i32,
    pub current_streak: i32,
    pub last_progress_date: Option<NaiveDate>,
    pub next_needed: i32,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = goal_progress)]
pub struct NewGoalProgress {
    pub goal_id: i32,
    pub current_count: i32,
    pub current_streak: i32,
    pub last_progress_date: Option<NaiveDate>,
    pub next_needed: i32,
    pub updated_at: NaiveDateTime,
}
