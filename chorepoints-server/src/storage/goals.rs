//! Goal lifecycle: active -> pending_approval -> completed, with rejected
//! reachable from pending_approval and reactivation returning rejected goals
//! to active. Completed is the only terminal state.
//!
//! Progress is derived from the ledger's earning history and never
//! hand-edited; `goal_progress` rows are upsert-only. The same
//! `compute_progress_tx` feeds both the live path (`evaluate_goal`) and the
//! batch reconciliation pass.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use chorepoints_shared::domain::{DeltaReason, GoalStatus, GoalType};

use crate::storage::models::{Goal, NewGoal, NewGoalProgress};
use crate::storage::schema::{goal_progress, goals};
use crate::storage::{StorageError, Store, now_utc, parse_enum};

pub struct CreateGoal {
    pub parent_id: String,
    pub child_id: String,
    pub title: String,
    pub target_points: i32,
    pub goal_type: GoalType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub requires_approval: bool,
    pub reward_id: Option<i32>,
}

/// Recomputed progress snapshot for one goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalProgress {
    pub current_count: i32,
    pub current_streak: i32,
    pub last_progress_date: Option<NaiveDate>,
    pub target_met: bool,
    pub next_needed: i32,
}

/// Longest run of consecutive calendar days ending at the most recent entry.
/// `dates` must be distinct; order does not matter.
pub(crate) fn streak_from_dates(dates: &[NaiveDate]) -> (i32, Option<NaiveDate>) {
    if dates.is_empty() {
        return (0, None);
    }
    let mut sorted = dates.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let last = *sorted.last().unwrap();
    let mut streak = 1;
    for pair in sorted.windows(2).rev() {
        if pair[1] - pair[0] == chrono::Duration::days(1) {
            streak += 1;
        } else {
            break;
        }
    }
    (streak, Some(last))
}

/// Half-open timestamp bounds covering a goal's date window. The end bound
/// is the midnight after end_date so sub-second deltas in the last second
/// of the last day still count.
pub(crate) fn progress_window(start: NaiveDate, end: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    (
        start.and_hms_opt(0, 0, 0).unwrap(),
        (end + chrono::Duration::days(1)).and_hms_opt(0, 0, 0).unwrap(),
    )
}

/// Derive progress from earning deltas inside the goal's date window,
/// ignoring the goal's stored status.
pub(crate) fn compute_progress_tx(
    conn: &mut SqliteConnection,
    goal: &Goal,
) -> Result<GoalProgress, StorageError> {
    use crate::storage::schema::point_deltas::dsl as pd;

    let (window_start, window_end) = progress_window(goal.start_date, goal.end_date);
    let earning = [
        DeltaReason::TaskApproval.as_str(),
        DeltaReason::RoutineBonus.as_str(),
        DeltaReason::GoalAward.as_str(),
    ];
    let rows: Vec<(i32, NaiveDateTime)> = pd::point_deltas
        .filter(pd::child_id.eq(&goal.child_id))
        .filter(pd::reason.eq_any(earning))
        .filter(pd::created_at.ge(window_start))
        .filter(pd::created_at.lt(window_end))
        .select((pd::delta, pd::created_at))
        .load::<(i32, NaiveDateTime)>(conn)?;

    let current_count: i32 = rows.iter().map(|(d, _)| d).sum();
    let dates: Vec<NaiveDate> = rows.iter().map(|(_, at)| at.date()).collect();
    let (current_streak, last_progress_date) = streak_from_dates(&dates);
    let target_met = current_count >= goal.target_points;
    let next_needed = (goal.target_points - current_count).max(0);
    Ok(GoalProgress {
        current_count,
        current_streak,
        last_progress_date,
        target_met,
        next_needed,
    })
}

pub(crate) fn upsert_progress_tx(
    conn: &mut SqliteConnection,
    goal_id: i32,
    progress: &GoalProgress,
) -> Result<(), StorageError> {
    let now = now_utc();
    diesel::insert_into(goal_progress::table)
        .values(&NewGoalProgress {
            goal_id,
            current_count: progress.current_count,
            current_streak: progress.current_streak,
            last_progress_date: progress.last_progress_date,
            next_needed: progress.next_needed,
            updated_at: now,
        })
        .on_conflict(goal_progress::goal_id)
        .do_update()
        .set((
            goal_progress::current_count.eq(progress.current_count),
            goal_progress::current_streak.eq(progress.current_streak),
            goal_progress::last_progress_date.eq(progress.last_progress_date),
            goal_progress::next_needed.eq(progress.next_needed),
            goal_progress::updated_at.eq(now),
        ))
        .execute(conn)?;
    Ok(())
}

pub(crate) fn request_completion_tx(
    conn: &mut SqliteConnection,
    goal_id: i32,
    child: &str,
) -> Result<bool, StorageError> {
    let updated = diesel::update(
        goals::table
            .filter(goals::id.eq(goal_id))
            .filter(goals::child_id.eq(child))
            .filter(goals::status.eq(GoalStatus::Active.as_str())),
    )
    .set((
        goals::status.eq(GoalStatus::PendingApproval.as_str()),
        goals::requested_at.eq(now_utc()),
    ))
    .execute(conn)?;
    Ok(updated > 0)
}

/// Owner-gated approval; status change and point award are atomic.
pub(crate) fn approve_goal_tx(
    conn: &mut SqliteConnection,
    goal_id: i32,
    parent: &str,
) -> Result<bool, StorageError> {
    let goal: Option<Goal> = goals::table
        .filter(goals::id.eq(goal_id))
        .first::<Goal>(conn)
        .optional()?;
    let Some(goal) = goal else {
        return Ok(false);
    };
    let updated = diesel::update(
        goals::table
            .filter(goals::id.eq(goal_id))
            .filter(goals::parent_id.eq(parent))
            .filter(goals::status.eq(GoalStatus::PendingApproval.as_str())),
    )
    .set((
        goals::status.eq(GoalStatus::Completed.as_str()),
        goals::completed_at.eq(now_utc()),
    ))
    .execute(conn)?;
    if updated == 0 {
        return Ok(false);
    }
    super::ledger::apply_delta_tx(
        conn,
        &goal.child_id,
        goal.target_points,
        DeltaReason::GoalAward,
        Some(goal_id),
    )?;
    Ok(true)
}

pub(crate) fn reject_goal_tx(
    conn: &mut SqliteConnection,
    goal_id: i32,
    parent: &str,
    comment: &str,
) -> Result<bool, StorageError> {
    let updated = diesel::update(
        goals::table
            .filter(goals::id.eq(goal_id))
            .filter(goals::parent_id.eq(parent))
            .filter(goals::status.eq(GoalStatus::PendingApproval.as_str())),
    )
    .set((
        goals::status.eq(GoalStatus::Rejected.as_str()),
        goals::rejected_at.eq(now_utc()),
        goals::rejection_comment.eq(comment),
    ))
    .execute(conn)?;
    Ok(updated > 0)
}

/// Rejected -> active. Reports whether a row actually changed so callers can
/// tell "reactivated" from "was not rejected".
pub(crate) fn reactivate_goal_tx(
    conn: &mut SqliteConnection,
    goal_id: i32,
    parent: &str,
) -> Result<bool, StorageError> {
    let updated = diesel::update(
        goals::table
            .filter(goals::id.eq(goal_id))
            .filter(goals::parent_id.eq(parent))
            .filter(goals::status.eq(GoalStatus::Rejected.as_str())),
    )
    .set((
        goals::status.eq(GoalStatus::Active.as_str()),
        goals::rejected_at.eq(None::<NaiveDateTime>),
        goals::rejection_comment.eq(None::<String>),
    ))
    .execute(conn)?;
    Ok(updated > 0)
}

/// One-step completion for goals without approval gating.
pub(crate) fn complete_goal_directly_tx(
    conn: &mut SqliteConnection,
    goal_id: i32,
    child: &str,
) -> Result<bool, StorageError> {
    let goal: Option<Goal> = goals::table
        .filter(goals::id.eq(goal_id))
        .first::<Goal>(conn)
        .optional()?;
    let Some(goal) = goal else {
        return Ok(false);
    };
    let updated = diesel::update(
        goals::table
            .filter(goals::id.eq(goal_id))
            .filter(goals::child_id.eq(child))
            .filter(goals::requires_approval.eq(false))
            .filter(goals::status.eq(GoalStatus::Active.as_str())),
    )
    .set((
        goals::status.eq(GoalStatus::Completed.as_str()),
        goals::completed_at.eq(now_utc()),
    ))
    .execute(conn)?;
    if updated == 0 {
        return Ok(false);
    }
    super::ledger::apply_delta_tx(
        conn,
        &goal.child_id,
        goal.target_points,
        DeltaReason::GoalAward,
        Some(goal_id),
    )?;
    Ok(true)
}

/// Live-path evaluation after a point award: refresh the progress row and,
/// for automatic goals whose target is now met, advance active goals to
/// pending_approval or straight to completed with the award. Manual goals
/// only get the progress refresh.
pub(crate) fn evaluate_goal_tx(
    conn: &mut SqliteConnection,
    goal_id: i32,
) -> Result<Option<GoalStatus>, StorageError> {
    let goal: Option<Goal> = goals::table
        .filter(goals::id.eq(goal_id))
        .first::<Goal>(conn)
        .optional()?;
    let Some(goal) = goal else {
        return Ok(None);
    };
    let progress = compute_progress_tx(conn, &goal)?;
    upsert_progress_tx(conn, goal_id, &progress)?;

    let goal_type: GoalType = parse_enum(&goal.goal_type)?;
    let status: GoalStatus = parse_enum(&goal.status)?;
    if goal_type != GoalType::Automatic || status != GoalStatus::Active || !progress.target_met {
        return Ok(None);
    }

    if goal.requires_approval {
        let updated = diesel::update(
            goals::table
                .filter(goals::id.eq(goal_id))
                .filter(goals::status.eq(GoalStatus::Active.as_str())),
        )
        .set((
            goals::status.eq(GoalStatus::PendingApproval.as_str()),
            goals::requested_at.eq(now_utc()),
        ))
        .execute(conn)?;
        Ok((updated > 0).then_some(GoalStatus::PendingApproval))
    } else {
        let updated = diesel::update(
            goals::table
                .filter(goals::id.eq(goal_id))
                .filter(goals::status.eq(GoalStatus::Active.as_str())),
        )
        .set((
            goals::status.eq(GoalStatus::Completed.as_str()),
            goals::completed_at.eq(now_utc()),
        ))
        .execute(conn)?;
        if updated == 0 {
            return Ok(None);
        }
        super::ledger::apply_delta_tx(
            conn,
            &goal.child_id,
            goal.target_points,
            DeltaReason::GoalAward,
            Some(goal_id),
        )?;
        Ok(Some(GoalStatus::Completed))
    }
}

impl Store {
    pub async fn create_goal(&self, req: CreateGoal) -> Result<i32, StorageError> {
        self.with_conn(move |conn| {
            let id = diesel::insert_into(goals::table)
                .values(&NewGoal {
                    parent_id: &req.parent_id,
                    child_id: &req.child_id,
                    title: &req.title,
                    target_points: req.target_points,
                    goal_type: req.goal_type.as_str(),
                    start_date: req.start_date,
                    end_date: req.end_date,
                    status: GoalStatus::Active.as_str(),
                    reward_id: req.reward_id,
                    requires_approval: req.requires_approval,
                })
                .returning(goals::id)
                .get_result::<i32>(conn)?;
            Ok(id)
        })
        .await
    }

    pub async fn get_goal(&self, goal_id: i32) -> Result<Option<Goal>, StorageError> {
        self.with_conn(move |conn| {
            Ok(goals::table
                .filter(goals::id.eq(goal_id))
                .first::<Goal>(conn)
                .optional()?)
        })
        .await
    }

    pub async fn get_goal_progress(
        &self,
        goal_id: i32,
    ) -> Result<Option<crate::storage::models::GoalProgressRow>, StorageError> {
        self.with_conn(move |conn| {
            Ok(goal_progress::table
                .filter(goal_progress::goal_id.eq(goal_id))
                .first::<crate::storage::models::GoalProgressRow>(conn)
                .optional()?)
        })
        .await
    }

    pub async fn request_goal_completion(
        &self,
        goal_id: i32,
        child: &str,
    ) -> Result<bool, StorageError> {
        let child = child.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| request_completion_tx(conn, goal_id, &child))
        })
        .await
    }

    pub async fn approve_goal(&self, goal_id: i32, parent: &str) -> Result<bool, StorageError> {
        let parent = parent.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| approve_goal_tx(conn, goal_id, &parent))
        })
        .await
    }

    pub async fn reject_goal(
        &self,
        goal_id: i32,
        parent: &str,
        comment: &str,
    ) -> Result<bool, StorageError> {
        let parent = parent.to_string();
        let comment = comment.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| reject_goal_tx(conn, goal_id, &parent, &comment))
        })
        .await
    }

    pub async fn reactivate_goal(&self, goal_id: i32, parent: &str) -> Result<bool, StorageError> {
        let parent = parent.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| reactivate_goal_tx(conn, goal_id, &parent))
        })
        .await
    }

    pub async fn complete_goal_directly(
        &self,
        goal_id: i32,
        child: &str,
    ) -> Result<bool, StorageError> {
        let child = child.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| complete_goal_directly_tx(conn, goal_id, &child))
        })
        .await
    }

    pub async fn evaluate_goal(&self, goal_id: i32) -> Result<Option<GoalStatus>, StorageError> {
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| evaluate_goal_tx(conn, goal_id))
        })
        .await
    }

    /// Re-evaluate every active automatic goal of a child. Invoked by the
    /// API layer after point-earning transitions.
    pub async fn evaluate_goals_for_child(
        &self,
        child: &str,
    ) -> Result<Vec<(i32, GoalStatus)>, StorageError> {
        let child = child.to_string();
        self.with_conn(move |conn| {
            let ids: Vec<i32> = goals::table
                .filter(goals::child_id.eq(&child))
                .filter(goals::goal_type.eq(GoalType::Automatic.as_str()))
                .filter(goals::status.eq(GoalStatus::Active.as_str()))
                .select(goals::id)
                .load::<i32>(conn)?;
            let mut changed = Vec::new();
            for id in ids {
                if let Some(status) =
                    conn.immediate_transaction(|conn| evaluate_goal_tx(conn, id))?
                {
                    changed.push((id, status));
                }
            }
            Ok(changed)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn streak_of_nothing() {
        assert_eq!(streak_from_dates(&[]), (0, None));
    }

    #[test]
    fn streak_counts_consecutive_days_ending_at_last() {
        let dates = [d("2026-03-01"), d("2026-03-03"), d("2026-03-04")];
        assert_eq!(streak_from_dates(&dates), (2, Some(d("2026-03-04"))));
    }

    #[test]
    fn streak_ignores_duplicate_days() {
        let dates = [d("2026-03-04"), d("2026-03-04"), d("2026-03-03")];
        assert_eq!(streak_from_dates(&dates), (2, Some(d("2026-03-04"))));
    }

    #[test]
    fn gap_resets_streak() {
        let dates = [d("2026-03-01"), d("2026-03-02"), d("2026-03-05")];
        assert_eq!(streak_from_dates(&dates), (1, Some(d("2026-03-05"))));
    }

    #[test]
    fn window_covers_the_whole_last_day() {
        use chrono::Timelike;

        let (start, end) = progress_window(d("2026-03-01"), d("2026-03-07"));
        assert_eq!(start, d("2026-03-01").and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(end, d("2026-03-08").and_hms_opt(0, 0, 0).unwrap());

        // A sub-second delta in the last second of the last day is inside
        let late = d("2026-03-07")
            .and_hms_opt(23, 59, 59)
            .unwrap()
            .with_nanosecond(500_000_000)
            .unwrap();
        assert!(late >= start && late < end);
        // Midnight of the next day is the first excluded instant
        let next_day = d("2026-03-08").and_hms_opt(0, 0, 0).unwrap();
        assert!(!(next_day < end));
    }
}
