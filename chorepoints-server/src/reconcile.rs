//! Batch reconciliation: re-derive each goal's progress from the ledger's
//! earning history and correct any goal whose stored status has drifted from
//! what that progress implies.
//!
//! The engine never touches balances. Points already disbursed through live
//! lifecycle operations are sunk cost; only status, timestamps and the
//! rejection comment are rewritten. Status writes go through the same
//! conditional-update discipline as the live path (WHERE status = the status
//! we read), so a concurrent live transition wins and the goal simply counts
//! as unchanged.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use chorepoints_shared::domain::{GoalStatus, GoalType};

use crate::storage::goals::{compute_progress_tx, upsert_progress_tx};
use crate::storage::models::Goal;
use crate::storage::schema::goals;
use crate::storage::{StorageError, Store, now_utc, parse_enum};

/// Rejection comments beginning with this marker are system-generated and
/// may be overridden on rebuild; anything else is a deliberate parent
/// decision and is left untouched.
pub const INCOMPLETE_MARKER: &str = "Incomplete";

pub const DEFAULT_INCOMPLETE_COMMENT: &str = "Incomplete: end date reached";

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Compute and report without writing anything.
    pub dry_run: bool,
    /// Restrict the pass to a single goal.
    pub goal_id: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub scanned: u32,
    pub progress_updated: u32,
    pub status_changed: u32,
    pub status_unchanged: u32,
    pub manual_skipped: u32,
    pub parent_rejected_skipped: u32,
    pub errors: u32,
}

impl ReconcileSummary {
    /// Fold another summary's tallies into this one.
    fn merge(&mut self, other: &ReconcileSummary) {
        self.scanned += other.scanned;
        self.progress_updated += other.progress_updated;
        self.status_changed += other.status_changed;
        self.status_unchanged += other.status_unchanged;
        self.manual_skipped += other.manual_skipped;
        self.parent_rejected_skipped += other.parent_rejected_skipped;
        self.errors += other.errors;
    }
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "goals scanned:           {}", self.scanned)?;
        writeln!(f, "progress rows updated:   {}", self.progress_updated)?;
        writeln!(f, "statuses changed:        {}", self.status_changed)?;
        writeln!(f, "statuses unchanged:      {}", self.status_unchanged)?;
        writeln!(f, "manual goals skipped:    {}", self.manual_skipped)?;
        writeln!(f, "parent rejections kept:  {}", self.parent_rejected_skipped)?;
        write!(f, "errors:                  {}", self.errors)
    }
}

/// An absent comment on a rejected goal is treated as system-generated too;
/// a parent rejection always carries the parent's comment.
pub(crate) fn is_auto_rejection(comment: Option<&str>) -> bool {
    match comment {
        None => true,
        Some(c) => c.starts_with(INCOMPLETE_MARKER),
    }
}

pub(crate) fn desired_status(
    target_met: bool,
    requires_approval: bool,
    end_date_passed: bool,
) -> GoalStatus {
    if target_met {
        if requires_approval {
            GoalStatus::PendingApproval
        } else {
            GoalStatus::Completed
        }
    } else if end_date_passed {
        GoalStatus::Rejected
    } else {
        GoalStatus::Active
    }
}

/// Rewrite status plus the consistent timestamp/comment set for the desired
/// status. Returns false when the stored status moved under us.
fn write_status_tx(
    conn: &mut SqliteConnection,
    goal: &Goal,
    desired: GoalStatus,
) -> Result<bool, StorageError> {
    let guard = goals::table
        .filter(goals::id.eq(goal.id))
        .filter(goals::status.eq(goal.status.clone()));
    let now = now_utc();
    let updated = match desired {
        GoalStatus::Active => {
            let clear_rejection = is_auto_rejection(goal.rejection_comment.as_deref());
            if clear_rejection {
                diesel::update(guard)
                    .set((
                        goals::status.eq(GoalStatus::Active.as_str()),
                        goals::requested_at.eq(None::<NaiveDateTime>),
                        goals::completed_at.eq(None::<NaiveDateTime>),
                        goals::rejected_at.eq(None::<NaiveDateTime>),
                        goals::rejection_comment.eq(None::<String>),
                    ))
                    .execute(conn)?
            } else {
                diesel::update(guard)
                    .set((
                        goals::status.eq(GoalStatus::Active.as_str()),
                        goals::requested_at.eq(None::<NaiveDateTime>),
                        goals::completed_at.eq(None::<NaiveDateTime>),
                    ))
                    .execute(conn)?
            }
        }
        GoalStatus::PendingApproval => diesel::update(guard)
            .set((
                goals::status.eq(GoalStatus::PendingApproval.as_str()),
                goals::requested_at.eq(goal.requested_at.unwrap_or(now)),
                goals::completed_at.eq(None::<NaiveDateTime>),
                goals::rejected_at.eq(None::<NaiveDateTime>),
                goals::rejection_comment.eq(None::<String>),
            ))
            .execute(conn)?,
        GoalStatus::Completed => diesel::update(guard)
            .set((
                goals::status.eq(GoalStatus::Completed.as_str()),
                goals::completed_at.eq(goal.completed_at.unwrap_or(now)),
                goals::requested_at.eq(None::<NaiveDateTime>),
                goals::rejected_at.eq(None::<NaiveDateTime>),
                goals::rejection_comment.eq(None::<String>),
            ))
            .execute(conn)?,
        GoalStatus::Rejected => {
            let comment = match goal.rejection_comment.as_deref() {
                Some(c) if !is_auto_rejection(Some(c)) => c.to_string(),
                _ => DEFAULT_INCOMPLETE_COMMENT.to_string(),
            };
            diesel::update(guard)
                .set((
                    goals::status.eq(GoalStatus::Rejected.as_str()),
                    goals::rejected_at.eq(goal.rejected_at.unwrap_or(now)),
                    goals::rejection_comment.eq(comment),
                    goals::completed_at.eq(None::<NaiveDateTime>),
                ))
                .execute(conn)?
        }
    };
    Ok(updated > 0)
}

fn reconcile_goal_tx(
    conn: &mut SqliteConnection,
    goal_id: i32,
    today: NaiveDate,
    dry_run: bool,
    summary: &mut ReconcileSummary,
) -> Result<(), StorageError> {
    let goal: Option<Goal> = goals::table
        .filter(goals::id.eq(goal_id))
        .first::<Goal>(conn)
        .optional()?;
    let Some(goal) = goal else {
        return Err(StorageError::InvalidInput(format!(
            "goal not found: {goal_id}"
        )));
    };
    summary.scanned += 1;

    // Progress is recomputed for every goal, manual included
    let progress = compute_progress_tx(conn, &goal)?;
    if !dry_run {
        upsert_progress_tx(conn, goal.id, &progress)?;
    }
    summary.progress_updated += 1;

    let goal_type: GoalType = parse_enum(&goal.goal_type)?;
    let stored: GoalStatus = parse_enum(&goal.status)?;

    if goal_type == GoalType::Manual {
        summary.manual_skipped += 1;
        return Ok(());
    }
    if stored == GoalStatus::Rejected && !is_auto_rejection(goal.rejection_comment.as_deref()) {
        summary.parent_rejected_skipped += 1;
        return Ok(());
    }

    let desired = desired_status(
        progress.target_met,
        goal.requires_approval,
        goal.end_date < today,
    );
    if desired == stored {
        summary.status_unchanged += 1;
        return Ok(());
    }

    if dry_run {
        tracing::info!(
            goal_id = goal.id,
            stored = %stored,
            desired = %desired,
            "dry-run: status drift detected"
        );
        summary.status_changed += 1;
        return Ok(());
    }

    if write_status_tx(conn, &goal, desired)? {
        tracing::info!(goal_id = goal.id, from = %stored, to = %desired, "status corrected");
        summary.status_changed += 1;
    } else {
        // A live transition got there first; its state is canonical now
        summary.status_unchanged += 1;
    }
    Ok(())
}

/// Run a reconciliation pass over all goals, or one when
/// `opts.goal_id` is set. Per-goal failures are counted in `errors` rather
/// than aborting the batch.
pub async fn reconcile(
    store: &Store,
    opts: ReconcileOptions,
    today: NaiveDate,
) -> Result<ReconcileSummary, StorageError> {
    store
        .with_conn(move |conn| {
            let ids: Vec<i32> = match opts.goal_id {
                Some(id) => vec![id],
                None => goals::table
                    .order(goals::id.asc())
                    .select(goals::id)
                    .load::<i32>(conn)?,
            };

            let mut summary = ReconcileSummary::default();
            for goal_id in ids {
                // Tally into a per-goal summary so a rolled-back transaction
                // leaves no stray counts behind.
                let mut per_goal = ReconcileSummary::default();
                let res = conn.immediate_transaction(|conn| {
                    reconcile_goal_tx(conn, goal_id, today, opts.dry_run, &mut per_goal)
                });
                match res {
                    Ok(()) => summary.merge(&per_goal),
                    Err(e) => {
                        tracing::warn!(goal_id, error = %e, "reconciliation failed for goal");
                        summary.errors += 1;
                    }
                }
            }
            Ok(summary)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_rejection_marker() {
        assert!(is_auto_rejection(None));
        assert!(is_auto_rejection(Some("Incomplete: end date reached")));
        assert!(is_auto_rejection(Some("Incomplete")));
        assert!(!is_auto_rejection(Some("You skipped your reading week")));
    }

    #[test]
    fn desired_status_table() {
        assert_eq!(
            desired_status(true, true, false),
            GoalStatus::PendingApproval
        );
        assert_eq!(desired_status(true, false, false), GoalStatus::Completed);
        // Met targets win even past the end date
        assert_eq!(desired_status(true, false, true), GoalStatus::Completed);
        assert_eq!(desired_status(false, true, true), GoalStatus::Rejected);
        assert_eq!(desired_status(false, true, false), GoalStatus::Active);
    }
}
