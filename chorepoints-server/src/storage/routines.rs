//! Routine lifecycle: ordered bundles of routine-task templates with
//! dependency constraints and a time-of-day bonus window.
//!
//! A routine completes only when every linked routine-task is approved and
//! every declared dependency is approved too. The bonus is computed against
//! the family-local clock; a window whose end precedes its start crosses
//! midnight. A zero bonus still records the completion, and at most one
//! completion is recorded per routine per local day.

use std::collections::HashMap;

use chrono::{NaiveDateTime, NaiveTime};
use diesel::prelude::*;

use chorepoints_shared::domain::{DeltaReason, TaskStatus};

use crate::storage::models::{
    NewRoutine, NewRoutineCompletion, NewRoutineTask, NewRoutineTaskLink, Routine, RoutineTask,
    RoutineTaskLink,
};
use crate::storage::schema::{routine_completions, routine_task_links, routine_tasks, routines};
use crate::storage::{StorageError, Store, now_utc};

pub struct CreateRoutine {
    pub parent_id: String,
    pub child_id: String,
    pub title: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub recurrence: Option<String>,
    pub bonus_points: i32,
}

pub struct CreateRoutineTask {
    /// None = global default template shared across families.
    pub parent_id: Option<String>,
    pub title: String,
    pub time_limit: Option<i32>,
    pub points: i32,
    pub category: Option<String>,
}

/// Inclusive time-of-day window check; end before start wraps past midnight.
pub(crate) fn in_bonus_window(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if end < start {
        now >= start || now <= end
    } else {
        now >= start && now <= end
    }
}

pub(crate) fn complete_routine_tx(
    conn: &mut SqliteConnection,
    routine_id: i32,
    child: &str,
    now_local: NaiveDateTime,
) -> Result<Option<i32>, StorageError> {
    let routine: Option<Routine> = routines::table
        .filter(routines::id.eq(routine_id))
        .filter(routines::child_id.eq(child))
        .first::<Routine>(conn)
        .optional()?;
    let Some(routine) = routine else {
        return Ok(None);
    };

    let links: Vec<RoutineTaskLink> = routine_task_links::table
        .filter(routine_task_links::routine_id.eq(routine_id))
        .order(routine_task_links::seq_order.asc())
        .load::<RoutineTaskLink>(conn)?;
    if links.is_empty() {
        return Ok(None);
    }

    // Statuses of every template involved, linked or depended upon.
    let mut wanted: Vec<i32> = links.iter().map(|l| l.routine_task_id).collect();
    wanted.extend(links.iter().filter_map(|l| l.depends_on));
    let statuses: HashMap<i32, String> = routine_tasks::table
        .filter(routine_tasks::id.eq_any(&wanted))
        .select((routine_tasks::id, routine_tasks::status))
        .load::<(i32, String)>(conn)?
        .into_iter()
        .collect();

    let approved = |id: i32| {
        statuses
            .get(&id)
            .is_some_and(|s| s == TaskStatus::Approved.as_str())
    };
    for link in &links {
        if !approved(link.routine_task_id) {
            return Ok(None);
        }
        if let Some(dep) = link.depends_on
            && !approved(dep)
        {
            return Ok(None);
        }
    }

    let bonus = if in_bonus_window(now_local.time(), routine.start_time, routine.end_time) {
        routine.bonus_points
    } else {
        0
    };
    // One completion per routine per local day; a second attempt hits the
    // unique key and the whole thing is a no-op.
    let inserted = diesel::insert_into(routine_completions::table)
        .values(&NewRoutineCompletion {
            routine_id,
            child_id: child,
            on_date: now_local.date(),
            completed_at: now_utc(),
            bonus_awarded: bonus,
        })
        .on_conflict((
            routine_completions::routine_id,
            routine_completions::on_date,
        ))
        .do_nothing()
        .execute(conn)?;
    if inserted == 0 {
        return Ok(None);
    }
    if bonus > 0 {
        super::ledger::apply_delta_tx(
            conn,
            child,
            bonus,
            DeltaReason::RoutineBonus,
            Some(routine_id),
        )?;
    }
    Ok(Some(bonus))
}

impl Store {
    pub async fn create_routine(&self, req: CreateRoutine) -> Result<i32, StorageError> {
        self.with_conn(move |conn| {
            let id = diesel::insert_into(routines::table)
                .values(&NewRoutine {
                    parent_id: &req.parent_id,
                    child_id: &req.child_id,
                    title: &req.title,
                    start_time: req.start_time,
                    end_time: req.end_time,
                    recurrence: req.recurrence.as_deref(),
                    bonus_points: req.bonus_points,
                })
                .returning(routines::id)
                .get_result::<i32>(conn)?;
            Ok(id)
        })
        .await
    }

    pub async fn create_routine_task(&self, req: CreateRoutineTask) -> Result<i32, StorageError> {
        self.with_conn(move |conn| {
            let id = diesel::insert_into(routine_tasks::table)
                .values(&NewRoutineTask {
                    parent_id: req.parent_id.as_deref(),
                    title: &req.title,
                    time_limit: req.time_limit,
                    points: req.points,
                    category: req.category.as_deref(),
                    status: TaskStatus::Pending.as_str(),
                })
                .returning(routine_tasks::id)
                .get_result::<i32>(conn)?;
            Ok(id)
        })
        .await
    }

    pub async fn link_routine_task(
        &self,
        routine_id: i32,
        routine_task_id: i32,
        seq_order: i32,
        depends_on: Option<i32>,
    ) -> Result<(), StorageError> {
        self.with_conn(move |conn| {
            diesel::insert_into(routine_task_links::table)
                .values(&NewRoutineTaskLink {
                    routine_id,
                    routine_task_id,
                    seq_order,
                    depends_on,
                })
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    pub async fn get_routine(&self, routine_id: i32) -> Result<Option<Routine>, StorageError> {
        self.with_conn(move |conn| {
            Ok(routines::table
                .filter(routines::id.eq(routine_id))
                .first::<Routine>(conn)
                .optional()?)
        })
        .await
    }

    pub async fn list_routine_tasks(
        &self,
        routine_id: i32,
    ) -> Result<Vec<(RoutineTaskLink, RoutineTask)>, StorageError> {
        self.with_conn(move |conn| {
            Ok(routine_task_links::table
                .inner_join(
                    routine_tasks::table
                        .on(routine_tasks::id.eq(routine_task_links::routine_task_id)),
                )
                .filter(routine_task_links::routine_id.eq(routine_id))
                .order(routine_task_links::seq_order.asc())
                .load::<(RoutineTaskLink, RoutineTask)>(conn)?)
        })
        .await
    }

    /// Complete a routine as `child` at the given family-local wall clock.
    /// Returns the bonus awarded (possibly 0), or `None` when the routine is
    /// not the child's or a constituent task is still unapproved.
    pub async fn complete_routine(
        &self,
        routine_id: i32,
        child: &str,
        now_local: NaiveDateTime,
    ) -> Result<Option<i32>, StorageError> {
        let child = child.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| {
                complete_routine_tx(conn, routine_id, &child, now_local)
            })
        })
        .await
    }

    /// Rewrite sequence order for the given routine-task ids. Ids not linked
    /// to the routine are ignored rather than erroring.
    pub async fn reorder_routine_tasks(
        &self,
        routine_id: i32,
        ordering: HashMap<i32, i32>,
    ) -> Result<(), StorageError> {
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| {
                for (rt_id, seq) in &ordering {
                    diesel::update(
                        routine_task_links::table
                            .filter(routine_task_links::routine_id.eq(routine_id))
                            .filter(routine_task_links::routine_task_id.eq(*rt_id)),
                    )
                    .set(routine_task_links::seq_order.eq(*seq))
                    .execute(conn)?;
                }
                Ok(())
            })
        })
        .await
    }

    pub async fn complete_routine_task(&self, rt_id: i32) -> Result<bool, StorageError> {
        self.with_conn(move |conn| {
            let updated = diesel::update(
                routine_tasks::table
                    .filter(routine_tasks::id.eq(rt_id))
                    .filter(routine_tasks::status.eq(TaskStatus::Pending.as_str())),
            )
            .set(routine_tasks::status.eq(TaskStatus::Completed.as_str()))
            .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    pub async fn approve_routine_task(&self, rt_id: i32) -> Result<bool, StorageError> {
        self.with_conn(move |conn| {
            let updated = diesel::update(
                routine_tasks::table
                    .filter(routine_tasks::id.eq(rt_id))
                    .filter(routine_tasks::status.eq(TaskStatus::Completed.as_str())),
            )
            .set(routine_tasks::status.eq(TaskStatus::Approved.as_str()))
            .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    /// Return a routine's templates to pending for the next run-through.
    pub async fn reset_routine_tasks(&self, routine_id: i32) -> Result<usize, StorageError> {
        self.with_conn(move |conn| {
            let ids: Vec<i32> = routine_task_links::table
                .filter(routine_task_links::routine_id.eq(routine_id))
                .select(routine_task_links::routine_task_id)
                .load::<i32>(conn)?;
            let updated = diesel::update(routine_tasks::table.filter(routine_tasks::id.eq_any(ids)))
                .set(routine_tasks::status.eq(TaskStatus::Pending.as_str()))
                .execute(conn)?;
            Ok(updated)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn window_is_inclusive() {
        assert!(in_bonus_window(t(7, 0), t(7, 0), t(8, 0)));
        assert!(in_bonus_window(t(7, 30), t(7, 0), t(8, 0)));
        assert!(in_bonus_window(t(8, 0), t(7, 0), t(8, 0)));
        assert!(!in_bonus_window(t(9, 0), t(7, 0), t(8, 0)));
        assert!(!in_bonus_window(t(6, 59), t(7, 0), t(8, 0)));
    }

    #[test]
    fn window_crossing_midnight() {
        // 21:00 -> 06:30 spans two calendar days
        assert!(in_bonus_window(t(23, 0), t(21, 0), t(6, 30)));
        assert!(in_bonus_window(t(1, 0), t(21, 0), t(6, 30)));
        assert!(in_bonus_window(t(6, 30), t(21, 0), t(6, 30)));
        assert!(!in_bonus_window(t(12, 0), t(21, 0), t(6, 30)));
    }
}
