//! Task lifecycle: pending -> completed -> approved, with rejected reachable
//! from completed. Recurring tasks materialize one `task_instances` row per
//! calendar date so each day runs an independent lifecycle.
//!
//! Every transition is a conditional update filtered on the current status;
//! zero matched rows means a concurrent transition (or wrong owner) already
//! won, and the operation reports `Ok(false)` instead of erroring.

use chrono::NaiveDate;
use diesel::prelude::*;

use chorepoints_shared::domain::{DeltaReason, TaskStatus};

use crate::storage::models::{NewTask, NewTaskInstance, Task, TaskInstance};
use crate::storage::schema::{task_instances, tasks};
use crate::storage::{StorageError, Store, now_utc};

pub struct CreateTask {
    pub parent_id: String,
    pub child_id: String,
    pub title: String,
    pub points: i32,
    pub recurrence: Option<String>,
    pub category: Option<String>,
    pub timing_mode: Option<String>,
}

pub(crate) fn complete_task_tx(
    conn: &mut SqliteConnection,
    task_id: i32,
    child: &str,
    photo: Option<&str>,
) -> Result<bool, StorageError> {
    let updated = diesel::update(
        tasks::table
            .filter(tasks::id.eq(task_id))
            .filter(tasks::child_id.eq(child))
            .filter(tasks::status.eq(TaskStatus::Pending.as_str())),
    )
    .set((
        tasks::status.eq(TaskStatus::Completed.as_str()),
        tasks::photo_ref.eq(photo),
        tasks::completed_at.eq(now_utc()),
    ))
    .execute(conn)?;
    Ok(updated > 0)
}

/// Approval and point award are one transaction: a task is never approved
/// without its matching grant, nor granted without the recorded approval.
pub(crate) fn approve_task_tx(
    conn: &mut SqliteConnection,
    task_id: i32,
) -> Result<bool, StorageError> {
    let task: Option<Task> = tasks::table
        .filter(tasks::id.eq(task_id))
        .first::<Task>(conn)
        .optional()?;
    let Some(task) = task else {
        return Ok(false);
    };
    let updated = diesel::update(
        tasks::table
            .filter(tasks::id.eq(task_id))
            .filter(tasks::status.eq(TaskStatus::Completed.as_str())),
    )
    .set((
        tasks::status.eq(TaskStatus::Approved.as_str()),
        tasks::approved_at.eq(now_utc()),
    ))
    .execute(conn)?;
    if updated == 0 {
        return Ok(false);
    }
    super::ledger::apply_delta_tx(
        conn,
        &task.child_id,
        task.points,
        DeltaReason::TaskApproval,
        Some(task_id),
    )?;
    Ok(true)
}

pub(crate) fn reject_task_tx(
    conn: &mut SqliteConnection,
    task_id: i32,
) -> Result<bool, StorageError> {
    let updated = diesel::update(
        tasks::table
            .filter(tasks::id.eq(task_id))
            .filter(tasks::status.eq(TaskStatus::Completed.as_str())),
    )
    .set(tasks::status.eq(TaskStatus::Rejected.as_str()))
    .execute(conn)?;
    Ok(updated > 0)
}

/// Get-or-create the per-date instance of a recurring task. The instance
/// starts pending and carries its own status/photo/timestamps.
pub(crate) fn resolve_instance_tx(
    conn: &mut SqliteConnection,
    task_id: i32,
    date: NaiveDate,
) -> Result<TaskInstance, StorageError> {
    let existing: Option<TaskInstance> = task_instances::table
        .filter(task_instances::task_id.eq(task_id))
        .filter(task_instances::on_date.eq(date))
        .first::<TaskInstance>(conn)
        .optional()?;
    if let Some(inst) = existing {
        return Ok(inst);
    }
    diesel::insert_into(task_instances::table)
        .values(&NewTaskInstance {
            task_id,
            on_date: date,
            status: TaskStatus::Pending.as_str(),
        })
        .on_conflict((task_instances::task_id, task_instances::on_date))
        .do_nothing()
        .execute(conn)?;
    Ok(task_instances::table
        .filter(task_instances::task_id.eq(task_id))
        .filter(task_instances::on_date.eq(date))
        .first::<TaskInstance>(conn)?)
}

pub(crate) fn complete_instance_tx(
    conn: &mut SqliteConnection,
    task_id: i32,
    date: NaiveDate,
    child: &str,
    photo: Option<&str>,
) -> Result<bool, StorageError> {
    // Owner check against the recurring definition
    let owned: i64 = tasks::table
        .filter(tasks::id.eq(task_id))
        .filter(tasks::child_id.eq(child))
        .count()
        .get_result(conn)?;
    if owned == 0 {
        return Ok(false);
    }
    let inst = resolve_instance_tx(conn, task_id, date)?;
    let updated = diesel::update(
        task_instances::table
            .filter(task_instances::id.eq(inst.id))
            .filter(task_instances::status.eq(TaskStatus::Pending.as_str())),
    )
    .set((
        task_instances::status.eq(TaskStatus::Completed.as_str()),
        task_instances::photo_ref.eq(photo),
        task_instances::completed_at.eq(now_utc()),
    ))
    .execute(conn)?;
    Ok(updated > 0)
}

pub(crate) fn approve_instance_tx(
    conn: &mut SqliteConnection,
    task_id: i32,
    date: NaiveDate,
) -> Result<bool, StorageError> {
    let task: Option<Task> = tasks::table
        .filter(tasks::id.eq(task_id))
        .first::<Task>(conn)
        .optional()?;
    let Some(task) = task else {
        return Ok(false);
    };
    let inst = resolve_instance_tx(conn, task_id, date)?;
    let updated = diesel::update(
        task_instances::table
            .filter(task_instances::id.eq(inst.id))
            .filter(task_instances::status.eq(TaskStatus::Completed.as_str())),
    )
    .set((
        task_instances::status.eq(TaskStatus::Approved.as_str()),
        task_instances::approved_at.eq(now_utc()),
    ))
    .execute(conn)?;
    if updated == 0 {
        return Ok(false);
    }
    super::ledger::apply_delta_tx(
        conn,
        &task.child_id,
        task.points,
        DeltaReason::TaskApproval,
        Some(inst.id),
    )?;
    Ok(true)
}

pub(crate) fn reject_instance_tx(
    conn: &mut SqliteConnection,
    task_id: i32,
    date: NaiveDate,
) -> Result<bool, StorageError> {
    let inst = resolve_instance_tx(conn, task_id, date)?;
    let updated = diesel::update(
        task_instances::table
            .filter(task_instances::id.eq(inst.id))
            .filter(task_instances::status.eq(TaskStatus::Completed.as_str())),
    )
    .set(task_instances::status.eq(TaskStatus::Rejected.as_str()))
    .execute(conn)?;
    Ok(updated > 0)
}

impl Store {
    pub async fn create_task(&self, req: CreateTask) -> Result<i32, StorageError> {
        self.with_conn(move |conn| {
            let id = diesel::insert_into(tasks::table)
                .values(&NewTask {
                    parent_id: &req.parent_id,
                    child_id: &req.child_id,
                    title: &req.title,
                    points: req.points,
                    recurrence: req.recurrence.as_deref(),
                    category: req.category.as_deref(),
                    timing_mode: req.timing_mode.as_deref().unwrap_or("anytime"),
                    status: TaskStatus::Pending.as_str(),
                })
                .returning(tasks::id)
                .get_result::<i32>(conn)?;
            Ok(id)
        })
        .await
    }

    pub async fn get_task(&self, task_id: i32) -> Result<Option<Task>, StorageError> {
        self.with_conn(move |conn| {
            Ok(tasks::table
                .filter(tasks::id.eq(task_id))
                .first::<Task>(conn)
                .optional()?)
        })
        .await
    }

    pub async fn list_tasks_for_child(&self, child: &str) -> Result<Vec<Task>, StorageError> {
        let child = child.to_string();
        self.with_conn(move |conn| {
            Ok(tasks::table
                .filter(tasks::child_id.eq(&child))
                .order(tasks::created_at.asc())
                .load::<Task>(conn)?)
        })
        .await
    }

    /// Child marks a one-off task done. `Ok(false)` when the task is not
    /// pending or belongs to another child.
    pub async fn complete_task(
        &self,
        task_id: i32,
        child: &str,
        photo: Option<String>,
    ) -> Result<bool, StorageError> {
        let child = child.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| {
                complete_task_tx(conn, task_id, &child, photo.as_deref())
            })
        })
        .await
    }

    pub async fn approve_task(&self, task_id: i32) -> Result<bool, StorageError> {
        self.with_conn(move |conn| conn.immediate_transaction(|conn| approve_task_tx(conn, task_id)))
            .await
    }

    pub async fn reject_task(&self, task_id: i32) -> Result<bool, StorageError> {
        self.with_conn(move |conn| conn.immediate_transaction(|conn| reject_task_tx(conn, task_id)))
            .await
    }

    pub async fn complete_task_instance(
        &self,
        task_id: i32,
        date: NaiveDate,
        child: &str,
        photo: Option<String>,
    ) -> Result<bool, StorageError> {
        let child = child.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| {
                complete_instance_tx(conn, task_id, date, &child, photo.as_deref())
            })
        })
        .await
    }

    pub async fn approve_task_instance(
        &self,
        task_id: i32,
        date: NaiveDate,
    ) -> Result<bool, StorageError> {
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| approve_instance_tx(conn, task_id, date))
        })
        .await
    }

    pub async fn reject_task_instance(
        &self,
        task_id: i32,
        date: NaiveDate,
    ) -> Result<bool, StorageError> {
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| reject_instance_tx(conn, task_id, date))
        })
        .await
    }
}
