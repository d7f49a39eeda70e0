//! The points ledger. One authoritative balance row per child, mutated only
//! by signed deltas; every delta leaves an audit row in `point_deltas`.
//!
//! The conn-level functions run inside whatever transaction the caller has
//! open, so a delta rolls back together with the lifecycle change that
//! caused it. Non-negativity is not enforced here; callers check their
//! precondition inside the same transaction (see `rewards::redeem_tx`).

use diesel::prelude::*;

use chorepoints_shared::domain::DeltaReason;

use crate::storage::models::{NewBalance, NewPointDelta};
use crate::storage::schema::{balances, point_deltas};
use crate::storage::{StorageError, Store, now_utc};

/// Apply a signed delta to a child's balance. Creates the balance row lazily
/// on first use.
pub(crate) fn apply_delta_tx(
    conn: &mut SqliteConnection,
    child_id: &str,
    delta: i32,
    reason: DeltaReason,
    source_id: Option<i32>,
) -> Result<(), StorageError> {
    diesel::insert_into(balances::table)
        .values(&NewBalance {
            child_id,
            total_points: delta,
        })
        .on_conflict(balances::child_id)
        .do_update()
        .set(balances::total_points.eq(balances::total_points + delta))
        .execute(conn)?;

    diesel::insert_into(point_deltas::table)
        .values(&NewPointDelta {
            child_id,
            delta,
            reason: reason.as_str(),
            source_id,
            created_at: now_utc(),
        })
        .execute(conn)?;
    Ok(())
}

/// Current total, or 0 when no balance row exists yet. Absence is not an
/// error.
pub(crate) fn balance_tx(conn: &mut SqliteConnection, child: &str) -> Result<i32, StorageError> {
    use crate::storage::schema::balances::dsl::*;
    let row: Option<i32> = balances
        .filter(child_id.eq(child))
        .select(total_points)
        .first::<i32>(conn)
        .optional()?;
    Ok(row.unwrap_or(0))
}

/// Lifetime points earned: positive deltas with earning reasons. Spending
/// and refunds are excluded.
pub(crate) fn total_earned_tx(
    conn: &mut SqliteConnection,
    child: &str,
) -> Result<i32, StorageError> {
    use diesel::dsl::sum;

    use crate::storage::schema::point_deltas::dsl as pd;
    let earning = [
        DeltaReason::TaskApproval.as_str(),
        DeltaReason::RoutineBonus.as_str(),
        DeltaReason::GoalAward.as_str(),
    ];
    let total: Option<i64> = pd::point_deltas
        .filter(pd::child_id.eq(child))
        .filter(pd::reason.eq_any(earning))
        .select(sum(pd::delta))
        .first::<Option<i64>>(conn)?;
    Ok(total.unwrap_or(0) as i32)
}

impl Store {
    pub async fn get_balance(&self, child: &str) -> Result<i32, StorageError> {
        let child = child.to_string();
        self.with_conn(move |conn| balance_tx(conn, &child)).await
    }

    pub async fn total_earned(&self, child: &str) -> Result<i32, StorageError> {
        let child = child.to_string();
        self.with_conn(move |conn| total_earned_tx(conn, &child))
            .await
    }

    /// Apply a standalone delta in its own transaction. Lifecycle operations
    /// call `apply_delta_tx` inside their own transaction instead.
    pub async fn apply_delta(
        &self,
        child: &str,
        delta: i32,
        reason: DeltaReason,
        source_id: Option<i32>,
    ) -> Result<(), StorageError> {
        let child = child.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| apply_delta_tx(conn, &child, delta, reason, source_id))
        })
        .await
    }
}
