//! Reward lifecycle: available -> redeemed -> {fulfilled, denied}.
//!
//! Redemption re-reads the reward and the balance inside one immediate
//! transaction, so two racing redemptions serialize: the loser sees either
//! the flipped status or the reduced balance and fails its precondition.
//!
//! Refund contract: redemption is reserved-but-reversible. `deny` refunds
//! the point cost to the redeeming child in the same transaction; the reward
//! stays denied rather than silently returning to available.

use diesel::prelude::*;

use chorepoints_shared::domain::{DeltaReason, RewardStatus};

use crate::storage::models::{NewReward, Reward};
use crate::storage::schema::rewards;
use crate::storage::{StorageError, Store, now_utc};

pub struct CreateReward {
    pub parent_id: String,
    pub title: String,
    pub description: Option<String>,
    pub point_cost: i32,
}

pub(crate) fn redeem_tx(
    conn: &mut SqliteConnection,
    reward_id: i32,
    child: &str,
) -> Result<bool, StorageError> {
    // Fresh reads inside the transaction; no stale snapshot from before it
    let reward: Option<Reward> = rewards::table
        .filter(rewards::id.eq(reward_id))
        .first::<Reward>(conn)
        .optional()?;
    let Some(reward) = reward else {
        return Ok(false);
    };
    if reward.status != RewardStatus::Available.as_str() {
        return Ok(false);
    }
    let balance = super::ledger::balance_tx(conn, child)?;
    if balance < reward.point_cost {
        return Ok(false);
    }
    let updated = diesel::update(
        rewards::table
            .filter(rewards::id.eq(reward_id))
            .filter(rewards::status.eq(RewardStatus::Available.as_str())),
    )
    .set((
        rewards::status.eq(RewardStatus::Redeemed.as_str()),
        rewards::redeemed_by.eq(child),
        rewards::redeemed_at.eq(now_utc()),
    ))
    .execute(conn)?;
    if updated == 0 {
        return Ok(false);
    }
    super::ledger::apply_delta_tx(
        conn,
        child,
        -reward.point_cost,
        DeltaReason::RewardRedeem,
        Some(reward_id),
    )?;
    Ok(true)
}

pub(crate) fn fulfill_tx(
    conn: &mut SqliteConnection,
    reward_id: i32,
    parent: &str,
) -> Result<bool, StorageError> {
    let updated = diesel::update(
        rewards::table
            .filter(rewards::id.eq(reward_id))
            .filter(rewards::status.eq(RewardStatus::Redeemed.as_str())),
    )
    .set((
        rewards::status.eq(RewardStatus::Fulfilled.as_str()),
        rewards::fulfilled_by.eq(parent),
        rewards::fulfilled_at.eq(now_utc()),
    ))
    .execute(conn)?;
    Ok(updated > 0)
}

pub(crate) fn deny_tx(
    conn: &mut SqliteConnection,
    reward_id: i32,
    parent: &str,
    note: Option<&str>,
) -> Result<bool, StorageError> {
    let reward: Option<Reward> = rewards::table
        .filter(rewards::id.eq(reward_id))
        .first::<Reward>(conn)
        .optional()?;
    let Some(reward) = reward else {
        return Ok(false);
    };
    let updated = diesel::update(
        rewards::table
            .filter(rewards::id.eq(reward_id))
            .filter(rewards::status.eq(RewardStatus::Redeemed.as_str())),
    )
    .set((
        rewards::status.eq(RewardStatus::Denied.as_str()),
        rewards::denied_by.eq(parent),
        rewards::denied_at.eq(now_utc()),
        rewards::denial_note.eq(note),
    ))
    .execute(conn)?;
    if updated == 0 {
        return Ok(false);
    }
    // Refund to whoever redeemed; the column is set on every redemption
    if let Some(redeemer) = reward.redeemed_by.as_deref() {
        super::ledger::apply_delta_tx(
            conn,
            redeemer,
            reward.point_cost,
            DeltaReason::RewardRefund,
            Some(reward_id),
        )?;
    }
    Ok(true)
}

impl Store {
    pub async fn create_reward(&self, req: CreateReward) -> Result<i32, StorageError> {
        self.with_conn(move |conn| {
            let id = diesel::insert_into(rewards::table)
                .values(&NewReward {
                    parent_id: &req.parent_id,
                    title: &req.title,
                    description: req.description.as_deref(),
                    point_cost: req.point_cost,
                    status: RewardStatus::Available.as_str(),
                })
                .returning(rewards::id)
                .get_result::<i32>(conn)?;
            Ok(id)
        })
        .await
    }

    pub async fn get_reward(&self, reward_id: i32) -> Result<Option<Reward>, StorageError> {
        self.with_conn(move |conn| {
            Ok(rewards::table
                .filter(rewards::id.eq(reward_id))
                .first::<Reward>(conn)
                .optional()?)
        })
        .await
    }

    /// Spend points on a reward. `Ok(false)` when the reward is not
    /// available or the balance does not cover the cost; nothing is written
    /// in that case.
    pub async fn redeem_reward(&self, reward_id: i32, child: &str) -> Result<bool, StorageError> {
        let child = child.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| redeem_tx(conn, reward_id, &child))
        })
        .await
    }

    pub async fn fulfill_reward(&self, reward_id: i32, parent: &str) -> Result<bool, StorageError> {
        let parent = parent.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| fulfill_tx(conn, reward_id, &parent))
        })
        .await
    }

    pub async fn deny_reward(
        &self,
        reward_id: i32,
        parent: &str,
        note: Option<String>,
    ) -> Result<bool, StorageError> {
        let parent = parent.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| deny_tx(conn, reward_id, &parent, note.as_deref()))
        })
        .await
    }
}
