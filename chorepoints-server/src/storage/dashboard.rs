//! Read-path aggregations for the parent and child dashboard views. No
//! mutations here; everything is derived from lifecycle state and the
//! ledger's earning history.

use diesel::prelude::*;

use chorepoints_shared::domain::{GoalStatus, RewardStatus};

use crate::storage::models::{Child, Goal, Reward};
use crate::storage::schema::{children, goals, rewards};
use crate::storage::{StorageError, Store, ledger};

/// Fixed threshold the child progress bar is measured against.
pub const PROGRESS_THRESHOLD: i32 = 100;

pub struct ParentDashboard {
    pub children: Vec<ChildSummary>,
    pub active_rewards: Vec<Reward>,
    pub redeemed_rewards: Vec<Reward>,
    pub pending_goal_approvals: Vec<Goal>,
}

pub struct ChildSummary {
    pub child: Child,
    pub total_points_earned: i32,
    pub goals_met: i32,
}

pub struct ChildDashboard {
    pub remaining_points: i32,
    pub points_progress_pct: i32,
    pub available_rewards: Vec<Reward>,
    pub active_goals: Vec<Goal>,
    pub completed_goals: Vec<Goal>,
    pub redeemed_rewards: Vec<Reward>,
}

pub(crate) fn progress_pct(balance: i32) -> i32 {
    (balance * 100 / PROGRESS_THRESHOLD).clamp(0, 100)
}

impl Store {
    pub async fn parent_dashboard(&self, parent: &str) -> Result<ParentDashboard, StorageError> {
        let parent = parent.to_string();
        self.with_conn(move |conn| {
            let kids: Vec<Child> = children::table
                .order(children::display_name.asc())
                .load::<Child>(conn)?;
            let mut summaries = Vec::with_capacity(kids.len());
            for child in kids {
                let total_points_earned = ledger::total_earned_tx(conn, &child.id)?;
                let goals_met: i64 = goals::table
                    .filter(goals::child_id.eq(&child.id))
                    .filter(goals::status.eq(GoalStatus::Completed.as_str()))
                    .count()
                    .get_result(conn)?;
                summaries.push(ChildSummary {
                    child,
                    total_points_earned,
                    goals_met: goals_met as i32,
                });
            }

            let active_rewards: Vec<Reward> = rewards::table
                .filter(rewards::parent_id.eq(&parent))
                .filter(rewards::status.eq(RewardStatus::Available.as_str()))
                .order(rewards::created_at.desc())
                .load::<Reward>(conn)?;
            let redeemed_rewards: Vec<Reward> = rewards::table
                .filter(rewards::parent_id.eq(&parent))
                .filter(rewards::status.eq(RewardStatus::Redeemed.as_str()))
                .order(rewards::redeemed_at.desc())
                .load::<Reward>(conn)?;
            let pending_goal_approvals: Vec<Goal> = goals::table
                .filter(goals::parent_id.eq(&parent))
                .filter(goals::status.eq(GoalStatus::PendingApproval.as_str()))
                .order(goals::requested_at.asc())
                .load::<Goal>(conn)?;

            Ok(ParentDashboard {
                children: summaries,
                active_rewards,
                redeemed_rewards,
                pending_goal_approvals,
            })
        })
        .await
    }

    pub async fn child_dashboard(&self, child: &str) -> Result<ChildDashboard, StorageError> {
        let child = child.to_string();
        self.with_conn(move |conn| {
            let remaining_points = ledger::balance_tx(conn, &child)?;
            let available_rewards: Vec<Reward> = rewards::table
                .filter(rewards::status.eq(RewardStatus::Available.as_str()))
                .order(rewards::point_cost.asc())
                .load::<Reward>(conn)?;
            let redeemed_rewards: Vec<Reward> = rewards::table
                .filter(rewards::redeemed_by.eq(&child))
                .filter(rewards::status.eq(RewardStatus::Redeemed.as_str()))
                .order(rewards::redeemed_at.desc())
                .load::<Reward>(conn)?;
            let active_goals: Vec<Goal> = goals::table
                .filter(goals::child_id.eq(&child))
                .filter(goals::status.eq(GoalStatus::Active.as_str()))
                .order(goals::end_date.asc())
                .load::<Goal>(conn)?;
            let completed_goals: Vec<Goal> = goals::table
                .filter(goals::child_id.eq(&child))
                .filter(goals::status.eq(GoalStatus::Completed.as_str()))
                .order(goals::completed_at.desc())
                .load::<Goal>(conn)?;

            Ok(ChildDashboard {
                points_progress_pct: progress_pct(remaining_points),
                remaining_points,
                available_rewards,
                active_goals,
                completed_goals,
                redeemed_rewards,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_caps_at_threshold() {
        assert_eq!(progress_pct(0), 0);
        assert_eq!(progress_pct(42), 42);
        assert_eq!(progress_pct(100), 100);
        assert_eq!(progress_pct(250), 100);
        assert_eq!(progress_pct(-5), 0);
    }
}
