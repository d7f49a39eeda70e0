mod common;

use chorepoints_server::storage::goals::CreateGoal;
use chorepoints_server::storage::rewards::CreateReward;
use chorepoints_server::storage::routines::{CreateRoutine, CreateRoutineTask};
use chorepoints_server::storage::tasks::CreateTask;
use chorepoints_shared::domain::{DeltaReason, GoalStatus, GoalType, RewardStatus, TaskStatus};
use chrono::{Duration, NaiveTime, Utc};
use common::{CHILD, PARENT, test_store};

fn task_req(points: i32) -> CreateTask {
    CreateTask {
        parent_id: PARENT.to_string(),
        child_id: CHILD.to_string(),
        title: "Feed the cat".to_string(),
        points,
        recurrence: None,
        category: None,
        timing_mode: None,
    }
}

#[tokio::test]
async fn balance_is_sum_of_applied_deltas() {
    let (store, _dir) = test_store().await;
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 0);

    store
        .apply_delta(CHILD, 10, DeltaReason::TaskApproval, None)
        .await
        .unwrap();
    store
        .apply_delta(CHILD, 5, DeltaReason::RoutineBonus, None)
        .await
        .unwrap();
    store
        .apply_delta(CHILD, -7, DeltaReason::RewardRedeem, None)
        .await
        .unwrap();
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 8);

    // Other children are unaffected
    assert_eq!(store.get_balance("leo").await.unwrap(), 0);

    // Earned total excludes spending
    assert_eq!(store.total_earned(CHILD).await.unwrap(), 15);
}

#[tokio::test]
async fn task_approval_awards_points_once() {
    let (store, _dir) = test_store().await;
    let task_id = store.create_task(task_req(10)).await.unwrap();

    // Scenario A: complete then approve -> balance becomes 10
    assert!(store.complete_task(task_id, CHILD, None).await.unwrap());
    assert!(store.approve_task(task_id).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 10);

    // Second approval matches zero rows and must not award again
    assert!(!store.approve_task(task_id).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 10);

    let task = store.get_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Approved.as_str());
    assert!(task.approved_at.is_some());
}

#[tokio::test]
async fn completion_preconditions() {
    let (store, _dir) = test_store().await;
    let task_id = store.create_task(task_req(10)).await.unwrap();

    // Wrong child: conditional update matches nothing
    assert!(!store.complete_task(task_id, "leo", None).await.unwrap());
    // Approve before completion: not applicable
    assert!(!store.approve_task(task_id).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 0);

    assert!(
        store
            .complete_task(task_id, CHILD, Some("photo-1".to_string()))
            .await
            .unwrap()
    );
    // Completing twice is not applicable either
    assert!(!store.complete_task(task_id, CHILD, None).await.unwrap());
}

#[tokio::test]
async fn rejected_task_awards_nothing() {
    let (store, _dir) = test_store().await;
    let task_id = store.create_task(task_req(10)).await.unwrap();
    assert!(store.complete_task(task_id, CHILD, None).await.unwrap());
    assert!(store.reject_task(task_id).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 0);
    // Approval after rejection is not applicable
    assert!(!store.approve_task(task_id).await.unwrap());
}

#[tokio::test]
async fn recurring_task_instances_are_independent_per_date() {
    let (store, _dir) = test_store().await;
    let task_id = store
        .create_task(CreateTask {
            recurrence: Some("daily".to_string()),
            ..task_req(4)
        })
        .await
        .unwrap();

    let monday = "2026-03-02".parse().unwrap();
    let tuesday = "2026-03-03".parse().unwrap();

    assert!(
        store
            .complete_task_instance(task_id, monday, CHILD, None)
            .await
            .unwrap()
    );
    assert!(store.approve_task_instance(task_id, monday).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 4);

    // Monday's instance cannot award twice
    assert!(!store.approve_task_instance(task_id, monday).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 4);

    // Tuesday runs its own lifecycle
    assert!(
        !store.approve_task_instance(task_id, tuesday).await.unwrap(),
        "tuesday instance not completed yet"
    );
    assert!(
        store
            .complete_task_instance(task_id, tuesday, CHILD, None)
            .await
            .unwrap()
    );
    assert!(store.approve_task_instance(task_id, tuesday).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 8);
}

#[tokio::test]
async fn redemption_never_overdraws() {
    let (store, _dir) = test_store().await;
    let reward_id = store
        .create_reward(CreateReward {
            parent_id: PARENT.to_string(),
            title: "Cinema trip".to_string(),
            description: None,
            point_cost: 15,
        })
        .await
        .unwrap();
    store
        .apply_delta(CHILD, 10, DeltaReason::TaskApproval, None)
        .await
        .unwrap();

    // Scenario B: balance 10 < cost 15 -> nothing changes
    assert!(!store.redeem_reward(reward_id, CHILD).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 10);
    let reward = store.get_reward(reward_id).await.unwrap().unwrap();
    assert_eq!(reward.status, RewardStatus::Available.as_str());

    store
        .apply_delta(CHILD, 10, DeltaReason::TaskApproval, None)
        .await
        .unwrap();
    assert!(store.redeem_reward(reward_id, CHILD).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 5);

    // Already redeemed: second attempt observes the flipped status
    assert!(!store.redeem_reward(reward_id, CHILD).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 5);
}

#[tokio::test]
async fn denial_refunds_the_spend() {
    let (store, _dir) = test_store().await;
    let reward_id = store
        .create_reward(CreateReward {
            parent_id: PARENT.to_string(),
            title: "Ice cream".to_string(),
            description: None,
            point_cost: 8,
        })
        .await
        .unwrap();
    store
        .apply_delta(CHILD, 8, DeltaReason::TaskApproval, None)
        .await
        .unwrap();
    assert!(store.redeem_reward(reward_id, CHILD).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 0);

    assert!(
        store
            .deny_reward(reward_id, PARENT, Some("out of stock".to_string()))
            .await
            .unwrap()
    );
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 8);
    let reward = store.get_reward(reward_id).await.unwrap().unwrap();
    assert_eq!(reward.status, RewardStatus::Denied.as_str());
    assert_eq!(reward.denial_note.as_deref(), Some("out of stock"));

    // Denied is not redeemable again
    assert!(!store.redeem_reward(reward_id, CHILD).await.unwrap());
}

#[tokio::test]
async fn fulfillment_moves_no_points() {
    let (store, _dir) = test_store().await;
    let reward_id = store
        .create_reward(CreateReward {
            parent_id: PARENT.to_string(),
            title: "Board game night".to_string(),
            description: None,
            point_cost: 5,
        })
        .await
        .unwrap();
    store
        .apply_delta(CHILD, 5, DeltaReason::TaskApproval, None)
        .await
        .unwrap();
    assert!(store.redeem_reward(reward_id, CHILD).await.unwrap());
    assert!(store.fulfill_reward(reward_id, PARENT).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 0);
    // Cannot fulfill twice, nor deny after fulfillment
    assert!(!store.fulfill_reward(reward_id, PARENT).await.unwrap());
    assert!(!store.deny_reward(reward_id, PARENT, None).await.unwrap());
}

async fn routine_with_tasks(
    store: &chorepoints_server::storage::Store,
    bonus: i32,
    dependent: bool,
) -> (i32, i32, i32) {
    let routine_id = store
        .create_routine(CreateRoutine {
            parent_id: PARENT.to_string(),
            child_id: CHILD.to_string(),
            title: "Morning routine".to_string(),
            start_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            recurrence: None,
            bonus_points: bonus,
        })
        .await
        .unwrap();
    let rt1 = store
        .create_routine_task(CreateRoutineTask {
            parent_id: Some(PARENT.to_string()),
            title: "Brush teeth".to_string(),
            time_limit: Some(5),
            points: 1,
            category: None,
        })
        .await
        .unwrap();
    let rt2 = store
        .create_routine_task(CreateRoutineTask {
            parent_id: None,
            title: "Make bed".to_string(),
            time_limit: None,
            points: 1,
            category: None,
        })
        .await
        .unwrap();
    store.link_routine_task(routine_id, rt1, 1, None).await.unwrap();
    store
        .link_routine_task(routine_id, rt2, 2, dependent.then_some(rt1))
        .await
        .unwrap();
    (routine_id, rt1, rt2)
}

fn at(h: u32, m: u32) -> chrono::NaiveDateTime {
    Utc::now()
        .date_naive()
        .and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
}

#[tokio::test]
async fn routine_requires_all_tasks_approved() {
    let (store, _dir) = test_store().await;
    let (routine_id, rt1, rt2) = routine_with_tasks(&store, 5, false).await;

    // Nothing approved yet
    assert!(
        store
            .complete_routine(routine_id, CHILD, at(7, 30))
            .await
            .unwrap()
            .is_none()
    );

    assert!(store.complete_routine_task(rt1).await.unwrap());
    assert!(store.approve_routine_task(rt1).await.unwrap());
    // rt2 still pending
    assert!(
        store
            .complete_routine(routine_id, CHILD, at(7, 30))
            .await
            .unwrap()
            .is_none()
    );

    assert!(store.complete_routine_task(rt2).await.unwrap());
    // Completed but not approved is not enough
    assert!(
        store
            .complete_routine(routine_id, CHILD, at(7, 30))
            .await
            .unwrap()
            .is_none()
    );
    assert!(store.approve_routine_task(rt2).await.unwrap());

    // Wrong child still fails
    assert!(
        store
            .complete_routine(routine_id, "leo", at(7, 30))
            .await
            .unwrap()
            .is_none()
    );

    // Inside the window the bonus lands on the ledger
    assert_eq!(
        store
            .complete_routine(routine_id, CHILD, at(7, 30))
            .await
            .unwrap(),
        Some(5)
    );
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 5);
}

#[tokio::test]
async fn routine_bonus_awarded_once_per_day() {
    let (store, _dir) = test_store().await;
    let (routine_id, rt1, rt2) = routine_with_tasks(&store, 5, false).await;
    for rt in [rt1, rt2] {
        assert!(store.complete_routine_task(rt).await.unwrap());
        assert!(store.approve_routine_task(rt).await.unwrap());
    }

    assert_eq!(
        store
            .complete_routine(routine_id, CHILD, at(7, 30))
            .await
            .unwrap(),
        Some(5)
    );
    // A minute later the day's completion already exists; no second bonus
    assert_eq!(
        store
            .complete_routine(routine_id, CHILD, at(7, 31))
            .await
            .unwrap(),
        None
    );
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 5);
}

#[tokio::test]
async fn late_routine_completion_records_zero_bonus() {
    let (store, _dir) = test_store().await;
    let (routine_id, rt1, rt2) = routine_with_tasks(&store, 5, false).await;
    for rt in [rt1, rt2] {
        assert!(store.complete_routine_task(rt).await.unwrap());
        assert!(store.approve_routine_task(rt).await.unwrap());
    }

    // Outside the window the completion is recorded with zero bonus
    assert_eq!(
        store
            .complete_routine(routine_id, CHILD, at(9, 0))
            .await
            .unwrap(),
        Some(0)
    );
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 0);

    // The day is spent even when the bonus was zero
    assert_eq!(
        store
            .complete_routine(routine_id, CHILD, at(7, 30))
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn routine_dependency_must_be_approved_first() {
    let (store, _dir) = test_store().await;
    let (routine_id, rt1, rt2) = routine_with_tasks(&store, 3, true).await;

    // Approve only the dependent task; its dependency rt1 stays pending.
    assert!(store.complete_routine_task(rt2).await.unwrap());
    assert!(store.approve_routine_task(rt2).await.unwrap());
    assert!(
        store
            .complete_routine(routine_id, CHILD, at(7, 30))
            .await
            .unwrap()
            .is_none()
    );

    assert!(store.complete_routine_task(rt1).await.unwrap());
    assert!(store.approve_routine_task(rt1).await.unwrap());
    assert_eq!(
        store
            .complete_routine(routine_id, CHILD, at(7, 30))
            .await
            .unwrap(),
        Some(3)
    );
}

#[tokio::test]
async fn reorder_ignores_unknown_routine_tasks() {
    let (store, _dir) = test_store().await;
    let (routine_id, rt1, rt2) = routine_with_tasks(&store, 0, false).await;

    let mut ordering = std::collections::HashMap::new();
    ordering.insert(rt1, 2);
    ordering.insert(rt2, 1);
    ordering.insert(9999, 3); // not linked; must be ignored
    store
        .reorder_routine_tasks(routine_id, ordering)
        .await
        .unwrap();

    let linked = store.list_routine_tasks(routine_id).await.unwrap();
    let orders: Vec<(i32, i32)> = linked
        .iter()
        .map(|(l, _)| (l.routine_task_id, l.seq_order))
        .collect();
    assert_eq!(orders, vec![(rt2, 1), (rt1, 2)]);
}

#[tokio::test]
async fn reset_returns_routine_tasks_to_pending() {
    let (store, _dir) = test_store().await;
    let (routine_id, rt1, rt2) = routine_with_tasks(&store, 2, false).await;
    assert!(store.complete_routine_task(rt1).await.unwrap());
    assert!(store.approve_routine_task(rt1).await.unwrap());
    assert!(store.complete_routine_task(rt2).await.unwrap());

    let reset = store.reset_routine_tasks(routine_id).await.unwrap();
    assert_eq!(reset, 2);

    // Both templates start tomorrow's cycle pending again
    assert!(store.complete_routine_task(rt1).await.unwrap());
    assert!(store.complete_routine_task(rt2).await.unwrap());
}

fn goal_req(target: i32, goal_type: GoalType, requires_approval: bool) -> CreateGoal {
    let today = Utc::now().date_naive();
    CreateGoal {
        parent_id: PARENT.to_string(),
        child_id: CHILD.to_string(),
        title: "Read every day".to_string(),
        target_points: target,
        goal_type,
        start_date: today - Duration::days(7),
        end_date: today + Duration::days(7),
        requires_approval,
        reward_id: None,
    }
}

#[tokio::test]
async fn gated_goal_waits_for_parent_approval() {
    let (store, _dir) = test_store().await;
    let goal_id = store
        .create_goal(goal_req(100, GoalType::Automatic, true))
        .await
        .unwrap();

    // Scenario D: progress reaches the target via an approved 100-point task
    let task_id = store.create_task(task_req(100)).await.unwrap();
    assert!(store.complete_task(task_id, CHILD, None).await.unwrap());
    assert!(store.approve_task(task_id).await.unwrap());

    let changed = store.evaluate_goals_for_child(CHILD).await.unwrap();
    assert_eq!(changed, vec![(goal_id, GoalStatus::PendingApproval)]);
    let goal = store.get_goal(goal_id).await.unwrap().unwrap();
    assert_eq!(goal.status, GoalStatus::PendingApproval.as_str());
    // No award yet: only the task's own points are on the ledger
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 100);

    assert!(store.approve_goal(goal_id, PARENT).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 200);
    // Approving again awards nothing
    assert!(!store.approve_goal(goal_id, PARENT).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 200);
}

#[tokio::test]
async fn ungated_goal_completes_on_evaluation() {
    let (store, _dir) = test_store().await;
    let goal_id = store
        .create_goal(goal_req(10, GoalType::Automatic, false))
        .await
        .unwrap();
    store
        .apply_delta(CHILD, 10, DeltaReason::TaskApproval, None)
        .await
        .unwrap();

    let changed = store.evaluate_goals_for_child(CHILD).await.unwrap();
    assert_eq!(changed, vec![(goal_id, GoalStatus::Completed)]);
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 20);
}

#[tokio::test]
async fn manual_goal_gets_progress_but_no_transition() {
    let (store, _dir) = test_store().await;
    let goal_id = store
        .create_goal(goal_req(10, GoalType::Manual, true))
        .await
        .unwrap();
    store
        .apply_delta(CHILD, 50, DeltaReason::TaskApproval, None)
        .await
        .unwrap();

    assert!(store.evaluate_goal(goal_id).await.unwrap().is_none());
    let goal = store.get_goal(goal_id).await.unwrap().unwrap();
    assert_eq!(goal.status, GoalStatus::Active.as_str());
    let progress = store.get_goal_progress(goal_id).await.unwrap().unwrap();
    assert_eq!(progress.current_count, 50);
    assert_eq!(progress.next_needed, 0);
}

#[tokio::test]
async fn direct_completion_requires_ungated_active_goal() {
    let (store, _dir) = test_store().await;
    let gated = store
        .create_goal(goal_req(10, GoalType::Manual, true))
        .await
        .unwrap();
    let ungated = store
        .create_goal(goal_req(10, GoalType::Manual, false))
        .await
        .unwrap();

    assert!(!store.complete_goal_directly(gated, CHILD).await.unwrap());
    assert!(store.complete_goal_directly(ungated, CHILD).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 10);
    // Terminal: cannot complete twice
    assert!(!store.complete_goal_directly(ungated, CHILD).await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 10);
}

#[tokio::test]
async fn reactivation_only_from_rejected() {
    let (store, _dir) = test_store().await;
    let goal_id = store
        .create_goal(goal_req(100, GoalType::Automatic, true))
        .await
        .unwrap();

    // Active -> no-op
    assert!(!store.reactivate_goal(goal_id, PARENT).await.unwrap());

    assert!(store.request_goal_completion(goal_id, CHILD).await.unwrap());
    // Pending approval -> still a no-op
    assert!(!store.reactivate_goal(goal_id, PARENT).await.unwrap());

    assert!(
        store
            .reject_goal(goal_id, PARENT, "Too many skipped days")
            .await
            .unwrap()
    );
    assert!(store.reactivate_goal(goal_id, PARENT).await.unwrap());
    let goal = store.get_goal(goal_id).await.unwrap().unwrap();
    assert_eq!(goal.status, GoalStatus::Active.as_str());
    assert!(goal.rejected_at.is_none());
    assert!(goal.rejection_comment.is_none());

    // Back to active: a second reactivation reports nothing changed
    assert!(!store.reactivate_goal(goal_id, PARENT).await.unwrap());
}

#[tokio::test]
async fn goal_ownership_gates_parent_actions() {
    let (store, _dir) = test_store().await;
    let goal_id = store
        .create_goal(goal_req(100, GoalType::Automatic, true))
        .await
        .unwrap();
    assert!(store.request_goal_completion(goal_id, CHILD).await.unwrap());

    // A different parent cannot approve or reject
    assert!(!store.approve_goal(goal_id, "stranger").await.unwrap());
    assert!(!store.reject_goal(goal_id, "stranger", "no").await.unwrap());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 0);
}
