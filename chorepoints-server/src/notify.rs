//! Fire-and-forget notification seam. Delivery/formatting is an external
//! collaborator; the engine only emits events at state transitions and never
//! waits on or fails with the emitter.

use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Event {
    TaskCompleted { task_id: i32, child_id: String },
    TaskApproved { task_id: i32, child_id: String },
    RoutineCompleted { routine_id: i32, child_id: String, bonus: i32 },
    GoalRequested { goal_id: i32, child_id: String },
    GoalApproved { goal_id: i32, child_id: String },
    GoalRejected { goal_id: i32, child_id: String },
    RewardRedeemed { reward_id: i32, child_id: String },
    RewardFulfilled { reward_id: i32 },
    RewardDenied { reward_id: i32 },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, event: Event);
}

pub type SharedNotifier = Arc<dyn Notifier>;

/// Default emitter: structured log lines. A real deployment swaps in a push
/// or mail collaborator behind the same trait.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        tracing::info!(?event, "notification");
    }
}
