use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Raised when a status/role column holds text outside the closed enum.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum!(TaskStatus, "task status", {
    Pending => "pending",
    Completed => "completed",
    Approved => "approved",
    Rejected => "rejected",
});

text_enum!(GoalStatus, "goal status", {
    Active => "active",
    PendingApproval => "pending_approval",
    Completed => "completed",
    Rejected => "rejected",
});

text_enum!(GoalType, "goal type", {
    Manual => "manual",
    Automatic => "automatic",
});

text_enum!(RewardStatus, "reward status", {
    Available => "available",
    Redeemed => "redeemed",
    Fulfilled => "fulfilled",
    Denied => "denied",
});

/// Why a signed delta was applied to a balance. Earning reasons feed goal
/// progress and the dashboard totals; redeem/refund do not.
text_enum!(DeltaReason, "delta reason", {
    TaskApproval => "task_approval",
    RoutineBonus => "routine_bonus",
    GoalAward => "goal_award",
    RewardRedeem => "reward_redeem",
    RewardRefund => "reward_refund",
});

impl DeltaReason {
    pub fn is_earning(&self) -> bool {
        matches!(
            self,
            DeltaReason::TaskApproval | DeltaReason::RoutineBonus | DeltaReason::GoalAward
        )
    }
}

/// Effective user role. The legacy `parent` spelling is normalized to
/// `main_parent` at parse time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "parent")]
    MainParent,
    Child,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::MainParent => "main_parent",
            Role::Child => "child",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main_parent" | "parent" => Ok(Role::MainParent),
            "child" => Ok(Role::Child),
            other => Err(ParseEnumError {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Child {
    pub id: String,
    pub display_name: String,
}
