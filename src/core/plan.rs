use std::fmt::{Display, Formatter};

use chrono::TimeDelta;

use crate::{core::window::Window, quantity::percent::Percent};

/// How the planner arrived at the plan.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The battery and solar cover tomorrow's load.
    NotRequired,

    /// Charging on zero or negative prices only.
    Free,

    /// Charging on prices under the gas-equivalent threshold.
    SuperCheap,

    /// Charging on the cheapest slots under the cheap threshold.
    Economy,

    /// Charging on the cheapest remaining slots to avoid running flat.
    BestEffort,

    /// Charging on a pre-ranked fixed-length window.
    FixedWindow,

    /// Charging is not worth it: wait for cheaper daytime prices.
    Deferred,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::NotRequired => "not required",
            Self::Free => "free",
            Self::SuperCheap => "super cheap",
            Self::Economy => "economy",
            Self::BestEffort => "best effort",
            Self::FixedWindow => "fixed window",
            Self::Deferred => "deferred",
        };
        f.write_str(label)
    }
}

#[must_use]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChargePlan {
    pub outcome: Outcome,

    /// Merged charge windows in chronological order.
    pub windows: Vec<Window>,

    pub target_state_of_charge: Percent,
}

impl ChargePlan {
    pub const fn idle(outcome: Outcome, target_state_of_charge: Percent) -> Self {
        Self { outcome, windows: Vec::new(), target_state_of_charge }
    }

    pub fn duration_total(&self) -> TimeDelta {
        self.windows.iter().map(|window| window.duration()).sum()
    }

    #[must_use]
    pub fn is_charging(&self) -> bool {
        !self.windows.is_empty()
    }
}
