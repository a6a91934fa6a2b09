use average::Mean;
use chrono::{DateTime, TimeDelta, Utc};
use itertools::Itertools;

use crate::{core::window::Window, ops::Interval, quantity::rate::KilowattHourRate};

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
#[error("window starting at {start} lasts {actual}, while the others last {expected}")]
pub struct InvalidMergeInputError {
    pub start: DateTime<Utc>,
    pub expected: TimeDelta,
    pub actual: TimeDelta,
}

/// Collapse adjacent windows into continuous runs.
///
/// The windows are ordered by start time and repeated starts are dropped. A new run begins
/// wherever two consecutive windows end further apart than the common window duration,
/// so any gap splits the runs. Each run's cost is the plain mean of its members' costs.
///
/// Merging the output again only returns it unchanged when all runs came out the same length.
/// Runs of different lengths, say 1h30m and 3h, are mixed-duration input and get rejected with
/// [`InvalidMergeInputError`].
pub fn merge_runs(
    windows: impl IntoIterator<Item = Window>,
) -> Result<Vec<Window>, InvalidMergeInputError> {
    let windows = windows
        .into_iter()
        .sorted_by_key(|window| window.interval.start)
        .dedup_by(|lhs, rhs| lhs.interval.start == rhs.interval.start)
        .collect_vec();
    let Some(duration) = windows.first().map(|window| window.duration()) else {
        return Ok(Vec::new());
    };
    if let Some(window) = windows.iter().find(|window| window.duration() != duration) {
        return Err(InvalidMergeInputError {
            start: window.interval.start,
            expected: duration,
            actual: window.duration(),
        });
    }

    let mut runs: Vec<Vec<Window>> = Vec::new();
    for window in windows {
        if let Some(run) = runs.last_mut()
            && let Some(last) = run.last()
            && window.interval.end - last.interval.end <= duration
        {
            run.push(window);
        } else {
            runs.push(vec![window]);
        }
    }
    Ok(runs.iter().map(Vec::as_slice).filter_map(collapse).collect())
}

fn collapse(run: &[Window]) -> Option<Window> {
    let first = run.first()?;
    let last = run.last()?;
    let estimate: Mean = run.iter().map(|window| window.mean_cost.into_inner()).collect();
    Some(Window {
        interval: Interval::from_std(first.interval.start..last.interval.end),
        mean_cost: KilowattHourRate::new(estimate.mean()),
    })
}
