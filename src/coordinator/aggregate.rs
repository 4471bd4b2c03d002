//! Status aggregation
//!
//! Maps unit exit codes to terminal statuses and reduces a finished
//! run to its single pass/fail verdict and ordered report.

use tracing::debug;

use crate::models::{Run, RunReport, RunStatus, UnitStatus, WorkUnit};

/// Terminal status for an observed exit. A missing or unreadable exit
/// code counts as a failure; `Unknown` is reserved for units that never
/// started and is assigned where those are recorded.
pub fn terminal_status(exit_code: Option<i32>) -> UnitStatus {
    match exit_code {
        Some(0) => UnitStatus::Succeeded,
        _ => UnitStatus::Failed,
    }
}

/// Aggregate verdict: success only when every unit succeeded. Failed
/// and unknown units both fail the run.
pub fn overall(units: &[WorkUnit]) -> RunStatus {
    if units.iter().all(|u| u.status == UnitStatus::Succeeded) {
        RunStatus::Success
    } else {
        RunStatus::Failure
    }
}

/// Reduce a run whose units are all terminal into its report. Units are
/// reported in index order no matter what order they finished in.
pub fn finalize(run: Run) -> RunReport {
    let mut units = run.units;
    debug_assert!(units.iter().all(|u| u.status.is_terminal()));
    units.sort_by_key(|u| u.index);

    let verdict = overall(&units);
    debug!(
        "run {}: {}/{} unit(s) succeeded, verdict {}",
        run.run_id,
        units
            .iter()
            .filter(|u| u.status == UnitStatus::Succeeded)
            .count(),
        units.len(),
        verdict
    );

    RunReport {
        run_id: run.run_id,
        mode: run.mode,
        requested_count: run.requested_count,
        overall: verdict,
        root_artifact_path: run.root_artifact_path,
        units,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunMode;

    fn unit(index: u32, exit_code: Option<i32>) -> WorkUnit {
        WorkUnit {
            index,
            handle_id: Some(format!("unit-{index}")),
            artifact_dir: None,
            status: terminal_status(exit_code),
            exit_code,
        }
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(terminal_status(Some(0)), UnitStatus::Succeeded);
        assert_eq!(terminal_status(Some(1)), UnitStatus::Failed);
        assert_eq!(terminal_status(Some(137)), UnitStatus::Failed);
        assert_eq!(terminal_status(None), UnitStatus::Failed);
    }

    #[test]
    fn test_single_unit_success() {
        assert_eq!(overall(&[unit(1, Some(0))]), RunStatus::Success);
    }

    #[test]
    fn test_single_unit_failure() {
        assert_eq!(overall(&[unit(1, Some(2))]), RunStatus::Failure);
    }

    #[test]
    fn test_five_units_one_forced_failure() {
        let units = vec![
            unit(1, Some(0)),
            unit(2, Some(0)),
            unit(3, Some(1)),
            unit(4, Some(0)),
            unit(5, Some(0)),
        ];
        assert_eq!(overall(&units), RunStatus::Failure);

        let all_green: Vec<WorkUnit> = (1..=5).map(|i| unit(i, Some(0))).collect();
        assert_eq!(overall(&all_green), RunStatus::Success);
    }

    #[test]
    fn test_unknown_unit_fails_the_run() {
        let units = vec![unit(1, Some(0)), WorkUnit::never_started(2)];
        assert_eq!(overall(&units), RunStatus::Failure);
    }

    #[test]
    fn test_report_sorted_by_index_regardless_of_completion_order() {
        let mut run = Run::new(RunMode::Local, 4);
        // completion order: 3, 1, 4, 2
        run.units = vec![
            unit(3, Some(0)),
            unit(1, Some(0)),
            unit(4, Some(1)),
            unit(2, Some(0)),
        ];

        let report = finalize(run);

        let indices: Vec<u32> = report.units.iter().map(|u| u.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert_eq!(report.overall, RunStatus::Failure);
    }

    #[test]
    fn test_report_preserves_unit_detail() {
        let mut run = Run::new(RunMode::Remote, 2);
        run.units = vec![unit(2, Some(7)), unit(1, Some(0))];

        let report = finalize(run);
        assert_eq!(report.units[1].exit_code, Some(7));
        assert_eq!(report.units[1].status, UnitStatus::Failed);
        assert_eq!(report.succeeded_count(), 1);
    }
}
