//! Artifact path allocation
//!
//! Partitions the artifact root before any unit starts, so no unit ever
//! coordinates over the filesystem. Directories are created eagerly; an
//! unwritable filesystem fails the run here, before any launch.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SwarmError;

/// Mount source directories for one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitPaths {
    /// The unit's own directory.
    pub dir: PathBuf,
    /// Raw test results.
    pub results: PathBuf,
    /// Rendered HTML report.
    pub report: PathBuf,
}

/// Allocated paths for a whole run.
#[derive(Clone, Debug)]
pub struct RunPaths {
    pub root: PathBuf,
    pub units: Vec<UnitPaths>,
}

/// Allocate `<results_root>/<run_id>/[instance-i/]{results,report}`.
///
/// Deterministic given its inputs. For a single unit the unit directory
/// is the run root itself, keeping one-off output ergonomic; for more,
/// each unit gets a distinct `instance-i` subdirectory.
pub fn allocate(results_root: &Path, run_id: &str, count: u32) -> Result<RunPaths, SwarmError> {
    let root = results_root.join(run_id);

    let mut units = Vec::with_capacity(count as usize);
    for index in 1..=count {
        let dir = if count == 1 {
            root.clone()
        } else {
            root.join(format!("instance-{index}"))
        };
        let paths = UnitPaths {
            results: dir.join("results"),
            report: dir.join("report"),
            dir,
        };
        create_dir(&paths.results)?;
        create_dir(&paths.report)?;
        units.push(paths);
    }

    debug!("allocated {} artifact dir(s) under {}", count, root.display());
    Ok(RunPaths { root, units })
}

fn create_dir(path: &Path) -> Result<(), SwarmError> {
    std::fs::create_dir_all(path).map_err(|source| SwarmError::Storage {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_single_unit_uses_run_root() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = allocate(tmp.path(), "20260830-101500", 1).unwrap();

        assert_eq!(paths.units.len(), 1);
        assert_eq!(paths.units[0].dir, paths.root);
        assert!(paths.units[0].results.is_dir());
        assert!(paths.units[0].report.is_dir());
    }

    #[test]
    fn test_multi_unit_dirs_are_distinct_and_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let count = 5;
        let paths = allocate(tmp.path(), "20260830-101501", count).unwrap();

        assert_eq!(paths.units.len(), count as usize);

        let dirs: HashSet<_> = paths.units.iter().map(|u| u.dir.clone()).collect();
        assert_eq!(dirs.len(), count as usize, "unit dirs must be pairwise distinct");

        for unit in &paths.units {
            assert!(unit.dir.starts_with(&paths.root));
            assert!(unit.dir.is_dir());
            assert!(unit.results.is_dir());
            assert!(unit.report.is_dir());
        }
    }

    #[test]
    fn test_deterministic_for_same_inputs() {
        let tmp = tempfile::tempdir().unwrap();
        let a = allocate(tmp.path(), "20260830-101502", 3).unwrap();
        let b = allocate(tmp.path(), "20260830-101502", 3).unwrap();
        assert_eq!(a.root, b.root);
        assert_eq!(a.units, b.units);
    }

    #[test]
    fn test_concurrent_runs_never_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let a = allocate(tmp.path(), "20260830-101503", 2).unwrap();
        let b = allocate(tmp.path(), "20260830-101504", 2).unwrap();
        assert_ne!(a.root, b.root);
    }

    #[test]
    fn test_unwritable_root_is_a_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        // a plain file where a directory is needed
        let occupied = tmp.path().join("occupied");
        std::fs::write(&occupied, b"not a directory").unwrap();

        let err = allocate(&occupied, "20260830-101505", 1).unwrap_err();
        assert!(matches!(err, SwarmError::Storage { .. }));
    }
}
