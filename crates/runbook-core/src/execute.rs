//! Directory-scoped cell execution.
//!
//! Runs an ordered selection of compiled cells against the shared
//! namespace. The working directory is switched to the notebook's directory
//! for the duration of the run and restored on the way out, success or
//! failure.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use crate::cell::Cell;
use crate::error::{Error, Result};

/// Scoped working-directory switch.
///
/// A no-op when the target is absent or already current; otherwise the
/// previous directory is restored on drop.
struct DirGuard {
    saved: Option<PathBuf>,
}

impl DirGuard {
    fn enter(dir: Option<&Path>) -> io::Result<Self> {
        let Some(dir) = dir else {
            return Ok(Self { saved: None });
        };
        let current = env::current_dir()?;
        if current.as_path() == dir {
            return Ok(Self { saved: None });
        }
        env::set_current_dir(dir)?;
        Ok(Self {
            saved: Some(current),
        })
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            if let Err(err) = env::set_current_dir(&saved) {
                tracing::warn!(
                    "failed to restore working directory {}: {err}",
                    saved.display()
                );
            }
        }
    }
}

/// Execute the selected cells in order against the shared namespace.
///
/// The first failing cell aborts the rest and its error propagates after
/// the directory is restored. `exec_count` increments once per cell
/// actually executed.
pub(crate) fn run_cells(
    cells: &[Cell],
    selection: &[usize],
    dir: Option<&Path>,
    exec_count: &mut u32,
) -> Result<()> {
    if selection.is_empty() {
        return Ok(());
    }
    let _guard = DirGuard::enter(dir)?;

    for &index in selection {
        let cell = &cells[index];
        *exec_count += 1;
        tracing::trace!("executing {}", cell.label());
        cell.function().call::<()>(()).map_err(|e| Error::Execution {
            cell: cell.label(),
            source: e,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // The working directory is process-global; serialize the tests that
    // touch or observe it.
    static CWD: Mutex<()> = Mutex::new(());

    #[test]
    fn test_dir_guard_restores_on_drop() {
        let _lock = CWD.lock().unwrap();
        let original = env::current_dir().unwrap();
        let target = tempfile::tempdir().unwrap();

        {
            let _guard = DirGuard::enter(Some(target.path())).unwrap();
            // Temp dirs may come back through symlinks, so compare canonically.
            assert_eq!(
                env::current_dir().unwrap().canonicalize().unwrap(),
                target.path().canonicalize().unwrap()
            );
        }
        assert_eq!(env::current_dir().unwrap(), original);
    }

    #[test]
    fn test_dir_guard_missing_dir_is_an_error() {
        let err = DirGuard::enter(Some(Path::new("/nonexistent/runbook-test")));
        assert!(err.is_err());
    }

    #[test]
    fn test_dir_guard_none_is_noop() {
        let _lock = CWD.lock().unwrap();
        let original = env::current_dir().unwrap();
        let _guard = DirGuard::enter(None).unwrap();
        assert_eq!(env::current_dir().unwrap(), original);
    }
}
