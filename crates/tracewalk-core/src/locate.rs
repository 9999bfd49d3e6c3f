//! # Target Discovery
//!
//! Picks the binary to analyze from a working directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::error::{TraceError, TraceResult};

/// File extensions accepted as executables regardless of permissions.
const EXECUTABLE_EXTENSIONS: [&str; 2] = ["out", "exe"];

/// Find the most recently modified executable directly inside `dir`.
///
/// A candidate is a regular file that ends in `.out` or `.exe`, or that
/// carries an execute permission bit on unix. Subdirectories are not searched.
///
/// ## Errors
///
/// - `NoExecutableFound`: no candidate exists in `dir`
/// - `Io`: `dir` cannot be read
pub fn find_executable(dir: &Path) -> TraceResult<PathBuf>
{
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        let path = entry.path();
        if !metadata.is_file() || !is_candidate(&path, &metadata) {
            continue;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        debug!(candidate = %path.display(), "found executable candidate");
        let is_newer = match &newest {
            Some((best, _)) => modified > *best,
            None => true,
        };
        if is_newer {
            newest = Some((modified, path));
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| TraceError::NoExecutableFound { dir: dir.to_path_buf() })
}

fn is_candidate(path: &Path, metadata: &fs::Metadata) -> bool
{
    let by_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXECUTABLE_EXTENSIONS.contains(&ext));

    by_extension || is_executable(metadata)
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool
{
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool
{
    false
}

#[cfg(test)]
mod tests
{
    use std::time::Duration;

    use super::*;

    fn scratch(name: &str) -> PathBuf
    {
        let dir = std::env::temp_dir().join(format!("tracewalk-locate-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_picks_newest_candidate()
    {
        let dir = scratch("newest");
        fs::write(dir.join("old.out"), b"").unwrap();
        std::thread::sleep(Duration::from_millis(20));
        fs::write(dir.join("new.exe"), b"").unwrap();
        fs::write(dir.join("notes.txt"), b"").unwrap();

        let found = find_executable(&dir).unwrap();
        assert_eq!(found, dir.join("new.exe"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_ignores_directories_and_plain_files()
    {
        let dir = scratch("plain");
        fs::create_dir(dir.join("build.out")).unwrap();
        fs::write(dir.join("main.c"), b"int main(void) { return 0; }").unwrap();

        let err = find_executable(&dir).unwrap_err();
        assert!(matches!(err, TraceError::NoExecutableFound { .. }));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_bit_counts()
    {
        use std::os::unix::fs::PermissionsExt;

        let dir = scratch("execbit");
        let binary = dir.join("prog");
        fs::write(&binary, b"").unwrap();
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(find_executable(&dir).unwrap(), binary);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_dir_is_io_error()
    {
        let err = find_executable(Path::new("/nonexistent/tracewalk/dir")).unwrap_err();
        assert!(matches!(err, TraceError::Io(_)));
    }
}
