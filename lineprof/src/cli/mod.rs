//! Command-line interface

pub mod args;

pub use args::Args;

use crate::domain::ProfilerError;
use log::info;
use std::path::Path;

/// Read the script to profile; no path means an empty program
pub fn load_script(path: Option<&Path>) -> Result<String, ProfilerError> {
    let Some(path) = path else {
        info!("no script given, profiling an empty program");
        return Ok(String::new());
    };
    let source = std::fs::read_to_string(path)
        .map_err(|source| ProfilerError::ScriptUnreadable { path: path.to_path_buf(), source })?;
    info!("loaded {} ({} lines)", path.display(), source.lines().count());
    Ok(source)
}

/// Name shown in the dashboard header
#[must_use]
pub fn script_title(path: Option<&Path>) -> String {
    path.map_or_else(|| "<empty>".to_string(), |p| p.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_path_is_empty_program() {
        assert_eq!(load_script(None).unwrap(), "");
        assert_eq!(script_title(None), "<empty>");
    }

    #[test]
    fn test_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "x = 1").unwrap();
        assert_eq!(load_script(Some(file.path())).unwrap(), "x = 1\n");
    }

    #[test]
    fn test_unreadable_file() {
        let err = load_script(Some(Path::new("/nonexistent/lineprof/script.py"))).unwrap_err();
        assert!(matches!(err, ProfilerError::ScriptUnreadable { .. }));
    }
}
