//! External tool resolution.
//!
//! Bare names are looked up on `PATH`; anything containing a path separator
//! is checked relative to the working directory. Either way the result must
//! be an executable file.

use std::path::{Path, PathBuf};

use crate::error::{FramesieveError, FramesieveResult};

/// Resolve `path` to an executable, labelling failures with `tool`.
pub fn resolve_tool(tool: &str, path: &Path) -> FramesieveResult<PathBuf> {
    let resolved = which::which(path).map_err(|e| {
        tracing::debug!(tool, path = %path.display(), error = %e, "Tool lookup failed");
        FramesieveError::tool_not_found(tool, path)
    })?;
    tracing::debug!(tool, resolved = %resolved.display(), "Resolved tool");
    Ok(resolved)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_resolves_executable_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("detect-blurry");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let resolved = resolve_tool("detect-blurry", &script).unwrap();
        assert_eq!(resolved, script);
    }

    #[test]
    fn test_missing_tool_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_tool("contains-faces", &dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, FramesieveError::ToolNotFound { .. }));
    }

    #[test]
    fn test_non_executable_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("contains-faces");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();

        assert!(resolve_tool("contains-faces", &script).is_err());
    }
}
