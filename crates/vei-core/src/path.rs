use std::path::PathBuf;

/// Resolve the workspace/state/artifacts directory, by priority:
/// 1. An explicit path passed by the caller (with `~` expansion).
/// 2. The `VEI_PATH` environment variable (with `~` expansion).
/// 3. The XDG data directory (`~/.local/share/vei` on Linux).
/// 4. `~/.vei` as a last resort when no data directory is known.
pub fn resolve_workspace_path(explicit_path: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("VEI_PATH") {
        return Some(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Some(data_dir.join("vei"));
    }

    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".vei"))
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins_over_everything() {
        let resolved = resolve_workspace_path(Some("/tmp/explicit-vei"));
        assert_eq!(resolved, Some(PathBuf::from("/tmp/explicit-vei")));
    }

    #[test]
    fn tilde_expands_against_home() {
        // SAFETY: test-only mutation of process env, single-threaded test binary assumption
        // shared with the rest of this module's tests via #[test] isolation per process.
        unsafe {
            std::env::set_var("HOME", "/home/tester");
        }
        let resolved = resolve_workspace_path(Some("~/vei-data"));
        assert_eq!(resolved, Some(PathBuf::from("/home/tester/vei-data")));
    }
}
