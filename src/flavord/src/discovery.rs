//! Plugin socket discovery: where the host looks for `<name>`.

use std::path::{Path, PathBuf};

/// Environment variable overriding the plugin socket directory.
pub const PLUGINS_DIR_ENV: &str = "INFRAKIT_PLUGINS_DIR";

/// Default plugin socket directory: `$INFRAKIT_PLUGINS_DIR`, else
/// `~/.infrakit/plugins`, else `/tmp/.infrakit/plugins` when there is no home.
pub fn plugins_dir() -> PathBuf {
    plugins_dir_from(std::env::var_os(PLUGINS_DIR_ENV).map(PathBuf::from), dirs::home_dir())
}

fn plugins_dir_from(env_dir: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    match env_dir {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => home
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".infrakit")
            .join("plugins"),
    }
}

/// Socket path for plugin `name` inside `dir`.
pub fn socket_path_in(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

/// Socket path the host will use for plugin `name`.
pub fn socket_path(name: &str) -> PathBuf {
    socket_path_in(&plugins_dir(), name)
}
