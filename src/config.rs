//! Interpreter settings taken from the environment.

use std::env;
use std::path::PathBuf;

const STARTUP_SCRIPT: &str = ".tbasicrc";
const HISTORY_FILE: &str = ".tbasic_history";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directories searched by `#include` after the working directory.
    pub include_paths: Vec<PathBuf>,
    /// Script run before a file or the interactive prompt, if it exists.
    pub startup_script: Option<PathBuf>,
    /// Where the interactive prompt keeps its history.
    pub history_path: Option<PathBuf>,
    /// Deepest allowed nesting of user-function calls.
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            include_paths: vec![PathBuf::from(".")],
            startup_script: None,
            history_path: None,
            max_call_depth: 256,
        }
    }
}

impl Config {
    /// Reads `TBASIC_INCLUDE_PATH`, `TBASIC_MAX_CALL_DEPTH` and `HOME`.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Some(paths) = env::var_os("TBASIC_INCLUDE_PATH") {
            let parsed: Vec<PathBuf> = env::split_paths(&paths).filter(|p| !p.as_os_str().is_empty()).collect();
            if !parsed.is_empty() {
                config.include_paths = parsed;
            }
        }

        if let Some(depth) = env::var("TBASIC_MAX_CALL_DEPTH").ok().and_then(|v| v.trim().parse().ok()) {
            config.max_call_depth = depth;
        }

        let home = env::var_os("HOME").map(PathBuf::from);
        config.startup_script = home
            .as_ref()
            .map(|h| h.join(STARTUP_SCRIPT))
            .filter(|p| p.exists())
            .or_else(|| Some(PathBuf::from(STARTUP_SCRIPT)).filter(|p| p.exists()));
        config.history_path = home.map(|h| h.join(HISTORY_FILE));

        tracing::debug!(?config, "configuration loaded");
        config
    }
}
