//! Runtime configuration.
//!
//! Every tunable has a compile-time default, an environment variable
//! override, and (where it makes sense) a CLI flag that wins over both.

use std::path::PathBuf;

use chess::PieceColor;

/// Default search depth handed to the module per run.
const DEFAULT_SEARCH_DEPTH: u8 = 6;

/// Depth bounds exposed to the user.
pub const MIN_SEARCH_DEPTH: u8 = 1;
pub const MAX_SEARCH_DEPTH: u8 = 20;

/// Default directory for rolling log files.
const DEFAULT_LOG_DIR: &str = "logs";

/// Fully resolved settings for one app run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub module: PathBuf,
    pub payload: Option<PathBuf>,
    pub depth: u8,
    pub engine_side: PieceColor,
    pub start_fen: Option<String>,
    pub log_dir: PathBuf,
}

/// Clamp a requested depth into the supported range.
pub fn clamp_depth(depth: u8) -> u8 {
    depth.clamp(MIN_SEARCH_DEPTH, MAX_SEARCH_DEPTH)
}

/// Get the engine module path from the environment, if set.
///
/// `SPARRING_MODULE_PATH`; there is no compiled-in default because the
/// module is a separately built artifact.
pub fn get_module_path() -> Option<PathBuf> {
    std::env::var("SPARRING_MODULE_PATH").ok().map(PathBuf::from)
}

/// Get the explicit payload path from the environment, if set.
///
/// `SPARRING_PAYLOAD_PATH`; when unset the worker derives a sibling
/// payload path from the module locator.
pub fn get_payload_path() -> Option<PathBuf> {
    std::env::var("SPARRING_PAYLOAD_PATH").ok().map(PathBuf::from)
}

/// Get the search depth.
///
/// Priority:
/// 1. `SPARRING_SEARCH_DEPTH` env variable if set (falls back to the
///    default if the value cannot be parsed)
/// 2. `6` as fallback
pub fn get_search_depth() -> u8 {
    if let Ok(raw) = std::env::var("SPARRING_SEARCH_DEPTH") {
        match raw.parse() {
            Ok(depth) => return clamp_depth(depth),
            Err(_) => {
                tracing::warn!(value = %raw, "SPARRING_SEARCH_DEPTH is not a number, using default");
            }
        }
    }

    DEFAULT_SEARCH_DEPTH
}

/// Get the side the automated opponent plays.
///
/// Priority:
/// 1. `SPARRING_ENGINE_SIDE` env variable (`white` or `black`)
/// 2. black as fallback
pub fn get_engine_side() -> PieceColor {
    if let Ok(side) = std::env::var("SPARRING_ENGINE_SIDE") {
        if side.eq_ignore_ascii_case("white") {
            return PieceColor::White;
        }
    }

    PieceColor::Black
}

/// Get the directory for rolling log files.
///
/// Priority:
/// 1. `SPARRING_LOG_DIR` env variable if set
/// 2. `logs` as fallback
pub fn get_log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SPARRING_LOG_DIR") {
        return PathBuf::from(dir);
    }

    PathBuf::from(DEFAULT_LOG_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_depth() {
        assert_eq!(clamp_depth(0), MIN_SEARCH_DEPTH);
        assert_eq!(clamp_depth(6), 6);
        assert_eq!(clamp_depth(99), MAX_SEARCH_DEPTH);
    }

    // single test so concurrent tests never race on the variable
    #[test]
    fn test_get_search_depth() {
        // skipped when the variable is under outside control
        if std::env::var("SPARRING_SEARCH_DEPTH").is_ok() {
            return;
        }
        assert_eq!(get_search_depth(), DEFAULT_SEARCH_DEPTH);
        std::env::set_var("SPARRING_SEARCH_DEPTH", "12");
        assert_eq!(get_search_depth(), 12);
        std::env::set_var("SPARRING_SEARCH_DEPTH", "not-a-number");
        assert_eq!(get_search_depth(), DEFAULT_SEARCH_DEPTH);
        std::env::remove_var("SPARRING_SEARCH_DEPTH");
    }

    #[test]
    fn test_get_engine_side_default() {
        if std::env::var("SPARRING_ENGINE_SIDE").is_err() {
            assert_eq!(get_engine_side(), PieceColor::Black);
        }
    }

    #[test]
    fn test_get_log_dir_default() {
        if std::env::var("SPARRING_LOG_DIR").is_err() {
            assert_eq!(get_log_dir(), PathBuf::from(DEFAULT_LOG_DIR));
        }
    }
}
