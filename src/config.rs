/*
 * config.rs
 *
 * Loads solver definitions -- which executables to race and what arguments
 * to give each -- and figures out which of them are actually on $PATH.
 * Mirrors jsi/config/loader.py: a user override at ~/.jsi/definitions.json
 * takes precedence over the bundled default table; `which` resolution is
 * cached in ~/.jsi/solvers.json so a second invocation doesn't re-scan
 * $PATH for every known solver.
 */

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};

/// One entry in the solver-definitions table: how to invoke a given solver
/// on an SMT-LIB input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverDefinition {
    pub executable: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl SolverDefinition {
    /// Build the argv for invoking this solver on `input`, substituting the
    /// literal token `{input}` if present in `args`, else appending the
    /// path as the final argument.
    #[must_use]
    pub fn build_args(&self, input: &Path) -> Vec<String> {
        let input_str = input.display().to_string();
        if self.args.iter().any(|a| a == "{input}") {
            self.args
                .iter()
                .map(|a| if a == "{input}" { input_str.clone() } else { a.clone() })
                .collect()
        } else {
            let mut args = self.args.clone();
            args.push(input_str);
            args
        }
    }
}

/// name -> definition, the same shape `jsi`'s `definitions.json` uses.
pub type Definitions = BTreeMap<String, SolverDefinition>;

const DEFAULT_DEFINITIONS_JSON: &str = include_str!("default_definitions.json");

/// Parse a definitions JSON document (whatever its source).
///
/// # Errors
///
/// Returns an error if the document isn't valid JSON or doesn't match the
/// expected shape.
pub fn parse_definitions(contents: &str) -> Result<Definitions> {
    serde_json::from_str(contents).map_err(|e| PortfolioError::InvalidConfig(e.to_string()))
}

/// Load `~/.jsi/definitions.json` if present, else the bundled defaults
/// (bitwuzla, boolector, cvc4, cvc5, stp, yices-smt2, z3).
///
/// # Errors
///
/// Returns an error if a user override file exists but fails to parse.
pub fn load_definitions(home_dir: Option<&Path>) -> Result<Definitions> {
    if let Some(dir) = home_dir {
        let path = dir.join("definitions.json");
        if let Ok(contents) = fs::read_to_string(&path) {
            tracing::debug!(path = %path.display(), "loaded user solver definitions");
            return parse_definitions(&contents);
        }
    }
    parse_definitions(DEFAULT_DEFINITIONS_JSON)
}

/// The `~/.jsi` equivalent home directory for this crate's own state
/// (definitions override, solver-path cache, daemon socket).
#[must_use]
pub fn state_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".jsi"))
}

/// Which of `definitions`' executables are actually on `$PATH`, consulting
/// (and refreshing) a cache file so repeat invocations skip the `which`
/// scan for solvers known to still be present.
///
/// # Errors
///
/// Returns an error only if writing the cache file fails outright; a
/// missing or unreadable cache is treated as empty, not an error.
pub fn find_available_solvers(
    definitions: &Definitions,
    state_dir: Option<&Path>,
) -> Result<BTreeMap<String, PathBuf>> {
    let cache_path = state_dir.map(|dir| dir.join("solvers.json"));
    let mut cache: BTreeMap<String, PathBuf> = cache_path
        .as_deref()
        .and_then(|p| fs::read_to_string(p).ok())
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default();

    let mut available = BTreeMap::new();
    let mut dirty = false;

    for (name, def) in definitions {
        if let Some(cached) = cache.get(name).filter(|p| p.is_file()) {
            available.insert(name.clone(), cached.clone());
            continue;
        }

        match which::which(&def.executable) {
            Ok(path) => {
                tracing::debug!(solver = %name, path = %path.display(), "solver found on PATH");
                cache.insert(name.clone(), path.clone());
                available.insert(name.clone(), path);
                dirty = true;
            }
            Err(_) => {
                tracing::debug!(solver = %name, executable = %def.executable, "solver not found on PATH");
            }
        }
    }

    if dirty && let Some(dir) = state_dir {
        fs::create_dir_all(dir).map_err(PortfolioError::Io)?;
        if let Ok(json) = serde_json::to_string_pretty(&cache) {
            let _ = fs::write(dir.join("solvers.json"), json);
        }
    }

    Ok(available)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_definitions() {
        let defs = parse_definitions(DEFAULT_DEFINITIONS_JSON).unwrap();
        assert!(defs.contains_key("z3"));
        assert!(defs.contains_key("cvc5"));
    }

    #[test]
    fn build_args_substitutes_input_token() {
        let def = SolverDefinition {
            executable: "z3".into(),
            model: None,
            args: vec!["-smt2".into(), "{input}".into()],
        };
        let args = def.build_args(Path::new("/tmp/x.smt2"));
        assert_eq!(args, vec!["-smt2", "/tmp/x.smt2"]);
    }

    #[test]
    fn build_args_appends_when_no_token() {
        let def = SolverDefinition {
            executable: "z3".into(),
            model: None,
            args: vec!["-in".into()],
        };
        let args = def.build_args(Path::new("/tmp/x.smt2"));
        assert_eq!(args, vec!["-in", "/tmp/x.smt2"]);
    }

    #[test]
    fn load_definitions_falls_back_to_bundled_default() {
        let defs = load_definitions(None).unwrap();
        assert!(!defs.is_empty());
    }

    #[test]
    fn find_available_solvers_skips_missing() {
        let mut defs = Definitions::new();
        defs.insert(
            "nonexistent-solver-xyz".into(),
            SolverDefinition {
                executable: "nonexistent-solver-xyz".into(),
                model: None,
                args: vec![],
            },
        );
        let available = find_available_solvers(&defs, None).unwrap();
        assert!(available.is_empty());
    }
}
