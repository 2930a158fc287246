//! Environment variable access for config file substitution.
//!
//! Config files may reference environment variables as `${NAME}` or
//! `${NAME:default}`. Substitution goes through the [`Env`] trait so tests can
//! supply a fixed environment:
//!
//! - [`OsEnv`]: reads the process environment and remembers which names were looked up
//! - [`FauxEnv`]: a fixed map for tests

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::env::{var, var_os};
use std::ffi::OsString;

use subst::VariableMap;
use tracing::warn;

/// Environment variable lookup that can be substituted in tests.
pub trait Env<'a>: VariableMap<'a> {
    /// Get an environment variable without Unicode validation.
    fn var_os(&self, key: &str) -> Option<OsString>;

    /// Get an environment variable as UTF-8.
    ///
    /// Logs a warning and returns `None` if the value is not valid Unicode.
    #[must_use]
    fn get_env_str(&self, key: &str) -> Option<String> {
        let value = self.var_os(key)?;
        match value.into_string() {
            Ok(v) => Some(v),
            Err(v) => {
                let v = v.to_string_lossy();
                warn!("Environment variable {key} has invalid unicode. Lossy representation: {v}");
                None
            }
        }
    }
}

/// The process environment.
///
/// Every name requested through [`VariableMap`] is recorded, so the caller can
/// report which variables a config file depended on.
#[derive(Debug, Default)]
pub struct OsEnv(RefCell<BTreeSet<String>>);

impl OsEnv {
    /// Names looked up during substitution, sorted.
    #[must_use]
    pub fn requested(&self) -> Vec<String> {
        self.0.borrow().iter().cloned().collect()
    }
}

impl Env<'_> for OsEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        var_os(key)
    }
}

impl<'a> VariableMap<'a> for OsEnv {
    type Value = String;

    fn get(&'a self, key: &str) -> Option<Self::Value> {
        self.0.borrow_mut().insert(key.to_string());
        var(key).ok()
    }
}

/// Fixed environment for tests.
#[derive(Debug, Default)]
pub struct FauxEnv(pub HashMap<&'static str, OsString>);

impl<'a> VariableMap<'a> for FauxEnv {
    type Value = String;

    fn get(&'a self, key: &str) -> Option<Self::Value> {
        self.0.get(key).map(|s| s.to_string_lossy().to_string())
    }
}

impl Env<'_> for FauxEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.0.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_str() {
        let env = FauxEnv::default();
        assert_eq!(env.get_env_str("TILE_KEY"), None);

        let env = FauxEnv(
            vec![("TILE_KEY", OsString::from("secret"))]
                .into_iter()
                .collect(),
        );
        assert_eq!(env.get_env_str("TILE_KEY"), Some("secret".to_string()));
    }

    #[test]
    #[cfg(unix)]
    fn test_bad_os_str() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt as _;

        let bad_utf8 = [0x66, 0x6f, 0x80, 0x6f];
        let os_str = OsStr::from_bytes(&bad_utf8[..]);
        let env = FauxEnv(vec![("BAD", os_str.to_owned())].into_iter().collect());
        assert_eq!(env.get_env_str("BAD"), None);
    }

    #[test]
    fn test_os_env_records_requested_names() {
        let env = OsEnv::default();
        let _ = env.get("TILESTITCH_SURELY_UNSET_B");
        let _ = env.get("TILESTITCH_SURELY_UNSET_A");
        assert_eq!(
            env.requested(),
            vec![
                "TILESTITCH_SURELY_UNSET_A".to_string(),
                "TILESTITCH_SURELY_UNSET_B".to_string()
            ]
        );
    }
}
