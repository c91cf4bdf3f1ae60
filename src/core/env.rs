//! Snapshot of the environment variables that drive detection.

use std::collections::HashMap;

pub const PYCHARM_HOSTED: &str = "PYCHARM_HOSTED";
pub const JPY_PARENT_PID: &str = "JPY_PARENT_PID";
pub const TERM: &str = "TERM";
pub const ANSICON: &str = "ANSICON";
pub const COLUMNS: &str = "COLUMNS";
pub const LINES: &str = "LINES";

/// Every variable consulted by classification and size probing.
pub const CONSULTED: [&str; 6] = [PYCHARM_HOSTED, JPY_PARENT_PID, TERM, ANSICON, COLUMNS, LINES];

/// Immutable copy of the consulted environment variables.
///
/// Classification and probing read from a snapshot rather than the live
/// process environment so that results are deterministic once captured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Capture the consulted variables from the running process
    pub fn capture() -> Self {
        let vars = CONSULTED
            .iter()
            .filter_map(|name| {
                std::env::var(name)
                    .ok()
                    .map(|value| (name.to_string(), value))
            })
            .collect();
        Self { vars }
    }

    /// Build a snapshot from explicit name/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Host IDE or notebook that renders ANSI on the standard streams
    pub fn is_ansi_host(&self) -> bool {
        self.get(PYCHARM_HOSTED) == Some("1") || self.contains(JPY_PARENT_PID)
    }

    pub fn is_notebook(&self) -> bool {
        self.contains(JPY_PARENT_PID)
    }
}
