//! Terminal classification
//!
//! Decides which cursor backend a stream gets:
//!
//! 1. Standard streams under a host IDE or notebook known to render ANSI
//!    (`PYCHARM_HOSTED=1` or `JPY_PARENT_PID` set) are ANSI.
//! 2. Terminal streams whose `TERM` starts with a recognized terminal type,
//!    or with `ANSICON` set, are ANSI.
//! 3. Other terminal streams on Windows use the legacy console API.
//! 4. Everything else gets no cursor control at all.

use std::fmt;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

use super::env::{Environment, ANSICON, TERM};
use super::stream::StreamHandle;

/// Terminal type name prefixes that are known to speak ANSI.
pub const ANSI_TERMS: [&str; 9] = [
    "([xe]|bv)term",
    "(sco)?ansi",
    "cygwin",
    "konsole",
    "linux",
    "rxvt",
    "screen",
    "tmux",
    "vt(10[02]|220|320)",
];

/// Backend family for a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalKind {
    /// Escape-sequence capable terminal
    Ansi,
    /// Windows console without ANSI interpretation
    WindowsLegacy,
    /// Not interactive (file, pipe) or unknown
    None,
}

impl fmt::Display for TerminalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TerminalKind::Ansi => "ansi",
            TerminalKind::WindowsLegacy => "windows-legacy",
            TerminalKind::None => "none",
        })
    }
}

/// Observable facts about a stream that classification depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTraits {
    pub is_standard: bool,
    pub is_terminal: bool,
}

impl StreamTraits {
    pub fn of(handle: &StreamHandle) -> Self {
        Self {
            is_standard: handle.is_standard(),
            is_terminal: handle.is_terminal(),
        }
    }
}

fn ansi_term_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        RegexBuilder::new(&format!("^({})", ANSI_TERMS.join("|")))
            .case_insensitive(true)
            .build()
            .expect("ANSI_TERMS is a valid pattern")
    })
}

/// Whether a `TERM` value names a recognized ANSI terminal type
pub fn is_ansi_term(term: &str) -> bool {
    ansi_term_regex().is_match(term)
}

/// Classify a live stream against an environment snapshot.
pub fn classify(handle: &StreamHandle, env: &Environment) -> TerminalKind {
    classify_traits(StreamTraits::of(handle), env, cfg!(windows))
}

/// Classification as a pure function of its inputs.
pub fn classify_traits(traits: StreamTraits, env: &Environment, windows: bool) -> TerminalKind {
    if is_ansi(traits, env) {
        TerminalKind::Ansi
    } else if windows && traits.is_terminal {
        TerminalKind::WindowsLegacy
    } else {
        TerminalKind::None
    }
}

fn is_ansi(traits: StreamTraits, env: &Environment) -> bool {
    if traits.is_standard && env.is_ansi_host() {
        return true;
    }

    traits.is_terminal && (env.get(TERM).map_or(false, is_ansi_term) || env.contains(ANSICON))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::env::{JPY_PARENT_PID, PYCHARM_HOSTED};

    const TTY: StreamTraits = StreamTraits {
        is_standard: true,
        is_terminal: true,
    };
    const FILE: StreamTraits = StreamTraits {
        is_standard: false,
        is_terminal: false,
    };

    #[test]
    fn test_term_allowlist() {
        for term in [
            "xterm", "xterm-256color", "XTERM", "eterm-color", "bvterm", "ansi", "scoansi",
            "cygwin", "konsole-256color", "linux", "rxvt-unicode", "screen.xterm", "tmux-256color",
            "vt100", "vt102", "vt220", "VT320",
        ] {
            assert!(is_ansi_term(term), "{term} should be recognized");
        }
        for term in ["", "dumb", "vt52", "vt200", "myxterm", "emacs"] {
            assert!(!is_ansi_term(term), "{term} should not be recognized");
        }
    }

    #[test]
    fn test_xterm_tty_is_ansi() {
        let env = Environment::from_pairs([(TERM, "xterm-256color")]);
        assert_eq!(classify_traits(TTY, &env, false), TerminalKind::Ansi);
        assert_eq!(classify_traits(TTY, &env, true), TerminalKind::Ansi);
    }

    #[test]
    fn test_windows_without_term_is_legacy() {
        let env = Environment::default();
        assert_eq!(classify_traits(TTY, &env, true), TerminalKind::WindowsLegacy);
        assert_eq!(classify_traits(TTY, &env, false), TerminalKind::None);
    }

    #[test]
    fn test_ansicon_enables_ansi() {
        let env = Environment::from_pairs([(ANSICON, "120x1000 (120x25)")]);
        assert_eq!(classify_traits(TTY, &env, true), TerminalKind::Ansi);
    }

    #[test]
    fn test_plain_file_is_none() {
        let env = Environment::from_pairs([(TERM, "xterm")]);
        assert_eq!(classify_traits(FILE, &env, false), TerminalKind::None);
        assert_eq!(classify_traits(FILE, &env, true), TerminalKind::None);
    }

    #[test]
    fn test_host_markers_only_apply_to_standard_streams() {
        let piped_stdout = StreamTraits {
            is_standard: true,
            is_terminal: false,
        };
        let pycharm = Environment::from_pairs([(PYCHARM_HOSTED, "1")]);
        let jupyter = Environment::from_pairs([(JPY_PARENT_PID, "1234")]);

        assert_eq!(classify_traits(piped_stdout, &pycharm, false), TerminalKind::Ansi);
        assert_eq!(classify_traits(piped_stdout, &jupyter, false), TerminalKind::Ansi);
        assert_eq!(classify_traits(FILE, &pycharm, false), TerminalKind::None);
        assert_eq!(
            classify_traits(piped_stdout, &Environment::from_pairs([(PYCHARM_HOSTED, "0")]), false),
            TerminalKind::None
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let env = Environment::from_pairs([(TERM, "screen")]);
        for traits in [TTY, FILE] {
            for windows in [false, true] {
                assert_eq!(
                    classify_traits(traits, &env, windows),
                    classify_traits(traits, &env, windows)
                );
            }
        }
    }

    #[test]
    fn test_temp_file_handle_is_none() {
        let handle = StreamHandle::from_sink(tempfile::tempfile().unwrap());
        assert_eq!(classify(&handle, &Environment::default()), TerminalKind::None);
    }
}
