//! One cursor per stream
//!
//! Cursors are looked up by [`StreamKey`], so every caller drawing on the
//! same stream shares the same cursor and therefore the same lock, style
//! and memoized size.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::debug;

use super::{Cursor, CursorOptions};
use crate::config::Config;
use crate::core::classify::classify;
use crate::core::env::Environment;
use crate::core::stream::{StdStream, StreamHandle, StreamKey};

pub struct CursorRegistry {
    config: Config,
    env: Environment,
    cursors: Mutex<HashMap<StreamKey, Arc<Cursor>>>,
}

impl CursorRegistry {
    /// Registry classifying against the current process environment
    pub fn new(config: Config) -> Self {
        Self::with_environment(config, Environment::capture())
    }

    pub fn with_environment(config: Config, env: Environment) -> Self {
        Self {
            config,
            env,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// The cursor for `handle`, created and classified on first request.
    ///
    /// A sink writing to descriptor 1 or 2 shares the standard stream's
    /// cursor, which is always built from the standard handle.
    pub fn get_or_create(&self, handle: StreamHandle) -> Arc<Cursor> {
        let key = handle.key();
        let mut cursors = self.cursors.lock();
        if let Some(cursor) = cursors.get(&key) {
            return Arc::clone(cursor);
        }

        let handle = match key {
            StreamKey::Standard(StdStream::Stdout) => StreamHandle::Stdout,
            StreamKey::Standard(StdStream::Stderr) => StreamHandle::Stderr,
            _ => handle,
        };

        let kind = classify(&handle, &self.env);
        debug!("Registering {:?} cursor for {:?}", kind, key);
        let options = CursorOptions::from_config(&self.config, self.env.clone());
        let cursor = Arc::new(Cursor::new(handle, kind, options));
        cursors.insert(key, Arc::clone(&cursor));
        cursor
    }

    pub fn len(&self) -> usize {
        self.cursors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.lock().is_empty()
    }
}

/// Process-wide registry, configured from the config file on first use
pub fn global() -> &'static CursorRegistry {
    static REGISTRY: OnceLock<CursorRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| CursorRegistry::new(Config::load()))
}

/// Shared cursor for any stream
pub fn cursor(handle: StreamHandle) -> Arc<Cursor> {
    global().get_or_create(handle)
}

pub fn stdout() -> Arc<Cursor> {
    cursor(StreamHandle::Stdout)
}

pub fn stderr() -> Arc<Cursor> {
    cursor(StreamHandle::Stderr)
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::core::classify::TerminalKind;
    use crate::test_support::MemorySink;

    fn registry() -> CursorRegistry {
        CursorRegistry::with_environment(Config::default(), Environment::default())
    }

    #[test]
    fn test_same_stream_same_cursor() {
        let registry = registry();
        let (sink, _buffer) = MemorySink::new(false);
        let handle = StreamHandle::from_sink(sink);

        let a = registry.get_or_create(handle.clone());
        let b = registry.get_or_create(handle);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);

        let first = registry.get_or_create(StreamHandle::Stdout);
        let second = registry.get_or_create(StreamHandle::Stdout);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &a));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_plain_sink_gets_passthrough_cursor() {
        let registry = registry();
        let (sink, buffer) = MemorySink::new(false);
        let cursor = registry.get_or_create(StreamHandle::from_sink(sink));
        assert_eq!(cursor.kind(), TerminalKind::None);

        cursor.set_underscore(true);
        cursor.write("log line\n", Some(1), Some(1), None).unwrap();
        assert_eq!(buffer.text(), "log line\n");
    }

    #[test]
    fn test_concurrent_lookup_yields_one_cursor() {
        let registry = Arc::new(registry());
        let (sink, _buffer) = MemorySink::new(false);
        let handle = StreamHandle::from_sink(sink);

        let found: Vec<Arc<Cursor>> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let handle = handle.clone();
                thread::spawn(move || registry.get_or_create(handle))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|t| t.join().unwrap())
            .collect();

        assert!(found.iter().all(|c| Arc::ptr_eq(c, &found[0])));
        assert_eq!(registry.len(), 1);
    }

    /// Writes nowhere but claims to be descriptor 1
    #[cfg(unix)]
    struct StdoutAlias;

    #[cfg(unix)]
    impl std::io::Write for StdoutAlias {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[cfg(unix)]
    impl crate::core::stream::Sink for StdoutAlias {
        fn descriptor(&self) -> Option<crate::core::stream::Descriptor> {
            Some(1)
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_descriptor_alias_does_not_change_stdout_cursor() {
        let env = Environment::from_pairs([(crate::core::env::PYCHARM_HOSTED, "1")]);

        let direct = CursorRegistry::with_environment(Config::default(), env.clone());
        let expected = direct.get_or_create(StreamHandle::Stdout).kind();
        assert_eq!(expected, TerminalKind::Ansi);

        let aliased = CursorRegistry::with_environment(Config::default(), env);
        let first = aliased.get_or_create(StreamHandle::from_sink(StdoutAlias));
        let stdout = aliased.get_or_create(StreamHandle::Stdout);
        assert!(Arc::ptr_eq(&first, &stdout));
        assert!(matches!(stdout.handle(), StreamHandle::Stdout));
        assert_eq!(stdout.kind(), expected);
        assert_eq!(aliased.len(), 1);
    }

    #[test]
    fn test_other_stream_not_blocked_by_batch() {
        let registry = Arc::new(registry());
        let (sink_a, _a) = MemorySink::new(false);
        let (sink_b, buffer_b) = MemorySink::new(false);
        let cursor_a = registry.get_or_create(StreamHandle::from_sink(sink_a));
        let cursor_b = registry.get_or_create(StreamHandle::from_sink(sink_b));

        let (done_tx, done_rx) = mpsc::channel();
        cursor_a.batch(|_| {
            let b = Arc::clone(&cursor_b);
            thread::spawn(move || {
                b.print("free").unwrap();
                done_tx.send(()).unwrap();
            });
            assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        });
        assert_eq!(buffer_b.text(), "free");
    }
}
