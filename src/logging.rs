//! Logging sink for errors contained at the bridge boundary.
//!
//! All events go to the `scriptbridge` tracing target.

use tracing::error;

use crate::ScriptError;

pub(crate) const TARGET: &str = "scriptbridge";

/// Log a scripting error that will not propagate further.
///
/// The message comes first, then one event per backtrace frame when
/// `backtraces` is set.
pub fn log_script_error(context: &str, err: &ScriptError, backtraces: bool) {
    error!(target: TARGET, context, kind = %err.kind, "{}", err.message);
    if backtraces {
        for (depth, frame) in err.backtrace.iter().enumerate() {
            error!(target: TARGET, context, depth, "  at {frame}");
        }
    }
}

/// Log a panic caught while running a scripted handler.
pub(crate) fn log_contained_panic(context: &str, payload: &(dyn std::any::Any + Send)) {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned());
    error!(target: TARGET, context, "handler panicked: {message}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn captured(f: impl FnOnce()) -> String {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = capture.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn logs_message_and_backtrace() {
        let err = ScriptError::runtime_error("boom").with_frame("on_hit").with_frame("helper");
        let output = captured(|| log_script_error("OnHit", &err, true));
        assert!(output.contains("boom"));
        assert!(output.contains("at on_hit"));
        assert!(output.contains("at helper"));
    }

    #[test]
    fn backtrace_can_be_suppressed() {
        let err = ScriptError::runtime_error("boom").with_frame("on_hit");
        let output = captured(|| log_script_error("OnHit", &err, false));
        assert!(output.contains("boom"));
        assert!(!output.contains("at on_hit"));
    }

    #[test]
    fn panic_payloads() {
        let output = captured(|| log_contained_panic("OnHit", &"exploded"));
        assert!(output.contains("handler panicked: exploded"));
    }
}
