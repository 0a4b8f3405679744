// Engine diagnostics: error and warning reporting with call-site metadata.
//
// Every recoverable failure in the engine (invalid index, registration on a
// missing class, hash mismatch, ...) is reported here and then degrades
// gracefully. Reports go to the `log` facade with the originating function,
// file and line, mirroring what the native interface's `print_error` hook
// receives from foreign code.
//
// Tests can observe reports without installing a logger: `capture` runs a
// closure and returns every diagnostic reported on the current thread while
// it ran. This is how "reported exactly once" properties are checked.
//
// Macros:
// - `err_print!(fmt, ...)`: report an error at the current call site.
// - `err_print_once!(fmt, ...)`: same, but only the first time this call site
//   fires for the life of the process.
// - `warn_print!(fmt, ...)`: report a warning.

use std::cell::RefCell;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    ScriptError,
}

/// One reported diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::ScriptError => "SCRIPT ERROR",
        };
        write!(
            f,
            "{label}: {}\n   at: {} ({}:{})",
            self.message, self.function, self.file, self.line
        )
    }
}

thread_local! {
    static CAPTURED: RefCell<Option<Vec<Diagnostic>>> = const { RefCell::new(None) };
}

/// Report a diagnostic. Prefer the macros, which fill in the call site.
pub fn report(severity: Severity, message: String, function: &str, file: &str, line: u32) {
    let diagnostic = Diagnostic {
        severity,
        message,
        function: function.to_owned(),
        file: file.to_owned(),
        line,
    };
    match severity {
        Severity::Error | Severity::ScriptError => log::error!("{diagnostic}"),
        Severity::Warning => log::warn!("{diagnostic}"),
    }
    CAPTURED.with(|captured| {
        if let Some(list) = captured.borrow_mut().as_mut() {
            list.push(diagnostic);
        }
    });
}

/// Run `f`, collecting every diagnostic reported on this thread meanwhile.
/// Nested captures each see only their own reports.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<Diagnostic>) {
    let outer = CAPTURED.with(|captured| captured.borrow_mut().replace(Vec::new()));
    let result = f();
    let inner = CAPTURED.with(|captured| {
        let mut slot = captured.borrow_mut();
        let inner = slot.take().unwrap_or_default();
        *slot = outer;
        inner
    });
    (result, inner)
}

#[macro_export]
macro_rules! err_print {
    ($($arg:tt)*) => {
        $crate::diag::report(
            $crate::diag::Severity::Error,
            format!($($arg)*),
            module_path!(),
            file!(),
            line!(),
        )
    };
}

#[macro_export]
macro_rules! err_print_once {
    ($($arg:tt)*) => {{
        static FIRED: ::std::sync::atomic::AtomicBool = ::std::sync::atomic::AtomicBool::new(false);
        if !FIRED.swap(true, ::std::sync::atomic::Ordering::Relaxed) {
            $crate::err_print!($($arg)*);
        }
    }};
}

#[macro_export]
macro_rules! warn_print {
    ($($arg:tt)*) => {
        $crate::diag::report(
            $crate::diag::Severity::Warning,
            format!($($arg)*),
            module_path!(),
            file!(),
            line!(),
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_collects_reports_in_order() {
        let ((), reports) = capture(|| {
            crate::err_print!("first {}", 1);
            crate::warn_print!("second");
        });
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].message, "first 1");
        assert_eq!(reports[0].severity, Severity::Error);
        assert_eq!(reports[1].severity, Severity::Warning);
        assert!(reports[0].file.ends_with("diag.rs"));
    }

    #[test]
    fn nested_capture_is_isolated() {
        let ((), outer) = capture(|| {
            crate::err_print!("outer");
            let ((), inner) = capture(|| crate::err_print!("inner"));
            assert_eq!(inner.len(), 1);
        });
        assert_eq!(outer.len(), 1);
        assert_eq!(outer[0].message, "outer");
    }

    #[test]
    fn once_fires_a_single_time_per_site() {
        let ((), reports) = capture(|| {
            for _ in 0..3 {
                crate::err_print_once!("only once");
            }
        });
        assert_eq!(reports.len(), 1);
    }
}
