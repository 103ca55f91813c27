//! Fatal assertions.
//!
//! `ave_check!` and friends are always on; the `ave_dcheck!` family only
//! fires when [`DCHECK_IS_ON`]. A failed check logs through `tracing`,
//! prints the report to stderr and aborts the process. There is no
//! recoverable path.

use std::io::Write as _;

/// True in debug builds or with the `dcheck-always-on` feature.
pub const DCHECK_IS_ON: bool = cfg!(any(debug_assertions, feature = "dcheck-always-on"));

#[cold]
#[inline(never)]
pub fn fatal(file: &str, line: u32, message: &str) -> ! {
    let report = fatal_report(file, line, message);
    tracing::error!(file, line, "{message}");
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{report}");
    let _ = stderr.flush();
    std::process::abort()
}

#[cold]
#[inline(never)]
pub fn fatal_check_op(
    file: &str,
    line: u32,
    expression: &str,
    lhs: &dyn std::fmt::Debug,
    rhs: &dyn std::fmt::Debug,
    extra: Option<std::fmt::Arguments<'_>>,
) -> ! {
    let mut message = format!("Check failed: {expression} ({lhs:?} vs. {rhs:?})");
    if let Some(extra) = extra {
        message.push_str("\n# ");
        message.push_str(&extra.to_string());
    }
    fatal(file, line, &message)
}

fn fatal_report(file: &str, line: u32, message: &str) -> String {
    format!("\n\n#\n# Fatal error in: {file}, line {line}\n# {message}\n#")
}

#[macro_export]
macro_rules! ave_check {
    ($cond:expr $(,)?) => {
        if !$cond {
            $crate::checks::fatal(
                file!(),
                line!(),
                concat!("Check failed: ", stringify!($cond)),
            )
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::checks::fatal(
                file!(),
                line!(),
                &format!(
                    "{}\n# {}",
                    concat!("Check failed: ", stringify!($cond)),
                    format_args!($($arg)+)
                ),
            )
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! ave_check_op {
    ($op:tt, $lhs:expr, $rhs:expr $(,)?) => {
        match (&$lhs, &$rhs) {
            (lhs, rhs) => {
                if !(*lhs $op *rhs) {
                    $crate::checks::fatal_check_op(
                        file!(),
                        line!(),
                        concat!(stringify!($lhs), " ", stringify!($op), " ", stringify!($rhs)),
                        lhs,
                        rhs,
                        None,
                    )
                }
            }
        }
    };
    ($op:tt, $lhs:expr, $rhs:expr, $($arg:tt)+) => {
        match (&$lhs, &$rhs) {
            (lhs, rhs) => {
                if !(*lhs $op *rhs) {
                    $crate::checks::fatal_check_op(
                        file!(),
                        line!(),
                        concat!(stringify!($lhs), " ", stringify!($op), " ", stringify!($rhs)),
                        lhs,
                        rhs,
                        Some(format_args!($($arg)+)),
                    )
                }
            }
        }
    };
}

#[macro_export]
macro_rules! ave_check_eq {
    ($($arg:tt)+) => { $crate::ave_check_op!(==, $($arg)+) };
}

#[macro_export]
macro_rules! ave_check_ne {
    ($($arg:tt)+) => { $crate::ave_check_op!(!=, $($arg)+) };
}

#[macro_export]
macro_rules! ave_check_lt {
    ($($arg:tt)+) => { $crate::ave_check_op!(<, $($arg)+) };
}

#[macro_export]
macro_rules! ave_check_le {
    ($($arg:tt)+) => { $crate::ave_check_op!(<=, $($arg)+) };
}

#[macro_export]
macro_rules! ave_check_gt {
    ($($arg:tt)+) => { $crate::ave_check_op!(>, $($arg)+) };
}

#[macro_export]
macro_rules! ave_check_ge {
    ($($arg:tt)+) => { $crate::ave_check_op!(>=, $($arg)+) };
}

#[macro_export]
macro_rules! ave_dcheck {
    ($($arg:tt)+) => {
        if $crate::checks::DCHECK_IS_ON {
            $crate::ave_check!($($arg)+)
        }
    };
}

#[macro_export]
macro_rules! ave_notreached {
    () => {
        $crate::checks::fatal(file!(), line!(), "NOTREACHED")
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_checks_fall_through() {
        let queue_len = 3_usize;
        crate::ave_check!(queue_len > 0);
        crate::ave_check!(queue_len == 3, "queue has {} entries", queue_len);
        crate::ave_check_eq!(queue_len, 3);
        crate::ave_check_ne!(queue_len, 4, "unexpected length");
        crate::ave_check_lt!(queue_len, 4);
        crate::ave_check_le!(queue_len, 3);
        crate::ave_check_gt!(queue_len, 2);
        crate::ave_check_ge!(queue_len, 3);
        crate::ave_dcheck!(queue_len != 0);
    }

    #[test]
    fn report_names_location_and_message() {
        let report = fatal_report("task_runner.rs", 42, "Check failed: quit");
        assert!(report.contains("# Fatal error in: task_runner.rs, line 42"));
        assert!(report.contains("# Check failed: quit"));
    }

    #[test]
    fn dcheck_follows_build_profile() {
        assert_eq!(
            DCHECK_IS_ON,
            cfg!(debug_assertions) || cfg!(feature = "dcheck-always-on")
        );
    }
}
