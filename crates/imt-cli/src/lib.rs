//! Command implementations behind the `imtool` binary.

pub mod commands;
pub mod corpus;
pub mod trace_init;

/// Unwrap `$result` or print the message (with the error as the last
/// `{}`) and exit with status 1.
#[macro_export]
macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            std::process::exit(1);
        })
    };
}
