//! User-facing input channels.

mod repl;

pub use self::repl::run_repl;
