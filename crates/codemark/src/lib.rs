pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;

/// Install the global tracing subscriber.
///
/// Diagnostics are part of the program's contract and go to the standard
/// output stream, not stderr.
pub fn init() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stdout)
        .init();
}
