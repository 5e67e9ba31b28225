use tracing::{Dispatch, Level};

/// Human-readable logs on stderr. stdout is reserved for the metrics line.
pub fn dispatch(verbose: bool) -> Dispatch {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(level)
        .finish();
    Dispatch::new(subscriber)
}
