//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// The filter comes from `PARLEY_LOG`, then `RUST_LOG`, defaulting to `warn`
/// (`debug` with `--verbose`). `PARLEY_LOG_FORMAT=json` switches to JSON lines.
/// Logs go to stderr so stdout only carries model output.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = std::env::var("PARLEY_LOG")
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_level));

    let json = std::env::var("PARLEY_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
