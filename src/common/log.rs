use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_tree::HierarchicalLayer;

/// Installs the global subscriber.
///
/// Filtering follows `RUST_LOG`, falling back to `info` for everything and
/// `debug` for this crate when `verbose` is set.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info,rift_placement=debug")
        } else {
            EnvFilter::new("warn,rift_placement=info")
        }
    });

    let tree = HierarchicalLayer::default()
        .with_indent_amount(2)
        .with_indent_lines(true)
        .with_targets(true)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when embedded in a larger process.
    let _ = tracing_subscriber::registry().with(filter).with(tree).try_init();
}
