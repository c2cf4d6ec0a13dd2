//! Logging setup and a per-run database query counter.

use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Context as _;
use tracing::{span::Id, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::Context, registry::LookupSpan, EnvFilter, Layer};

static DB_QUERY_COUNT: AtomicU32 = AtomicU32::new(0);

/// Number of `db.query` spans opened since startup.
pub fn query_count() -> u32 {
    DB_QUERY_COUNT.load(Ordering::Relaxed)
}

/// A tracing Layer that counts `db.query` spans.
pub struct DbQueryCountingLayer;

impl<S> Layer<S> for DbQueryCountingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, _attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        if span.name() == "db.query" {
            DB_QUERY_COUNT.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays JSON.
///
/// `RUST_LOG` wins; otherwise `info`, or `debug` for our crates when verbose.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose {
        "info,recipal_core=debug,recipal_cli=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .context("build log filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(DbQueryCountingLayer)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
