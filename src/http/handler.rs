use std::future::{Future, ready};

use crate::http::exchange::Exchange;

/// Application logic invoked once per fully read request.
///
/// An implementation is expected to finalize exactly one response on the
/// [`Exchange`] before its future completes. Returning without one closes the
/// connection.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, exchange: &mut Exchange) -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl<F> Handler for F
where
    F: Fn(&mut Exchange) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn handle(&self, exchange: &mut Exchange) -> impl Future<Output = anyhow::Result<()>> + Send {
        ready(self(exchange))
    }
}
