use async_trait::async_trait;
use fortwatch_engine::Result;
use fortwatch_engine::WebhookTransport;
use fortwatch_wire::WebhookMessage;
use serde::Serialize;
use std::io::Write;

/// Writes each webhook batch to stdout as one JSON line instead of posting it.
pub struct StdoutTransport;

#[derive(Serialize)]
struct BatchLine<'a> {
    url: &'a str,
    batch: &'a [WebhookMessage],
}

#[async_trait]
impl WebhookTransport for StdoutTransport {
    async fn send(&self, url: &str, batch: &[WebhookMessage]) -> Result<()> {
        let line = serde_json::to_string(&BatchLine { url, batch })?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}")?;
        Ok(())
    }
}
