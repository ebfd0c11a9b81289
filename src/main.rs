use std::io::Write;

use anyhow::{Context, Result};
use phonalign_core::telemetry::init_tracing;
use phonalign_core::{CompareRequest, PipelineConfig, PipelineKernel};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::warn;

/// Reads one JSON comparison request from stdin and writes the result to
/// stdout.
#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = PipelineConfig::from_env()?;
    let kernel = PipelineKernel::with_builtins(config);

    let request = read_request(tokio::io::stdin()).await?;
    let outcome = kernel.run(request).await;

    for failure in kernel.shutdown().await {
        warn!(target: "pipeline_kernel", %failure, "shared plugin teardown failed");
    }

    let outcome = outcome?;
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &outcome.result)?;
    writeln!(stdout)?;
    Ok(())
}

async fn read_request<R: AsyncRead + Unpin>(mut reader: R) -> Result<CompareRequest> {
    let mut raw = String::new();
    reader
        .read_to_string(&mut raw)
        .await
        .context("failed to read request from stdin")?;
    serde_json::from_str(&raw).context("request is not valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_request_from_async_reader() {
        let raw = br#"{
            "audio": {"payload": {"samples": [0.0]}, "sample_rate_hz": 16000, "channels": 1, "format": "f32le"},
            "text": "p a n",
            "lang": "fr"
        }"#;
        let request = read_request(&raw[..]).await.expect("parses");
        assert_eq!(request.text, "p a n");
        assert!(request.backend.is_none());
    }

    #[tokio::test]
    async fn malformed_input_is_reported() {
        let err = read_request(&b"not json"[..]).await.expect_err("rejected");
        assert!(err.to_string().contains("not valid JSON"));
    }
}
