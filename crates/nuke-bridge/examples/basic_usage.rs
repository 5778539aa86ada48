//! Basic usage example - run a snippet inside a running Nuke session

use nuke_bridge::{MemorySink, RemoteExecService, Result, Settings, TracingNotifier};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Get code from args or print the Nuke version
    let code = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "print(nuke.NUKE_VERSION_STRING)".to_string());

    let sink = Arc::new(MemorySink::new());
    let service = RemoteExecService::new(Settings::default(), sink.clone(), Arc::new(TracingNotifier));

    println!("Sending to {}", service.resolve().address);
    service.run_code("", code).await?;

    for line in sink.lines() {
        println!("  {}", line);
    }

    Ok(())
}
