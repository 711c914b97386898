use futures::stream::StreamExt;
use signal_hook_tokio::Signals;
use tokio_util::sync::CancellationToken;

/// Cancels `cancel_token` when one of `signals` arrives, until `done` fires.
/// Jobs already running are not interrupted; the scheduler only stops
/// admitting new ones. A second signal falls back to its default action.
pub async fn watch(signals: Vec<i32>, cancel_token: CancellationToken, done: CancellationToken) {
    if signals.is_empty() {
        return;
    }

    let mut stream = match Signals::new(&signals) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!("Failed to install signal handlers: {}", e);
            return;
        }
    };
    let handle = stream.handle();

    let listen = async {
        let mut requested = false;
        while let Some(signal) = stream.next().await {
            if requested {
                tracing::warn!(signal, "Second shutdown signal, exiting without waiting");
                if let Err(e) = signal_hook::low_level::emulate_default_handler(signal) {
                    tracing::error!("Failed to apply default signal action: {}", e);
                }
                continue;
            }
            requested = true;
            tracing::info!(signal, "Shutdown requested, finishing running jobs");
            cancel_token.cancel();
        }
    };

    tokio::select! {
        _ = listen => {}
        _ = done.cancelled() => {}
    }

    handle.close();
}
