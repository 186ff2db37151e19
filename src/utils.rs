//process-wide helpers shared by every subcommand
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Install the global tracing subscriber. Call once, before any spans.
pub fn init_tracing() {
    tracing_subscriber::fmt().init();
}

/// Token that fires on ctrl-c, for graceful shutdown of servers and bots.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let tc = token.clone();
    //spawn once to listen for ctrl-c
    tokio::spawn(async move {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl+C handler");
        tc.cancel();
    });
    token
}
