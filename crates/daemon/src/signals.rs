//! Graceful shutdown signal handling for the sync daemon.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

/// Shared shutdown flag checked by the scheduler loop.
pub type ShutdownFlag = Arc<AtomicBool>;

/// Create a new shutdown flag and register OS signal handlers.
///
/// On SIGTERM or SIGINT (Ctrl+C), the flag is set to `true`. Must be called
/// from within a tokio runtime.
pub fn setup_signal_handlers() -> std::io::Result<ShutdownFlag> {
    let flag = Arc::new(AtomicBool::new(false));
    let flag_clone = flag.clone();

    #[cfg(unix)]
    let mut sigterm = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate())?
    };

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        {
            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        flag_clone.store(true, Ordering::SeqCst);
    });

    Ok(flag)
}

/// Check whether the shutdown flag has been set.
pub fn is_shutdown_requested(flag: &ShutdownFlag) -> bool {
    flag.load(Ordering::SeqCst)
}

/// Set the shutdown flag by hand.
pub fn request_shutdown(flag: &ShutdownFlag) {
    flag.store(true, Ordering::SeqCst);
}
