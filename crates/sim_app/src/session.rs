//! One networked session: the blocking dispatch loop next to the inbound and
//! outbound NATS bridge tasks.
//!
//! [`supervise`] waits on all three. Whichever side ends first decides how
//! the others are shut down:
//!
//! - dispatch ends (`quit` or an error): outbound flushes and stops, inbound
//!   is aborted.
//! - inbound ends: the dispatch loop is stopped and outbound flushes. An
//!   inbound task never ends on its own, so this is always an error.
//! - outbound fails: the dispatch loop is stopped and inbound is aborted.

use anyhow::{Result, anyhow};
use sim_net::NetError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::dispatch::{DispatchLoop, DispatchSummary, MessageValidator};

/// A spawned bridge task.
pub type BridgeTask = JoinHandle<Result<(), NetError>>;

/// Run `dispatch` on the blocking pool and supervise it together with the
/// bridge tasks. `shutdown` tells the outbound task to flush and return.
///
/// # Errors
///
/// Returns the dispatch error, the first bridge error, or an error if the
/// inbound subscription closed.
pub async fn supervise<V>(
    mut dispatch: DispatchLoop<V>,
    mut inbound: BridgeTask,
    mut outbound: BridgeTask,
    shutdown: watch::Sender<bool>,
) -> Result<DispatchSummary>
where
    V: MessageValidator + 'static,
{
    let stop = dispatch.stop_handle();
    let mut running = tokio::task::spawn_blocking(move || dispatch.run());

    tokio::select! {
        joined = &mut running => {
            let result = joined?;
            signal_shutdown(&shutdown);
            inbound.abort();
            let flushed = outbound.await?;
            let summary = result?;
            flushed?;
            Ok(summary)
        }
        joined = &mut inbound => {
            let err = match joined {
                Ok(Ok(())) => anyhow!("inbound subscription closed"),
                Ok(Err(e)) => e.into(),
                Err(e) => e.into(),
            };
            error!(error = %err, "inbound bridge stopped, ending dispatch");
            stop.request_stop();
            signal_shutdown(&shutdown);
            let summary = running.await??;
            if let Err(e) = outbound.await? {
                warn!(error = %e, "outbound flush failed during shutdown");
            }
            info!(processed = summary.processed, "dispatch stopped after inbound failure");
            Err(err)
        }
        joined = &mut outbound => {
            let err = match joined {
                Ok(Ok(())) => anyhow!("outbound bridge stopped before dispatch"),
                Ok(Err(e)) => e.into(),
                Err(e) => e.into(),
            };
            error!(error = %err, "outbound bridge stopped, ending dispatch");
            stop.request_stop();
            inbound.abort();
            let summary = running.await??;
            info!(processed = summary.processed, "dispatch stopped after outbound failure");
            Err(err)
        }
    }
}

fn signal_shutdown(shutdown: &watch::Sender<bool>) {
    if shutdown.send(true).is_err() {
        warn!("outbound bridge already stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use sim_kernel::KernelConfig;
    use sim_net::{CommandQueues, Message};

    use super::*;
    use crate::build_kernel;
    use crate::dispatch::DispatchConfig;

    const LONG_WAIT: Duration = Duration::from_secs(10);

    fn dispatch() -> (DispatchLoop, Arc<CommandQueues>, sim_component::Entity) {
        let (kernel, factions) = build_kernel(KernelConfig::new(), 1, 1_000.0).unwrap();
        let queues = Arc::new(CommandQueues::new());
        queues.register_faction(factions[0]);
        let config = DispatchConfig {
            idle_wait: LONG_WAIT,
            ..DispatchConfig::default()
        };
        (
            DispatchLoop::new(kernel, Arc::clone(&queues), config),
            queues,
            factions[0],
        )
    }

    fn outbound_until_shutdown(mut rx: watch::Receiver<bool>) -> BridgeTask {
        tokio::spawn(async move {
            while !*rx.borrow() {
                if rx.changed().await.is_err() {
                    break;
                }
            }
            Ok(())
        })
    }

    fn inbound_forever() -> BridgeTask {
        tokio::spawn(std::future::pending::<Result<(), NetError>>())
    }

    #[tokio::test]
    async fn test_quit_shuts_bridges_down() {
        let (dispatch, queues, faction) = dispatch();
        queues.push_inbound(faction, Message::quit()).unwrap();
        let (tx, rx) = watch::channel(false);

        let summary = supervise(dispatch, inbound_forever(), outbound_until_shutdown(rx), tx)
            .await
            .unwrap();
        assert_eq!(summary.processed, 1);
    }

    #[tokio::test]
    async fn test_inbound_error_stops_dispatch() {
        let (dispatch, _queues, _faction) = dispatch();
        let (tx, rx) = watch::channel(false);
        let inbound: BridgeTask = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err(NetError::MalformedSubject("sim.bogus".into()))
        });

        let start = Instant::now();
        let err = supervise(dispatch, inbound, outbound_until_shutdown(rx), tx)
            .await
            .unwrap_err();

        assert!(start.elapsed() < LONG_WAIT);
        assert!(matches!(
            err.downcast_ref::<NetError>(),
            Some(NetError::MalformedSubject(subject)) if subject == "sim.bogus"
        ));
    }

    #[tokio::test]
    async fn test_closed_subscription_is_an_error() {
        let (dispatch, _queues, _faction) = dispatch();
        let (tx, rx) = watch::channel(false);
        let inbound: BridgeTask = tokio::spawn(async { Ok(()) });

        let err = supervise(dispatch, inbound, outbound_until_shutdown(rx), tx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("subscription closed"));
    }

    #[tokio::test]
    async fn test_outbound_error_stops_dispatch() {
        let (dispatch, _queues, faction) = dispatch();
        let (tx, _rx) = watch::channel(false);
        let outbound: BridgeTask = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err(NetError::UnknownFaction(faction))
        });

        let start = Instant::now();
        let err = supervise(dispatch, inbound_forever(), outbound, tx)
            .await
            .unwrap_err();

        assert!(start.elapsed() < LONG_WAIT);
        assert!(matches!(
            err.downcast_ref::<NetError>(),
            Some(NetError::UnknownFaction(f)) if *f == faction
        ));
    }
}
