//! Long-lived cooperative tasks and the supervisor that owns their lifetime.

mod heartbeat;
mod rcon;
mod server_status;

pub use heartbeat::HeartbeatPublisher;
pub use rcon::{rcon_service_name, RconService};
pub use server_status::{ServerStatus, ServerStatusService};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The service asks to be restarted after `recovery_delay` instead of
    /// being torn down.
    #[error("recoverable failure (restart in {recovery_delay:?}): {source}")]
    Recoverable {
        recovery_delay: Duration,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn recoverable(source: impl Into<anyhow::Error>, recovery_delay: Duration) -> Self {
        Self::Recoverable {
            recovery_delay,
            source: source.into(),
        }
    }
}

/// A named long-running unit hosted by the [`ServiceSupervisor`].
///
/// `launch` must observe `cancel` at every suspension point and return
/// promptly once it fires; cleanup that has to happen on any exit belongs in
/// `launch` itself (before returning) or in `stop`.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    fn name(&self) -> String;

    async fn launch(&self, cancel: CancellationToken) -> Result<(), ServiceError>;

    async fn stop(&self) {}
}

struct SupervisedService {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// Launches services as independently scheduled tasks, restarts them on
/// recoverable failures and guarantees `stop()` runs exactly once per launch.
#[derive(Clone, Default)]
pub struct ServiceSupervisor {
    services: Arc<Mutex<HashMap<String, SupervisedService>>>,
}

impl ServiceSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `service` under its name, stopping any previous holder of that
    /// name first. With `retry_on_fail`, a recoverable error sleeps out its
    /// recovery delay and relaunches the body; any other error drops the
    /// entry.
    pub async fn launch(&self, service: Arc<dyn Service>, retry_on_fail: bool) {
        let name = service.name();
        self.stop_service(&name).await;

        let cancel = CancellationToken::new();
        let run_token = cancel.clone();
        let services = Arc::clone(&self.services);
        let task_name = name.clone();

        // Hold the body until the entry is registered, so the task's final
        // self-removal cannot race the insert below.
        let (registered_tx, registered_rx) = oneshot::channel::<()>();
        let join = tokio::spawn(async move {
            if registered_rx.await.is_err() {
                return;
            }
            loop {
                match service.launch(run_token.child_token()).await {
                    Ok(()) => break,
                    Err(ServiceError::Recoverable {
                        recovery_delay,
                        source,
                    }) if retry_on_fail && !run_token.is_cancelled() => {
                        log::warn!(
                            "service `{task_name}` failed ({source:#}), restarting in {recovery_delay:?}"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(recovery_delay) => {}
                            _ = run_token.cancelled() => break,
                        }
                    }
                    Err(err) => {
                        log::error!("service `{task_name}` terminated: {err:#}");
                        break;
                    }
                }
            }
            service.stop().await;
            services.lock().remove(&task_name);
            log::info!("service `{task_name}` stopped");
        });

        self.services
            .lock()
            .insert(name, SupervisedService { cancel, join });
        let _ = registered_tx.send(());
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.services.lock().contains_key(name)
    }

    /// Cancels one service and waits for its stop hook. Unknown names are a
    /// logged no-op.
    pub async fn stop_service(&self, name: &str) {
        let entry = self.services.lock().remove(name);
        let Some(entry) = entry else {
            log::debug!("stop requested for unknown service `{name}`");
            return;
        };
        entry.cancel.cancel();
        if let Err(err) = entry.join.await {
            if err.is_panic() {
                log::error!("service `{name}` panicked: {err}");
            }
        }
    }

    /// Cancels every supervised service and waits for all of them.
    pub async fn stop_all(&self) {
        let entries: Vec<(String, SupervisedService)> =
            self.services.lock().drain().collect();
        for (_, entry) in &entries {
            entry.cancel.cancel();
        }
        for (name, entry) in entries {
            if let Err(err) = entry.join.await {
                if err.is_panic() {
                    log::error!("service `{name}` panicked: {err}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    struct FlakyService {
        launches: AtomicU32,
        stops: AtomicU32,
        fail_first: bool,
        last_launch: Mutex<Option<Instant>>,
        restart_gap: Mutex<Option<Duration>>,
    }

    impl FlakyService {
        fn new(fail_first: bool) -> Arc<Self> {
            Arc::new(Self {
                launches: AtomicU32::new(0),
                stops: AtomicU32::new(0),
                fail_first,
                last_launch: Mutex::new(None),
                restart_gap: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Service for FlakyService {
        fn name(&self) -> String {
            "flaky".to_owned()
        }

        async fn launch(&self, _cancel: CancellationToken) -> Result<(), ServiceError> {
            let launch_num = self.launches.fetch_add(1, Ordering::SeqCst);
            let now = Instant::now();
            if let Some(previous) = self.last_launch.lock().replace(now) {
                *self.restart_gap.lock() = Some(now - previous);
            }
            if self.fail_first && launch_num == 0 {
                return Err(ServiceError::recoverable(
                    std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stream cut"),
                    Duration::from_millis(50),
                ));
            }
            Ok(())
        }

        async fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct BlockingService {
        stops: AtomicU32,
    }

    #[async_trait]
    impl Service for BlockingService {
        fn name(&self) -> String {
            "blocking".to_owned()
        }

        async fn launch(&self, cancel: CancellationToken) -> Result<(), ServiceError> {
            cancel.cancelled().await;
            Ok(())
        }

        async fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn wait_until_stopped(supervisor: &ServiceSupervisor, name: &str) {
        while supervisor.is_running(name) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restarts_after_recoverable_failure() {
        let supervisor = ServiceSupervisor::new();
        let service = FlakyService::new(true);

        supervisor.launch(service.clone(), true).await;
        wait_until_stopped(&supervisor, "flaky").await;

        assert_eq!(service.launches.load(Ordering::SeqCst), 2);
        assert_eq!(service.stops.load(Ordering::SeqCst), 1);
        let gap = (*service.restart_gap.lock()).expect("restarted once");
        assert!(gap >= Duration::from_millis(50), "restart gap was {gap:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn recoverable_failure_without_retry_drops_the_service() {
        let supervisor = ServiceSupervisor::new();
        let service = FlakyService::new(true);

        supervisor.launch(service.clone(), false).await;
        wait_until_stopped(&supervisor, "flaky").await;

        assert_eq!(service.launches.load(Ordering::SeqCst), 1);
        assert_eq!(service.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn normal_exit_runs_stop_once_and_unregisters() {
        let supervisor = ServiceSupervisor::new();
        let service = FlakyService::new(false);

        supervisor.launch(service.clone(), true).await;
        wait_until_stopped(&supervisor, "flaky").await;

        assert_eq!(service.launches.load(Ordering::SeqCst), 1);
        assert_eq!(service.stops.load(Ordering::SeqCst), 1);
        assert!(!supervisor.is_running("flaky"));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_service_cancels_a_running_service() {
        let supervisor = ServiceSupervisor::new();
        let service = Arc::new(BlockingService {
            stops: AtomicU32::new(0),
        });

        supervisor.launch(service.clone(), true).await;
        assert!(supervisor.is_running("blocking"));

        supervisor.stop_service("blocking").await;
        assert!(!supervisor.is_running("blocking"));
        assert_eq!(service.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_service_on_unknown_name_is_a_no_op() {
        let supervisor = ServiceSupervisor::new();
        supervisor.stop_service("missing").await;
    }

    #[tokio::test(start_paused = true)]
    async fn relaunching_a_name_stops_the_previous_instance() {
        let supervisor = ServiceSupervisor::new();
        let first = Arc::new(BlockingService {
            stops: AtomicU32::new(0),
        });
        let second = Arc::new(BlockingService {
            stops: AtomicU32::new(0),
        });

        supervisor.launch(first.clone(), true).await;
        supervisor.launch(second.clone(), true).await;

        assert_eq!(first.stops.load(Ordering::SeqCst), 1);
        assert_eq!(second.stops.load(Ordering::SeqCst), 0);
        assert!(supervisor.is_running("blocking"));

        supervisor.stop_all().await;
        assert_eq!(second.stops.load(Ordering::SeqCst), 1);
        assert!(!supervisor.is_running("blocking"));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_stops_everything() {
        let supervisor = ServiceSupervisor::new();
        let blocking = Arc::new(BlockingService {
            stops: AtomicU32::new(0),
        });
        supervisor.launch(blocking.clone(), true).await;
        supervisor.stop_all().await;
        assert_eq!(blocking.stops.load(Ordering::SeqCst), 1);
    }
}
