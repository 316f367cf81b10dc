use crate::application::polling::{SessionEvent, poll_session};
use crate::domain::ports::PaymentVerifierRef;
use crate::domain::service::ServiceType;
use crate::domain::verification::{
    VerificationId, VerificationOptions, VerificationOutcome, VerificationRequest,
    VerificationResponse, VerificationStatus,
};
use crate::error::{FlowError, Result};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// How many finished sessions keep their terminal status queryable.
const STATUS_HISTORY_LIMIT: usize = 256;

type SuccessFn = Box<dyn FnOnce(Value) + Send>;
type FailureFn = Box<dyn FnOnce(String) + Send>;
type TimeoutFn = Box<dyn FnOnce() + Send>;

enum Notify {
    Callbacks {
        on_success: SuccessFn,
        on_failure: FailureFn,
        on_timeout: TimeoutFn,
    },
    Channel(oneshot::Sender<VerificationOutcome>),
}

/// Receives the terminal outcome of one session.
///
/// Exactly one of the three is invoked, once, and only if the session
/// reaches a terminal state. A cancelled or displaced session invokes none.
/// Callbacks run on the registry task, so they should return quickly. A
/// panicking callback is logged and does not affect other sessions.
pub struct VerificationCallbacks(Notify);

impl VerificationCallbacks {
    pub fn new<S, F, T>(on_success: S, on_failure: F, on_timeout: T) -> Self
    where
        S: FnOnce(Value) + Send + 'static,
        F: FnOnce(String) + Send + 'static,
        T: FnOnce() + Send + 'static,
    {
        Self(Notify::Callbacks {
            on_success: Box::new(on_success),
            on_failure: Box::new(on_failure),
            on_timeout: Box::new(on_timeout),
        })
    }

    /// Delivers the outcome through a future instead of closures.
    ///
    /// The receiver errors if the session is cancelled before it resolves.
    pub fn channel() -> (Self, oneshot::Receiver<VerificationOutcome>) {
        let (tx, rx) = oneshot::channel();
        (Self(Notify::Channel(tx)), rx)
    }

    fn fire(self, outcome: VerificationOutcome) {
        match self.0 {
            Notify::Channel(tx) => {
                let _ = tx.send(outcome);
            }
            Notify::Callbacks {
                on_success,
                on_failure,
                on_timeout,
            } => match outcome {
                VerificationOutcome::Success(result) => on_success(result),
                VerificationOutcome::Failed(message) => on_failure(message),
                VerificationOutcome::Timeout => on_timeout(),
            },
        }
    }
}

enum Command {
    Start {
        request: VerificationRequest,
        callbacks: VerificationCallbacks,
        reply: oneshot::Sender<VerificationId>,
    },
    Stop {
        id: VerificationId,
        reply: oneshot::Sender<bool>,
    },
    StopAll {
        reply: oneshot::Sender<usize>,
    },
    Status {
        id: VerificationId,
        reply: oneshot::Sender<Option<VerificationStatus>>,
    },
    LiveSessions {
        reply: oneshot::Sender<usize>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Polls an external endpoint until each payment reference resolves.
///
/// The handle is cheap to clone. All session state lives in a single
/// registry task that processes commands and poll reports one at a time,
/// so concurrent `start`/`stop` calls serialize without locks. When the last
/// handle is dropped the registry cancels every live session and exits.
#[derive(Clone)]
pub struct PaymentVerificationService {
    commands: mpsc::UnboundedSender<Command>,
}

impl PaymentVerificationService {
    /// Spawns the registry task on the current tokio runtime.
    pub fn new(verifier: PaymentVerifierRef) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();
        let registry = Registry {
            verifier,
            events,
            sessions: HashMap::new(),
            history: StatusHistory::default(),
            next_generation: 0,
        };
        tokio::spawn(registry.run(command_rx, event_rx));
        Self { commands }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| FlowError::ServiceClosed)?;
        rx.await.map_err(|_| FlowError::ServiceClosed)
    }

    /// Starts polling `request.reference`.
    ///
    /// A live session for the same reference is cancelled first without
    /// invoking its callbacks. The first check is issued immediately.
    pub async fn start_verification(
        &self,
        request: VerificationRequest,
        callbacks: VerificationCallbacks,
    ) -> Result<VerificationId> {
        if request.reference.trim().is_empty() {
            return Err(FlowError::InvalidArgument(
                "payment reference must not be empty".to_string(),
            ));
        }
        self.request(|reply| Command::Start {
            request,
            callbacks,
            reply,
        })
        .await
    }

    /// Convenience over [`start_verification`](Self::start_verification)
    /// taking the session parameters individually.
    #[allow(clippy::too_many_arguments)]
    pub async fn start<S, F, T>(
        &self,
        reference: &str,
        service: ServiceType,
        booking_id: Option<&str>,
        on_success: S,
        on_failure: F,
        on_timeout: T,
        options: VerificationOptions,
    ) -> Result<VerificationId>
    where
        S: FnOnce(Value) + Send + 'static,
        F: FnOnce(String) + Send + 'static,
        T: FnOnce() + Send + 'static,
    {
        let mut request = VerificationRequest::new(reference, service).with_options(options);
        request.booking_id = booking_id.map(str::to_string);
        self.start_verification(
            request,
            VerificationCallbacks::new(on_success, on_failure, on_timeout),
        )
        .await
    }

    /// Cancels a live session. No callback fires.
    ///
    /// Returns whether a live session was cancelled; stopping a finished or
    /// unknown session is a no-op.
    pub async fn stop_verification(&self, id: &VerificationId) -> Result<bool> {
        let id = id.clone();
        self.request(|reply| Command::Stop { id, reply }).await
    }

    /// Cancels every live session. Returns how many were cancelled.
    pub async fn stop_all_verifications(&self) -> Result<usize> {
        self.request(|reply| Command::StopAll { reply }).await
    }

    /// `Verifying` while live, the terminal status once resolved, `None` if
    /// unknown or cancelled.
    pub async fn get_status(&self, id: &VerificationId) -> Result<Option<VerificationStatus>> {
        let id = id.clone();
        self.request(|reply| Command::Status { id, reply }).await
    }

    pub async fn live_sessions(&self) -> Result<usize> {
        self.request(|reply| Command::LiveSessions { reply }).await
    }

    /// Cancels everything and stops the registry task.
    ///
    /// Every handle fails with [`FlowError::ServiceClosed`] afterwards.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}

struct Session {
    generation: u64,
    service: ServiceType,
    booking_id: Option<String>,
    started_at: Instant,
    callbacks: VerificationCallbacks,
    poller: Poller,
}

/// Aborts the poll task when its session goes away, however that happens.
struct Poller(JoinHandle<()>);

impl Drop for Poller {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Default)]
struct StatusHistory {
    statuses: HashMap<String, VerificationStatus>,
    order: VecDeque<String>,
}

impl StatusHistory {
    fn record(&mut self, reference: &str, status: VerificationStatus) {
        self.forget(reference);
        self.statuses.insert(reference.to_string(), status);
        self.order.push_back(reference.to_string());
        while self.order.len() > STATUS_HISTORY_LIMIT {
            if let Some(oldest) = self.order.pop_front() {
                self.statuses.remove(&oldest);
            }
        }
    }

    fn forget(&mut self, reference: &str) {
        if self.statuses.remove(reference).is_some() {
            self.order.retain(|r| r != reference);
        }
    }

    fn get(&self, reference: &str) -> Option<VerificationStatus> {
        self.statuses.get(reference).copied()
    }
}

/// Sole owner of the live sessions.
struct Registry {
    verifier: PaymentVerifierRef,
    events: mpsc::UnboundedSender<SessionEvent>,
    sessions: HashMap<String, Session>,
    history: StatusHistory,
    next_generation: u64,
}

impl Registry {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).is_break() {
                            break;
                        }
                    }
                    None => {
                        self.cancel_all();
                        break;
                    }
                },
                Some(event) = events.recv() => self.handle_event(event),
            }
        }
        debug!("verification registry stopped");
    }

    fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Start {
                request,
                callbacks,
                reply,
            } => {
                let id = self.start(request, callbacks);
                let _ = reply.send(id);
            }
            Command::Stop { id, reply } => {
                let _ = reply.send(self.cancel(id.as_str()));
            }
            Command::StopAll { reply } => {
                let _ = reply.send(self.cancel_all());
            }
            Command::Status { id, reply } => {
                let status = if self.sessions.contains_key(id.as_str()) {
                    Some(VerificationStatus::Verifying)
                } else {
                    self.history.get(id.as_str())
                };
                let _ = reply.send(status);
            }
            Command::LiveSessions { reply } => {
                let _ = reply.send(self.sessions.len());
            }
            Command::Shutdown { reply } => {
                self.cancel_all();
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn start(&mut self, request: VerificationRequest, callbacks: VerificationCallbacks) -> VerificationId {
        let VerificationRequest {
            reference,
            service,
            booking_id,
            options,
        } = request;

        if self.cancel(&reference) {
            info!(%reference, "replaced live verification session");
        }
        self.history.forget(&reference);

        self.next_generation += 1;
        let generation = self.next_generation;
        let id = VerificationId::from(reference.as_str());

        if options.timeout.is_zero() {
            info!(%reference, %service, generation, "verification started with no budget");
            self.history.record(&reference, VerificationStatus::Timeout);
            notify(&reference, callbacks, VerificationOutcome::Timeout);
            return id;
        }

        let poller = Poller(tokio::spawn(poll_session(
            reference.clone(),
            generation,
            options,
            self.verifier.clone(),
            self.events.clone(),
        )));

        info!(
            %reference,
            %service,
            booking_id = booking_id.as_deref().unwrap_or("-"),
            generation,
            poll_interval_ms = options.poll_interval.as_millis() as u64,
            timeout_ms = options.timeout.as_millis() as u64,
            "verification started"
        );

        self.sessions.insert(
            reference,
            Session {
                generation,
                service,
                booking_id,
                started_at: Instant::now(),
                callbacks,
                poller,
            },
        );
        id
    }

    fn cancel(&mut self, reference: &str) -> bool {
        match self.sessions.remove(reference) {
            Some(session) => {
                debug!(%reference, generation = session.generation, "verification cancelled");
                true
            }
            None => false,
        }
    }

    fn cancel_all(&mut self) -> usize {
        let count = self.sessions.len();
        self.sessions.clear();
        if count > 0 {
            info!(count, "cancelled all verification sessions");
        }
        count
    }

    fn handle_event(&mut self, event: SessionEvent) {
        let (reference, generation, outcome) = match event {
            SessionEvent::Checked {
                reference,
                generation,
                response,
            } => {
                let outcome = match response {
                    VerificationResponse::Pending => {
                        debug!(%reference, generation, "payment not yet confirmed");
                        return;
                    }
                    VerificationResponse::Success { result } => VerificationOutcome::Success(result),
                    VerificationResponse::Failure { message } => VerificationOutcome::Failed(message),
                };
                (reference, generation, outcome)
            }
            SessionEvent::Expired {
                reference,
                generation,
            } => (reference, generation, VerificationOutcome::Timeout),
        };

        let is_current = self
            .sessions
            .get(&reference)
            .is_some_and(|session| session.generation == generation);
        if !is_current {
            debug!(%reference, generation, "discarding stale verification result");
            return;
        }

        if let Some(session) = self.sessions.remove(&reference) {
            self.resolve(reference, session, outcome);
        }
    }

    /// Terminal transition. The status is recorded before the callback runs.
    fn resolve(&mut self, reference: String, session: Session, outcome: VerificationOutcome) {
        let Session {
            generation,
            service,
            booking_id,
            started_at,
            callbacks,
            poller,
        } = session;
        drop(poller);
        let status = outcome.status();
        self.history.record(&reference, status);

        info!(
            %reference,
            %service,
            booking_id = booking_id.as_deref().unwrap_or("-"),
            generation,
            ?status,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "verification finished"
        );

        notify(&reference, callbacks, outcome);
    }
}

/// Runs the caller's callback, keeping the registry alive if it panics.
fn notify(reference: &str, callbacks: VerificationCallbacks, outcome: VerificationOutcome) {
    if panic::catch_unwind(AssertUnwindSafe(|| callbacks.fire(outcome))).is_err() {
        error!(%reference, "verification callback panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::PaymentVerifier;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct AlwaysPending;

    #[async_trait]
    impl PaymentVerifier for AlwaysPending {
        async fn verify(&self, _reference: &str) -> Result<VerificationResponse> {
            Ok(VerificationResponse::Pending)
        }
    }

    struct ConfirmAfter {
        calls: AtomicUsize,
        pending: usize,
    }

    #[async_trait]
    impl PaymentVerifier for ConfirmAfter {
        async fn verify(&self, _reference: &str) -> Result<VerificationResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.pending {
                Ok(VerificationResponse::Pending)
            } else {
                Ok(VerificationResponse::Success {
                    result: json!({"call": n}),
                })
            }
        }
    }

    fn request(reference: &str, poll_ms: u64, timeout_ms: u64) -> VerificationRequest {
        VerificationRequest::new(reference, ServiceType::Hotels)
            .with_options(VerificationOptions::from_millis(poll_ms, timeout_ms))
    }

    #[tokio::test]
    async fn test_channel_receives_success() {
        let service = PaymentVerificationService::new(Arc::new(ConfirmAfter {
            calls: AtomicUsize::new(0),
            pending: 1,
        }));
        let (callbacks, outcome) = VerificationCallbacks::channel();
        let id = service
            .start_verification(request("PAY-10", 5, 1000), callbacks)
            .await
            .unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(2), outcome)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, VerificationOutcome::Success(json!({"call": 1})));
        assert_eq!(
            service.get_status(&id).await.unwrap(),
            Some(VerificationStatus::Success)
        );
        assert_eq!(service.live_sessions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_budget_times_out_without_checking() {
        let verifier = Arc::new(ConfirmAfter {
            calls: AtomicUsize::new(0),
            pending: 0,
        });
        let service = PaymentVerificationService::new(verifier.clone());
        let (callbacks, outcome) = VerificationCallbacks::channel();
        service
            .start_verification(request("PAY-0", 10, 0), callbacks)
            .await
            .unwrap();

        assert_eq!(outcome.await.unwrap(), VerificationOutcome::Timeout);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_drops_channel_without_outcome() {
        let service = PaymentVerificationService::new(Arc::new(AlwaysPending));
        let (callbacks, outcome) = VerificationCallbacks::channel();
        let id = service
            .start_verification(request("PAY-11", 5, 10_000), callbacks)
            .await
            .unwrap();

        assert!(service.stop_verification(&id).await.unwrap());
        assert!(outcome.await.is_err());
        assert_eq!(service.get_status(&id).await.unwrap(), None);
        assert!(!service.stop_verification(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_reference_is_rejected() {
        let service = PaymentVerificationService::new(Arc::new(AlwaysPending));
        let (callbacks, _outcome) = VerificationCallbacks::channel();
        let result = service.start_verification(request("  ", 5, 100), callbacks).await;
        assert!(matches!(result, Err(FlowError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_shutdown_closes_service() {
        let service = PaymentVerificationService::new(Arc::new(AlwaysPending));
        let (callbacks, _outcome) = VerificationCallbacks::channel();
        service
            .start_verification(request("PAY-12", 5, 10_000), callbacks)
            .await
            .unwrap();

        service.shutdown().await.unwrap();
        assert!(matches!(
            service.live_sessions().await,
            Err(FlowError::ServiceClosed)
        ));
    }

    #[tokio::test]
    async fn test_panicking_callback_leaves_other_sessions_controllable() {
        let verifier = Arc::new(ConfirmAfter {
            calls: AtomicUsize::new(0),
            pending: usize::MAX,
        });
        let service = PaymentVerificationService::new(verifier.clone());

        let (callbacks, _outcome) = VerificationCallbacks::channel();
        service
            .start_verification(request("PAY-20", 10, 5_000), callbacks)
            .await
            .unwrap();
        let id = service
            .start(
                "PAY-21",
                ServiceType::CarHire,
                None,
                |_| {},
                |_| {},
                || panic!("timeout handler failed"),
                VerificationOptions::from_millis(10, 30),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(
            service.get_status(&id).await.unwrap(),
            Some(VerificationStatus::Timeout)
        );
        assert_eq!(service.stop_all_verifications().await.unwrap(), 1);

        // Give aborted checks a moment to settle, then nothing more is issued.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let calls = verifier.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(verifier.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_dropping_a_session_aborts_its_poller() {
        let verifier = Arc::new(ConfirmAfter {
            calls: AtomicUsize::new(0),
            pending: usize::MAX,
        });
        let (events, _event_rx) = mpsc::unbounded_channel();
        let session = Session {
            generation: 1,
            service: ServiceType::Hotels,
            booking_id: None,
            started_at: Instant::now(),
            callbacks: VerificationCallbacks::channel().0,
            poller: Poller(tokio::spawn(poll_session(
                "PAY-22".to_string(),
                1,
                VerificationOptions::from_millis(5, 5_000),
                verifier.clone(),
                events,
            ))),
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        drop(session);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let calls = verifier.calls.load(Ordering::SeqCst);
        assert!(calls > 0);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(verifier.calls.load(Ordering::SeqCst), calls);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = StatusHistory::default();
        for i in 0..(STATUS_HISTORY_LIMIT + 10) {
            history.record(&format!("PAY-{}", i), VerificationStatus::Success);
        }
        assert_eq!(history.statuses.len(), STATUS_HISTORY_LIMIT);
        assert_eq!(history.get("PAY-0"), None);
        assert_eq!(
            history.get(&format!("PAY-{}", STATUS_HISTORY_LIMIT + 9)),
            Some(VerificationStatus::Success)
        );
    }
}
