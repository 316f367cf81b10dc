use crate::application::booking_state::BookingStateStore;
use crate::domain::service::{BookingStep, ServiceType};
use tracing::debug;

/// How a navigation request was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    /// Regular navigation; accessibility is enforced.
    Guarded,
    /// An explicit "go back" action; never blocked.
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Navigate to the requested step.
    Proceed(BookingStep),
    /// The requested step is not reachable yet; stay on (or return to) this one.
    Redirect(BookingStep),
}

impl NavigationDecision {
    pub fn step(&self) -> BookingStep {
        match self {
            NavigationDecision::Proceed(step) | NavigationDecision::Redirect(step) => *step,
        }
    }
}

/// Answers "may the user go to step X" for a service's flow.
///
/// Steps that do not belong to the service resolve to its first step.
/// Nothing here performs I/O beyond reading the injected booking state.
#[derive(Clone)]
pub struct FlowNavigator {
    state: BookingStateStore,
}

impl FlowNavigator {
    pub fn new(state: BookingStateStore) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &BookingStateStore {
        &self.state
    }

    /// Maps a raw step name onto `service`'s graph, falling back to its first step.
    pub fn resolve_step(&self, service: ServiceType, raw: &str) -> BookingStep {
        let graph = service.step_graph();
        BookingStep::from_name(raw)
            .filter(|step| graph.contains(*step))
            .unwrap_or_else(|| graph.first())
    }

    fn index(service: ServiceType, step: BookingStep) -> usize {
        service.step_graph().index_of(step).unwrap_or(0)
    }

    /// Earlier steps and the current one are always reachable. The step right
    /// after `current` is reachable once `current` has its required data.
    /// Anything further ahead is not.
    pub fn is_step_accessible(&self, target: BookingStep, current: BookingStep, service: ServiceType) -> bool {
        let target_index = Self::index(service, target);
        let current_index = Self::index(service, current);

        if target_index <= current_index {
            return true;
        }

        let current = service
            .step_graph()
            .get(current_index)
            .unwrap_or(current);
        target_index == current_index + 1 && self.state.has_required_data_for_step(current, service)
    }

    pub fn next_step(&self, current: BookingStep, service: ServiceType) -> Option<BookingStep> {
        service.step_graph().get(Self::index(service, current) + 1)
    }

    pub fn previous_step(&self, current: BookingStep, service: ServiceType) -> Option<BookingStep> {
        Self::index(service, current)
            .checked_sub(1)
            .and_then(|index| service.step_graph().get(index))
    }

    /// Position of `current` along the flow, from 0 (first step) to 100 (last).
    pub fn progress_percentage(&self, current: BookingStep, service: ServiceType) -> u8 {
        let graph = service.step_graph();
        if graph.len() <= 1 {
            return 0;
        }
        let ratio = Self::index(service, current) as f64 / (graph.len() - 1) as f64;
        (ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }

    /// Decides where a navigation request should land.
    ///
    /// Back navigation to the current or an earlier step is never blocked by
    /// missing data; a `Back` request pointing forward is guarded like any
    /// other. Navigation to an inaccessible step redirects to the current step.
    pub fn navigate(
        &self,
        target: BookingStep,
        current: BookingStep,
        service: ServiceType,
        mode: NavigationMode,
    ) -> NavigationDecision {
        let graph = service.step_graph();
        let target = if graph.contains(target) { target } else { graph.first() };
        let current = if graph.contains(current) { current } else { graph.first() };

        let backwards = graph.index_of(target) <= graph.index_of(current);
        if (mode == NavigationMode::Back && backwards)
            || self.is_step_accessible(target, current, service)
        {
            return NavigationDecision::Proceed(target);
        }

        debug!(service = %service, target = %target, current = %current, "navigation blocked");
        NavigationDecision::Redirect(current)
    }

    /// Go to the previous step, if any. Never blocked.
    pub fn go_back(&self, current: BookingStep, service: ServiceType) -> Option<BookingStep> {
        let previous = self.previous_step(current, service)?;
        Some(
            self.navigate(previous, current, service, NavigationMode::Back)
                .step(),
        )
    }
}
