use std::sync::Arc;

use cadence_types::PipelineEvent;

/// Receives pipeline events. Registered when the pipeline is built and
/// invoked on the executor thread, so implementations must not block.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

impl<F> PipelineObserver for F
where
    F: Fn(&PipelineEvent) + Send + Sync,
{
    fn on_event(&self, event: &PipelineEvent) {
        self(event)
    }
}

#[derive(Default, Clone)]
pub(crate) struct ObserverList {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl ObserverList {
    pub(crate) fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }

    pub(crate) fn notify(&self, event: &PipelineEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
