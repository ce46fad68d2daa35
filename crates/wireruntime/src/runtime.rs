use crate::memory::Stores;
use crate::orchestrator::{ExecutionResult, Orchestrator};
use crate::registry::ExecutorRegistry;
use std::sync::Arc;
use wirecore::events::ChannelSubscription;
use wirecore::{EventBus, EventSink, ExecutionEvent, FlowError, RunEvent, Workflow};

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Extra attempts after the first one for retriable failures
    pub max_retries: u32,
    /// First back-off delay, doubled on every further attempt
    pub retry_base_delay_ms: u64,
    pub event_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_ms: 1000,
            event_buffer_size: 1000,
        }
    }
}

/// Main entry point: an orchestrator wired to an event bus
pub struct WireRuntime {
    orchestrator: Orchestrator,
    event_bus: Arc<EventBus>,
}

impl WireRuntime {
    /// Runtime with volatile stores
    pub fn new(registry: ExecutorRegistry) -> Self {
        Self::builder(registry).build()
    }

    pub fn builder(registry: ExecutorRegistry) -> WireRuntimeBuilder {
        WireRuntimeBuilder {
            registry,
            stores: None,
            config: RuntimeConfig::default(),
            forwarders: Vec::new(),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn stores(&self) -> &Stores {
        self.orchestrator.stores()
    }

    pub fn registry(&self) -> &Arc<ExecutorRegistry> {
        self.orchestrator.registry()
    }

    pub async fn register_workflow(&self, workflow: &Workflow) -> Result<(), FlowError> {
        self.stores().workflows.save_workflow(workflow).await?;
        Ok(())
    }

    pub async fn run(&self, event: RunEvent) -> Result<ExecutionResult, FlowError> {
        self.orchestrator.run(event).await
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn subscribe_channel(&self, channel: impl Into<String>) -> ChannelSubscription {
        self.event_bus.subscribe_channel(channel)
    }

    /// Get the event bus for direct access
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

pub struct WireRuntimeBuilder {
    registry: ExecutorRegistry,
    stores: Option<Stores>,
    config: RuntimeConfig,
    forwarders: Vec<Arc<dyn EventSink>>,
}

impl WireRuntimeBuilder {
    pub fn stores(mut self, stores: Stores) -> Self {
        self.stores = Some(stores);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Mirror every event to an additional sink
    pub fn forward_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.forwarders.push(sink);
        self
    }

    pub fn build(self) -> WireRuntime {
        let event_bus = self
            .forwarders
            .into_iter()
            .fold(EventBus::new(self.config.event_buffer_size), |bus, sink| {
                bus.with_forwarder(sink)
            });
        let event_bus = Arc::new(event_bus);

        let orchestrator = Orchestrator::new(
            Arc::new(self.registry),
            self.stores.unwrap_or_else(Stores::in_memory),
            event_bus.clone(),
            self.config,
        );

        WireRuntime {
            orchestrator,
            event_bus,
        }
    }
}
