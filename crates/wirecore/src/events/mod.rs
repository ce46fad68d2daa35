mod base;
mod iggy_bus;

pub use base::{
    ChannelSubscription, EventBus, EventSink, ExecutionEvent, NodeStatus, StatusData,
    StatusEmitter, StatusMessage, STATUS_TOPIC,
};
pub use iggy_bus::{
    IggyEventBus, IggyEventBusConfig, IggyEventBusError, IggyEventSubscription, IggyForwarder,
};
