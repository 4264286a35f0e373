pub mod command;
pub mod command_bus;
pub mod command_handler;
pub mod context;
pub mod domain_event_dispatcher;
pub mod domain_event_handler;
pub mod domain_event_registry;
pub mod error;
pub mod handler_scope;
pub mod inmemory_command_bus;
pub mod inmemory_query_bus;
pub mod query;
pub mod query_bus;
pub mod query_handler;

pub use domain_event_dispatcher::DomainEventDispatcher;
pub use domain_event_registry::{
    DomainEventRegistry, DomainEventRegistryBuilder, EventDispatchTable, FrozenEventRegistry,
};
pub use handler_scope::{HandlerCollection, HandlerScope, HandlerScopeExt};
pub use inmemory_command_bus::InMemoryCommandBus;
pub use inmemory_query_bus::InMemoryQueryBus;
