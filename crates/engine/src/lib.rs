//! Workflow orchestration layer for Fuelgate.
//!
//! This crate wires the pure core logic to its collaborators behind
//! narrow trait contracts and owns the transactional boundary:
//!
//! - `store` - Instance persistence contract and the in-memory store
//! - `registry` - Definition lookup contract, variant selection, fallback
//! - `gateway` - Read-only contract to the source transaction systems
//! - `notify` - Outbound notification and domain-event contract
//! - `manager` - The `WorkflowEngine`: submit, act, cancel, queries
//! - `bulk` - Bulk action coordination with per-instance failure isolation
//! - `sweeper` - SLA sweep and the recurring sweeper task
//!
//! Collaborators are explicit dependency structs passed into the engine
//! constructor; there is no service container.

pub mod bulk;
pub mod gateway;
pub mod manager;
pub mod notify;
pub mod registry;
pub mod store;
pub mod sweeper;

pub use bulk::{BulkActionItem, BulkActionReport};
pub use gateway::{InMemoryTransactionGateway, TransactionGateway, TransactionSnapshot};
pub use manager::{EngineDependencies, SubmitRequest, WorkflowEngine};
pub use notify::{
    NotificationEmitter, NotificationKind, NotificationRequest, TracingEmitter, WorkflowEvent,
};
pub use registry::{
    DefinitionRegistry, DefinitionResolver, DefinitionSelector, InMemoryDefinitionRegistry,
};
pub use store::{InMemoryInstanceStore, InstanceStore};
pub use sweeper::SweeperTask;
