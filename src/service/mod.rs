pub mod backend;
pub mod cancellation;
pub mod confirmation_gate; // 确认闸门
pub mod device;
pub mod discovery; // 账户发现状态机
pub mod execution; // 执行循环
pub mod work_item_builder;

pub use backend::{Backend, BackendProvider, SharedBackend};
pub use cancellation::CancellationToken;
pub use confirmation_gate::{ConfirmationGate, ConfirmationPrompt};
pub use device::DeviceCommands;
pub use discovery::{DiscoveryEngine, DiscoveryEvent, DiscoveryStatus};
pub use execution::ExecutionLoop;
pub use work_item_builder::{BuiltBundle, WorkItemBuilder};
