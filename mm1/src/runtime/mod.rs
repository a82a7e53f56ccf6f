/// Completion annotator stage.
mod annotate;
/// Arrival generator stage.
mod arrival;
/// Single-server processor stage.
mod service;
/// Broadcast shutdown signaling.
pub mod shutdown;
/// Shared stage plumbing: buffer hand-off, timer waits, task accounting.
pub mod stage;
/// Output stream handed to consumers.
pub mod stream;
/// Lifecycle controller owning the buffers and tasks.
pub mod supervisor;

pub use shutdown::ShutdownToken;
pub use stage::{StageKind, StageReport};
pub use stream::JobStream;
pub use supervisor::{LifecycleState, Mm1Queue};
