pub mod driver;
pub mod engine;
pub mod heartbeat;

pub use driver::{Driver, HardwareDriver};
pub use engine::{ControlEngine, ControlHandle, EngineParams};
pub use heartbeat::{Heartbeat, ProcessHeartbeat};
