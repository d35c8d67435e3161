//! 控制面：命令、实例生命周期与自由运行

pub mod command;
pub mod instance;
pub mod session;

pub use command::{Command, RunMode, RunOutcome, StopCondition};
pub use instance::Instance;
pub use session::Session;
