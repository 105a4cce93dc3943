pub mod context;
pub mod tasks;

pub use context::AppContext;
pub use tasks::SessionSweepTask;
