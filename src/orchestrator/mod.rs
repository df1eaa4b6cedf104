//! 编排层：工具调用累积器与轮次驱动引擎

pub mod accumulator;
pub mod engine;

pub use accumulator::{accumulate, PassOutput, PendingToolCall};
pub use engine::{Orchestrator, DEFAULT_MAX_DEPTH};
