//! 错误类型
//!
//! 工具派发类故障（未知工具、参数不可解析、执行失败）一律转为 status=error 的
//! tool 消息而非向上传播；AgentError 只覆盖会终结一轮或一条连接的故障。

use thiserror::Error;

/// 编排与网关层可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    LlmError(String),

    /// 客户端已断开，当前轮次被放弃（已派发的工具调用跑完即丢弃结果）
    #[error("Turn cancelled: client disconnected")]
    Cancelled,

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Transport error: {0}")]
    TransportError(String),
}
