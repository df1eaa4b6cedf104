//! 入站消息协议
//!
//! 客户端可以发裸文本，也可以发结构化信封 {message, resume_id?,
//! job_description_id?}。未知字段忽略；不是 JSON 对象或缺 message 字段时
//! 整体按裸文本处理——协议故障不应断开会话。

use serde::Deserialize;

/// 断开连接时向其余客户端广播的告别通知
pub const DEPARTURE_NOTICE: &str = "Client left the chat";

/// 一次入站聊天请求
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    /// 需要作为上下文前置的简历文档 ID
    #[serde(default)]
    pub resume_id: Option<String>,
    /// 需要作为上下文前置的 JD 文档 ID
    #[serde(default)]
    pub job_description_id: Option<String>,
}

impl ChatRequest {
    /// 裸文本请求
    pub fn plain(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resume_id: None,
            job_description_id: None,
        }
    }

    /// 解析入站负载；结构化解析失败则回退为裸文本
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<ChatRequest>(raw) {
            Ok(req) => req,
            Err(_) => Self::plain(raw),
        }
    }
}
