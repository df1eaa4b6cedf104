//! 对话数据模型
//!
//! Message 为带角色的单条消息（system/user/assistant/tool），追加后不可变；
//! Conversation 为仅追加的有序消息序列，由单个会话独占持有。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// 工具调用结果状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// assistant 消息上挂载的待执行工具调用引用
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallRef {
    pub call_id: String,
    pub name: String,
    /// 已拼接完成的参数 JSON 字符串
    pub arguments: String,
}

/// 单条消息
///
/// - assistant 消息可携带零或多个 tool_calls 引用
/// - tool 消息必须有 tool_call_id 与 status，content 为结果载荷
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ToolStatus>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            status: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            status: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            status: None,
        }
    }

    /// 携带工具调用引用的 assistant 消息（content 可为空串）
    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCallRef>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
            status: None,
        }
    }

    /// 绑定到一个 call_id 的 tool 消息
    pub fn tool(call_id: impl Into<String>, status: ToolStatus, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
            status: Some(status),
        }
    }
}

/// 仅追加的对话序列；消息一经 push 不再修改
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以单条 system 消息作为种子创建
    pub fn seeded(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_starts_with_system() {
        let conv = Conversation::seeded("you are scout");
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.messages()[0].role, Role::System);
    }

    #[test]
    fn conversations_are_independent() {
        let mut a = Conversation::seeded("s");
        let b = a.clone();
        a.push(Message::user("hello"));
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn tool_message_carries_call_id_and_status() {
        let msg = Message::tool("a1", ToolStatus::Error, "boom");
        assert_eq!(msg.tool_call_id.as_deref(), Some("a1"));
        assert_eq!(msg.status, Some(ToolStatus::Error));
    }
}
