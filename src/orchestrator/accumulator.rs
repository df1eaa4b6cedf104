//! 工具调用累积器
//!
//! 消费一次流式完成的 Fragment 序列：文本增量即时转发到输出通道（逐分片、
//! 不攒批），工具调用增量按游标规则重组为完整调用。(name, call_id) 只在开启
//! 新调用的分片上出现，其后缺省宣告的参数片段一律拼接到最近开启的调用上。

use std::collections::HashMap;

use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::error::AgentError;
use crate::llm::FragmentStream;

/// 重组完成的一次工具调用：名称 + call_id + 拼接完毕的参数串
#[derive(Clone, Debug)]
pub struct PendingToolCall {
    pub call_id: String,
    pub name: String,
    pub arguments: String,
}

/// 一个累积轮次的产出
#[derive(Debug, Default)]
pub struct PassOutput {
    /// 本轮吐出的全部文本（与转发到通道的内容一致）
    pub text: String,
    /// 按首次宣告顺序排列的完整调用
    pub calls: Vec<PendingToolCall>,
    /// 后端中途出错时的错误信息；此时本轮视为终止，calls 不再派发
    pub fault: Option<String>,
}

/// 消费分片流直至结束
///
/// sink 为 Some 时每个非空文本分片立即转发；通道关闭（客户端断开）返回
/// Cancelled，放弃本轮剩余输出。
pub async fn accumulate(
    mut stream: FragmentStream,
    sink: Option<&mpsc::UnboundedSender<String>>,
) -> Result<PassOutput, AgentError> {
    let mut out = PassOutput::default();
    // call_id -> calls 下标；cursor 指向最近开启的调用
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut cursor: Option<usize> = None;

    while let Some(item) = stream.next().await {
        let fragment = match item {
            Ok(f) => f,
            Err(e) => {
                out.fault = Some(e);
                return Ok(out);
            }
        };

        for delta in &fragment.tool_calls {
            if let (Some(name), Some(call_id)) = (&delta.name, &delta.call_id) {
                if !by_id.contains_key(call_id) {
                    by_id.insert(call_id.clone(), out.calls.len());
                    out.calls.push(PendingToolCall {
                        call_id: call_id.clone(),
                        name: name.clone(),
                        arguments: String::new(),
                    });
                }
                cursor = Some(by_id[call_id]);
            }

            if !delta.arguments.is_empty() {
                match cursor {
                    Some(idx) => out.calls[idx].arguments.push_str(&delta.arguments),
                    // 从未宣告过 (name, call_id) 的孤儿参数片段，丢弃
                    None => tracing::debug!(
                        fragment = %delta.arguments,
                        "dropping argument fragment with no open tool call"
                    ),
                }
            }
        }

        if let Some(text) = &fragment.text {
            if !text.is_empty() {
                out.text.push_str(text);
                if let Some(tx) = sink {
                    if tx.send(text.clone()).is_err() {
                        return Err(AgentError::Cancelled);
                    }
                }
            }
        }
    }

    Ok(out)
}
