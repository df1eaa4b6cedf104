//! WebSocket 网关
//!
//! 每条连接一个独立任务：握手后建立专属会话，消息循环串行处理该连接的
//! 请求并把文本增量原样推回（出站无额外封帧，流结束即一轮结束）。活跃
//! 连接表是唯一被多任务修改的结构，增删与广播都经它的写锁；会话状态只被
//! 所属连接的循环触碰。任何一条连接上的故障只关那一条连接。

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::message::{ChatRequest, DEPARTURE_NOTICE};
use super::session::SessionManager;
use crate::conversation::Message;
use crate::error::AgentError;
use crate::orchestrator::Orchestrator;
use crate::store::SharedDocumentStore;

/// 网关配置
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// WebSocket 监听地址
    pub bind_addr: String,
    /// 最大并发连接数
    pub max_connections: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8100".to_string(),
            max_connections: 1000,
        }
    }
}

struct Connection {
    tx: mpsc::UnboundedSender<String>,
}

/// 聊天网关：持有会话管理器、编排引擎与活跃连接表
pub struct ChatGateway {
    config: GatewayConfig,
    sessions: Arc<SessionManager>,
    orchestrator: Arc<Orchestrator>,
    documents: SharedDocumentStore,
    connections: Arc<RwLock<HashMap<String, Connection>>>,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl ChatGateway {
    pub fn new(
        config: GatewayConfig,
        sessions: Arc<SessionManager>,
        orchestrator: Arc<Orchestrator>,
        documents: SharedDocumentStore,
    ) -> Self {
        let (shutdown_tx, _) = tokio::sync::watch::channel(false);
        Self {
            config,
            sessions,
            orchestrator,
            documents,
            connections: Arc::new(RwLock::new(HashMap::new())),
            shutdown: shutdown_tx,
        }
    }

    /// 启动监听；accept 循环在后台任务中运行，不被任何连接阻塞
    pub async fn start(&self) -> Result<(), AgentError> {
        let addr: SocketAddr = self
            .config
            .bind_addr
            .parse()
            .map_err(|e| AgentError::ConfigError(format!("Invalid bind address: {}", e)))?;

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| AgentError::TransportError(format!("Failed to bind: {}", e)))?;

        tracing::info!("Gateway listening on ws://{}", addr);

        let mut shutdown_rx = self.shutdown.subscribe();
        let connections = Arc::clone(&self.connections);
        let sessions = Arc::clone(&self.sessions);
        let orchestrator = Arc::clone(&self.orchestrator);
        let documents = Arc::clone(&self.documents);
        let max_connections = self.config.max_connections;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    result = listener.accept() => {
                        match result {
                            Ok((stream, addr)) => {
                                if connections.read().await.len() >= max_connections {
                                    tracing::warn!(%addr, "connection limit reached, refusing");
                                    continue;
                                }
                                let connections = Arc::clone(&connections);
                                let sessions = Arc::clone(&sessions);
                                let orchestrator = Arc::clone(&orchestrator);
                                let documents = Arc::clone(&documents);

                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(
                                        stream,
                                        addr,
                                        connections,
                                        sessions,
                                        orchestrator,
                                        documents,
                                    ).await {
                                        tracing::error!("Connection error from {}: {}", addr, e);
                                    }
                                });
                            }
                            Err(e) => {
                                tracing::error!("Accept error: {}", e);
                            }
                        }
                    }
                }
            }
        });

        Ok(())
    }

    /// 停止网关
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        self.connections.write().await.clear();
    }

    /// 向所有活跃连接广播一条文本
    pub async fn broadcast(&self, text: &str) {
        broadcast_all(&self.connections, text).await;
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.active_count().await
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    connections: Arc<RwLock<HashMap<String, Connection>>>,
    sessions: Arc<SessionManager>,
    orchestrator: Arc<Orchestrator>,
    documents: SharedDocumentStore,
) -> Result<(), AgentError> {
    let ws_stream = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| AgentError::TransportError(format!("WebSocket handshake failed: {}", e)))?;

    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let client_id = format!("ws_{}_{}", addr, uuid::Uuid::new_v4());
    let session_id = sessions.create().await;

    connections
        .write()
        .await
        .insert(client_id.clone(), Connection { tx: tx.clone() });

    tracing::info!("New WebSocket connection from {}", addr);

    // 出站任务：通道关闭或写失败即退出，随后入站侧的 send 失败会触发取消
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_tx.send(WsMessage::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = ws_rx.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("WebSocket receive error: {}", e);
                break;
            }
        };

        match msg {
            WsMessage::Text(text) => {
                match handle_message(&text, &session_id, &sessions, &orchestrator, &documents, &tx)
                    .await
                {
                    Ok(()) => {}
                    Err(AgentError::LlmError(e)) => {
                        // 后端故障只终止本轮；已流出的部分文本客户端已收到
                        tracing::error!(error = %e, "completion backend fault, turn abandoned");
                        let _ = tx.send(
                            "\n[error] The assistant backend failed mid-response. Please try again."
                                .to_string(),
                        );
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "closing connection after fault");
                        break;
                    }
                }
            }

            WsMessage::Close(_) => {
                break;
            }

            _ => {}
        }
    }

    connections.write().await.remove(&client_id);
    sessions.remove(&session_id).await;

    // 离场通知只发给仍然在线的其他连接
    broadcast_all(&connections, DEPARTURE_NOTICE).await;

    tracing::info!("WebSocket connection closed: {}", addr);
    Ok(())
}

/// 向连接表中的每条连接投递一条文本；投递失败的连接由其自身循环清理
async fn broadcast_all(connections: &RwLock<HashMap<String, Connection>>, text: &str) {
    let connections = connections.read().await;
    for conn in connections.values() {
        let _ = conn.tx.send(text.to_string());
    }
}

/// 处理一条入站消息：解析信封、前置文档上下文、借出对话跑一轮、归还
async fn handle_message(
    raw: &str,
    session_id: &str,
    sessions: &Arc<SessionManager>,
    orchestrator: &Arc<Orchestrator>,
    documents: &SharedDocumentStore,
    tx: &mpsc::UnboundedSender<String>,
) -> Result<(), AgentError> {
    let request = ChatRequest::parse(raw);
    let content = compose_user_content(&request, session_id, sessions, documents).await;

    let mut conversation = sessions
        .take_conversation(session_id)
        .await
        .ok_or_else(|| AgentError::TransportError("session no longer exists".to_string()))?;
    conversation.push(Message::user(content));

    let result = orchestrator.run_turn(&mut conversation, Some(tx)).await;

    if let Ok(text) = &result {
        if !text.is_empty() {
            conversation.push(Message::assistant(text.clone()));
        }
    }
    sessions.put_conversation(session_id, conversation).await;

    result.map(|_| ())
}

/// 把已解析的文档作为带标注的上下文块前置到用户文本之前；
/// 解析失败的 ID 记日志后跳过，不影响本条消息
async fn compose_user_content(
    request: &ChatRequest,
    session_id: &str,
    sessions: &Arc<SessionManager>,
    documents: &SharedDocumentStore,
) -> String {
    let mut blocks = Vec::new();
    let wanted = [
        ("Resume", request.resume_id.as_deref()),
        ("Job Description", request.job_description_id.as_deref()),
    ];
    for (label, id) in wanted {
        let Some(id) = id else { continue };
        match sessions.resolve_document(session_id, id, documents).await {
            Some(text) => blocks.push(format!("[{} {}]\n{}", label, id, text)),
            None => tracing::warn!(document_id = %id, "context document not found, skipping"),
        }
    }

    if blocks.is_empty() {
        request.message.clone()
    } else {
        format!("{}\n\n{}", blocks.join("\n\n"), request.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, InMemoryDocumentStore, StoredDocument};

    async fn store_with_resume() -> SharedDocumentStore {
        let store = InMemoryDocumentStore::new();
        store
            .insert(StoredDocument {
                id: "doc-1".to_string(),
                original_filename: "resume.txt".to_string(),
                file_type: "txt".to_string(),
                extracted_text: "rust developer, ten years".to_string(),
            })
            .await;
        Arc::new(store) as Arc<dyn DocumentStore>
    }

    #[tokio::test]
    async fn document_context_is_prepended_with_labels() {
        let sessions = Arc::new(SessionManager::new("sys"));
        let session_id = sessions.create().await;
        let documents = store_with_resume().await;

        let request = ChatRequest {
            message: "am I a fit?".to_string(),
            resume_id: Some("doc-1".to_string()),
            job_description_id: None,
        };
        let content = compose_user_content(&request, &session_id, &sessions, &documents).await;
        assert!(content.starts_with("[Resume doc-1]\nrust developer, ten years"));
        assert!(content.ends_with("am I a fit?"));
    }

    #[tokio::test]
    async fn departure_notice_reaches_only_remaining_connections() {
        let connections: RwLock<HashMap<String, Connection>> = RwLock::new(HashMap::new());
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        connections
            .write()
            .await
            .insert("a".to_string(), Connection { tx: tx_a });
        connections
            .write()
            .await
            .insert("b".to_string(), Connection { tx: tx_b });

        // b 断开：先摘除自己，再广播
        connections.write().await.remove("b");
        broadcast_all(&connections, DEPARTURE_NOTICE).await;

        assert_eq!(rx_a.recv().await.unwrap(), DEPARTURE_NOTICE);
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn unresolvable_document_is_skipped() {
        let sessions = Arc::new(SessionManager::new("sys"));
        let session_id = sessions.create().await;
        let documents = store_with_resume().await;

        let request = ChatRequest {
            message: "hello".to_string(),
            resume_id: Some("missing".to_string()),
            job_description_id: None,
        };
        let content = compose_user_content(&request, &session_id, &sessions, &documents).await;
        assert_eq!(content, "hello");
    }
}
