//! 会话管理
//!
//! 每条连接一个 Session：独占一份对话序列与文档上下文表。会话由管理器
//! 独占持有；编排期间用 take/put 把对话整体借出给连接自己的消息循环——
//! 单一写者，跨会话无需加锁。连接断开即销毁会话，状态全部释放。

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::conversation::Conversation;
use crate::store::SharedDocumentStore;

pub type SessionId = String;

/// 单个会话：对话历史 + 已解析文档缓存（document_id -> 抽取文本）
pub struct Session {
    pub id: SessionId,
    pub conversation: Conversation,
    pub documents: HashMap<String, String>,
}

impl Session {
    fn new(system_prompt: &str) -> Self {
        Self {
            id: format!("session_{}", uuid::Uuid::new_v4()),
            conversation: Conversation::seeded(system_prompt),
            documents: HashMap::new(),
        }
    }
}

/// 会话管理器：session_id -> Session，创建即播种 system 消息
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Session>>,
    system_prompt: String,
}

impl SessionManager {
    /// system_prompt 中的 {date} 在建会话时替换为当天日期
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            system_prompt: system_prompt.into(),
        }
    }

    /// 建立新会话，返回其 ID
    pub async fn create(&self) -> SessionId {
        let prompt = self
            .system_prompt
            .replace("{date}", &chrono::Utc::now().date_naive().to_string());
        let session = Session::new(&prompt);
        let id = session.id.clone();
        self.sessions.write().await.insert(id.clone(), session);
        id
    }

    /// 销毁会话，释放对话与文档上下文
    pub async fn remove(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// 把对话整体借出（会话内留一个空壳，put_conversation 归还）
    pub async fn take_conversation(&self, session_id: &str) -> Option<Conversation> {
        let mut sessions = self.sessions.write().await;
        sessions
            .get_mut(session_id)
            .map(|s| std::mem::take(&mut s.conversation))
    }

    /// 归还借出的对话；会话已销毁（连接中途关闭）则静默丢弃
    pub async fn put_conversation(&self, session_id: &str, conversation: Conversation) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.conversation = conversation;
        }
    }

    /// 解析文档上下文：先查会话缓存，未命中再查文档存储并写入缓存
    pub async fn resolve_document(
        &self,
        session_id: &str,
        document_id: &str,
        store: &SharedDocumentStore,
    ) -> Option<String> {
        {
            let sessions = self.sessions.read().await;
            if let Some(text) = sessions
                .get(session_id)
                .and_then(|s| s.documents.get(document_id))
            {
                return Some(text.clone());
            }
        }

        let doc = store.get(document_id).await?;
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session
                .documents
                .insert(document_id.to_string(), doc.extracted_text.clone());
        }
        Some(doc.extracted_text)
    }
}
