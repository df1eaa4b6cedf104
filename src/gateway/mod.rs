//! 网关层：WebSocket 接入、入站协议、会话管理

pub mod hub;
pub mod message;
pub mod session;

pub use hub::{ChatGateway, GatewayConfig};
pub use message::{ChatRequest, DEPARTURE_NOTICE};
pub use session::{Session, SessionId, SessionManager};
