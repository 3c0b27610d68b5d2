//! WebSocket and HTTP front door for the call orchestrator

pub mod calls;
pub mod http;
pub mod state;
pub mod ws;

pub use calls::CallManager;
pub use http::create_router;
pub use state::AppState;
pub use ws::{InboundFrame, OutboundFrame};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("call capacity reached")]
    CapacityReached,

    #[error("call error: {0}")]
    Call(#[from] omniline_orchestrator::CallError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
