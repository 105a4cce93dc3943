//! # HTTP API
//!
//! 会话作用域的凭证管理、连通性测试与服务商调用接口。

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;

pub use response::{ApiResponse, ErrorInfo, ErrorResponse, SuccessResponse, status_for};
pub use server::{ApiServer, AppState, build_router};
