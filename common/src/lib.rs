//! 分析看板服务公共模块
//!
//! 包含配置加载、统一错误类型、响应包装、中间件以及共享数据模型。

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
