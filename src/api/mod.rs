// ==========================================
// 月度电量分配系统 - API 层
// ==========================================
// 职责: JSON 请求/响应外壳, 供上层服务调用
// ==========================================

pub mod allocation_api;
pub mod error;

// 重导出核心类型
pub use allocation_api::AllocationApi;
pub use error::{ApiError, ApiResult};
