// ==========================================
// 月度电量分配系统 - 核心库
// ==========================================
// 职责: 发电量 → 自备股东用电站点 的月度分配, 结转与作废
// 定位: 纯计算库, 无持久化, 相同输入得到相同输出
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 导入层 - 原始记录归一化
pub mod importer;

// 引擎层 - 分配规则
pub mod engine;

// 配置层
pub mod config;

// 日志系统
pub mod logging;

// API 层 - JSON 外壳
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AllocationType, CaptiveStatus, Period, UnitKind};

// 领域实体
pub use domain::{AllocationKey, AllocationRecord, IrAdjustment, PeriodMap, Unit};

// 引擎
pub use engine::{
    calculate_allocations, AllocationDebug, AllocationEngine, AllocationEvent,
    AllocationEventSink, AllocationInputs, AllocationOutcome,
};

// 配置
pub use config::AllocationConfig;

// API
pub use api::{AllocationApi, ApiError, ApiResult};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "月度电量分配系统";
