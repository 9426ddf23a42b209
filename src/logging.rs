// ==========================================
// 月度电量分配系统 - 日志初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 引擎只发出 span / 事件, 订阅者由调用方或测试安装
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 本库默认日志过滤: 分配引擎 info, 其他依赖 warn
const DEFAULT_FILTER: &str = "warn,energy_allocation=info";

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: warn,energy_allocation=info）
///   例如: RUST_LOG=energy_allocation::engine::allocator=debug
///
/// # 示例
/// ```no_run
/// use energy_allocation::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// 初始化测试环境的日志系统
///
/// 分配引擎输出 debug 级别（逐步分配细节）; 重复调用静默忽略
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("warn,energy_allocation=debug"))
        .with_test_writer()
        .try_init();
}
