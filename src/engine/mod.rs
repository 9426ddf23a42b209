// ==========================================
// 月度电量分配系统 - 引擎层
// ==========================================
// 职责: 自备分配 → 结转 → 终态, 纯计算, 不做 I/O
// 红线: 分配量不超过可用量与需求; 每个 kWh 恰好出现在一个去向
// ==========================================

pub mod allocator;
pub mod banking;
pub mod captive_map;
pub mod events;
pub mod grouping;
pub mod lapse;
pub mod ledger;
pub mod orchestrator;
pub mod percentage;
pub mod state;

// 重导出核心引擎
pub use allocator::CaptiveAllocator;
pub use banking::{BankingOutcome, BankingProcessor};
pub use captive_map::{CaptiveMap, CaptiveMapBuilder};
pub use events::{
    AllocationEvent, AllocationEventSink, NoOpEventSink, OptionalEventSink, RecordingEventSink,
    SkippedKind,
};
pub use grouping::{ConsumerOrderer, ProducerGrouper, ProductionGroup};
pub use lapse::{LapseOutcome, LapseProcessor};
pub use ledger::AllocationLedger;
pub use orchestrator::{
    calculate_allocations, is_valid_month_key, AllocationDebug, AllocationEngine,
    AllocationInputs, AllocationOutcome,
};
pub use percentage::to_whole_percentages;
pub use state::{AllocationState, IrProgress};
