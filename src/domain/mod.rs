// ==========================================
// 月度电量分配系统 - 领域层
// ==========================================
// 职责: 站点单元、自备协议、分配记录
// ==========================================

pub mod allocation;
pub mod captive;
pub mod types;
pub mod unit;

pub use allocation::{AllocationKey, AllocationRecord};
pub use captive::{ActiveShareholder, CaptiveShare, GeneratorCaptive};
pub use types::{AllocationType, CaptiveStatus, Period, UnitKind};
pub use unit::{IrAdjustment, PeriodMap, Unit};
