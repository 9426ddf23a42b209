// ==========================================
// 月度电量分配系统 - 导入层
// ==========================================
// 职责: 原始记录 → 规范单元
// 红线: 字段别名与类型差异只在此层消化
// ==========================================

pub mod unit_normalizer;
pub mod value_cleaner;

pub use unit_normalizer::{SiteMeta, UnitNormalizer};
pub use value_cleaner::ValueCleaner;
