// ==========================================
// 月度电量分配系统 - 单次计算状态
// ==========================================
// 职责: 引擎在一次调用内独占的单元仓 (按下标访问) 与台账
// 红线: 不与调用方共享可变引用, 调用结束后按值返回剩余量
// ==========================================

use crate::domain::types::Period;
use crate::domain::unit::Unit;
use crate::engine::ledger::AllocationLedger;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// 某用电单元某时段的 IR 消化进度
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IrProgress {
    pub injection_applied: bool,
    pub reduction_left: f64, // 尚未抵扣的削减量
    pub absorbed: f64,       // 已抵扣的削减量, 自备分配不再补足这部分需求
}

#[derive(Debug, Clone)]
pub struct AllocationState {
    pub month: String,
    pub production: Vec<Unit>,
    pub consumption: Vec<Unit>,
    pub consumer_order: Vec<usize>, // 用电服务顺序（consumption 下标）
    pub ledger: AllocationLedger,
    ir_progress: HashMap<(usize, Period), IrProgress>,
}

impl AllocationState {
    pub fn new(
        month: &str,
        computed_at: DateTime<Utc>,
        production: Vec<Unit>,
        consumption: Vec<Unit>,
        consumer_order: Vec<usize>,
    ) -> Self {
        Self {
            month: month.to_string(),
            production,
            consumption,
            consumer_order,
            ledger: AllocationLedger::new(month, computed_at),
            ir_progress: HashMap::new(),
        }
    }

    /// 某用电单元某时段的 IR 进度（首次访问时按单元削减量初始化）
    pub fn ir_progress(&mut self, consumer: usize, period: Period) -> &mut IrProgress {
        let reduction = self.consumption[consumer].reduction_at(period);
        self.ir_progress
            .entry((consumer, period))
            .or_insert(IrProgress {
                injection_applied: false,
                reduction_left: reduction,
                absorbed: 0.0,
            })
    }

    /// 某组发电站点在各时段的剩余合计
    pub fn production_total(&self, members: &[usize], period: Period) -> f64 {
        members
            .iter()
            .map(|&i| self.production[i].remaining_at(period))
            .sum()
    }
}
