// ==========================================
// 月度电量分配系统 - 结转电量处理
// ==========================================
// 职责:
// 1) 本月可用的结转电量补足自备分配后仍未满足的需求
// 2) 结转电量剩余部分继续结转 (BANKING 记录)
// 说明: 结转电量不受自备协议限制, 按用电服务顺序分配
// ==========================================

use crate::domain::types::{AllocationType, Period};
use crate::domain::unit::Unit;
use crate::engine::events::{AllocationEvent, OptionalEventSink};
use crate::engine::state::AllocationState;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// 结转处理结果
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BankingOutcome {
    pub allocated: f64,       // 分配给用电站点的结转电量
    pub carried_forward: f64, // 继续结转的电量
}

// ==========================================
// BankingProcessor - 结转处理器
// ==========================================
pub struct BankingProcessor;

impl BankingProcessor {
    /// 应用结转电量
    ///
    /// 每个结转单元在其发电公司组内按等份比例 (100 / 组内结转单元数) 参与分配:
    /// take = min(round(需求 × 比例 / 100), 可用结转量, 需求)
    ///
    /// # 参数
    /// - `state`: 计算状态（用电剩余需求会被扣减）
    /// - `banked`: 本月可用的结转单元（调用结束后剩余量清零）
    #[instrument(skip_all, fields(banked_units = banked.len()))]
    pub fn apply(
        &self,
        state: &mut AllocationState,
        banked: &mut [Unit],
        events: &OptionalEventSink,
    ) -> BankingOutcome {
        let mut outcome = BankingOutcome::default();

        let mut group_sizes: HashMap<String, usize> = HashMap::new();
        for unit in banked.iter() {
            *group_sizes.entry(unit.company_id.clone()).or_insert(0) += 1;
        }

        for unit in banked.iter_mut() {
            let group_size = group_sizes.get(&unit.company_id).copied().unwrap_or(1).max(1);
            let share = 100.0 / group_size as f64;
            outcome.allocated += self.allocate_unit(state, unit, share, events);
        }

        for unit in banked.iter_mut() {
            outcome.carried_forward += self.carry_forward(state, unit, events);
        }

        debug!(
            allocated = outcome.allocated,
            carried_forward = outcome.carried_forward,
            "结转电量处理完成"
        );
        outcome
    }

    fn allocate_unit(
        &self,
        state: &mut AllocationState,
        unit: &mut Unit,
        share: f64,
        events: &OptionalEventSink,
    ) -> f64 {
        let mut allocated = 0.0;

        for pos in 0..state.consumer_order.len() {
            let ci = state.consumer_order[pos];
            for period in Period::ALL {
                let need = state.consumption[ci].remaining_at(period);
                let available = unit.remaining_at(period);
                if need <= 0.0 || available <= 0.0 {
                    continue;
                }

                let take = (need * share / 100.0).round().min(available).min(need);
                if take <= 0.0 {
                    continue;
                }

                unit.remaining.subtract(period, take);
                state.consumption[ci].remaining.subtract(period, take);
                state.ledger.record_allocation(
                    unit,
                    &state.consumption[ci],
                    period,
                    take,
                    Some(share),
                    false,
                );

                events.emit(AllocationEvent::BankedAllocated {
                    production_site_id: unit.site_id.clone(),
                    consumption_site_id: state.consumption[ci].site_id.clone(),
                    period,
                    amount: take,
                });
                allocated += take;
            }
        }

        allocated
    }

    fn carry_forward(
        &self,
        state: &mut AllocationState,
        unit: &mut Unit,
        events: &OptionalEventSink,
    ) -> f64 {
        let mut carried = 0.0;
        for (period, amount) in unit.remaining.iter() {
            if amount <= 0.0 {
                continue;
            }
            state
                .ledger
                .record_terminal(AllocationType::Banking, unit, period, amount);
            events.emit(AllocationEvent::CarriedForward {
                production_site_id: unit.site_id.clone(),
                period,
                amount,
            });
            carried += amount;
        }
        unit.clear_remaining();
        carried
    }
}
