// ==========================================
// 月度电量分配系统 - 自备分配引擎 (主循环)
// ==========================================
// 职责: 发电公司 → 股东 (比例降序) → 用电站点 (优先级) → 时段
// 输入: 发电分组 + 活跃股东 + 计算状态
// 输出: ALLOCATION 记录 + 扣减后的剩余量
// 红线: 股东上限不可突破; 单次贪心, 不回溯
// ==========================================

use crate::domain::captive::ActiveShareholder;
use crate::domain::types::Period;
use crate::domain::unit::PeriodMap;
use crate::engine::events::{AllocationEvent, OptionalEventSink};
use crate::engine::grouping::ProductionGroup;
use crate::engine::state::AllocationState;
use tracing::{debug, instrument};

// ==========================================
// CaptiveAllocator - 自备分配引擎
// ==========================================
pub struct CaptiveAllocator {
    // 无状态引擎，不需要注入依赖
}

impl CaptiveAllocator {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 分配单个发电公司的电量
    ///
    /// 规则:
    /// 1) 无发电站点 / 股东无需求用电站点时直接跳过
    /// 2) 股东上限 = floor(组内发电合计 × 股东比例 / 100), 合计取本组开始分配前的值
    /// 3) 同一股东的所有用电站点共享该上限
    /// 4) 分配量按组内顺序贪心地从各发电站点扣取
    ///
    /// # 返回
    /// 本组分配出的总电量
    #[instrument(skip(self, state, group, shareholders, events), fields(
        generator_company_id = %group.generator_company_id,
        sites = group.members.len(),
        shareholders = shareholders.len()
    ))]
    pub fn allocate_group(
        &self,
        state: &mut AllocationState,
        group: &ProductionGroup,
        shareholders: &[ActiveShareholder],
        events: &OptionalEventSink,
    ) -> f64 {
        if group.members.is_empty() {
            debug!("发电公司无发电站点, 跳过");
            return 0.0;
        }

        let mut group_totals = PeriodMap::zero();
        for period in Period::ALL {
            group_totals.set(period, state.production_total(&group.members, period));
        }
        if !group_totals.has_positive() {
            debug!("发电公司本月无可分配电量, 跳过");
            return 0.0;
        }

        let mut allocated_total = 0.0;
        for shareholder in shareholders {
            let consumers: Vec<usize> = state
                .consumer_order
                .iter()
                .copied()
                .filter(|&ci| {
                    let consumer = &state.consumption[ci];
                    consumer.company_id == shareholder.shareholder_id && consumer.has_remaining()
                })
                .collect();

            if consumers.is_empty() {
                debug!(
                    shareholder_id = %shareholder.shareholder_id,
                    "股东无待满足的用电站点, 跳过"
                );
                continue;
            }

            let mut ceiling = self.shareholder_ceiling(&group_totals, shareholder.percentage);
            for (period, cap) in ceiling.iter() {
                if cap > 0.0 {
                    events.emit(AllocationEvent::ShareholderCeiling {
                        generator_company_id: group.generator_company_id.clone(),
                        shareholder_company_id: shareholder.shareholder_id.clone(),
                        period,
                        ceiling: cap,
                    });
                }
            }

            for ci in consumers {
                for period in Period::ALL {
                    allocated_total +=
                        self.serve(state, group, shareholder, ci, period, &mut ceiling, events);
                }
            }
        }

        allocated_total
    }

    /// 股东各时段分配上限
    pub fn shareholder_ceiling(&self, group_totals: &PeriodMap, percentage: u32) -> PeriodMap {
        let mut ceiling = PeriodMap::zero();
        for (period, total) in group_totals.iter() {
            ceiling.set(period, (total * f64::from(percentage) / 100.0).floor());
        }
        ceiling
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 满足单个 (用电站点, 时段)
    #[allow(clippy::too_many_arguments)]
    fn serve(
        &self,
        state: &mut AllocationState,
        group: &ProductionGroup,
        shareholder: &ActiveShareholder,
        consumer_index: usize,
        period: Period,
        ceiling: &mut PeriodMap,
        events: &OptionalEventSink,
    ) -> f64 {
        let need = state.consumption[consumer_index].remaining_at(period);
        let limit = ceiling.get(period);
        if need <= 0.0 || limit <= 0.0 {
            return 0.0;
        }

        let injection = state.consumption[consumer_index].injection_at(period);
        let progress = *state.ir_progress(consumer_index, period);

        // 注入优先于削减; 注入只在首次实际分配时生效
        // 削减跨发电公司累计抵扣, 未抵扣部分留给后续分配
        let mut inject = false;
        let mut take = if injection > 0.0 {
            let base = need.min(limit);
            if progress.injection_applied {
                base
            } else {
                inject = true;
                (base + injection).min(limit)
            }
        } else {
            let base = (need - progress.absorbed).max(0.0).min(limit);
            let used = progress.reduction_left.min(base);
            if used > 0.0 {
                let entry = state.ir_progress(consumer_index, period);
                entry.reduction_left -= used;
                entry.absorbed += used;
            }
            base - used
        };

        take = take.min(ceiling.get(period));
        if take <= 0.0 {
            return 0.0;
        }

        let given = self.distribute(state, group, shareholder, consumer_index, period, take, events);
        if inject && given > 0.0 {
            state.ir_progress(consumer_index, period).injection_applied = true;
        }
        ceiling.subtract(period, given);
        given
    }

    /// 按组内顺序从各发电站点扣取
    #[allow(clippy::too_many_arguments)]
    fn distribute(
        &self,
        state: &mut AllocationState,
        group: &ProductionGroup,
        shareholder: &ActiveShareholder,
        consumer_index: usize,
        period: Period,
        take: f64,
        events: &OptionalEventSink,
    ) -> f64 {
        let mut left = take;
        let mut given = 0.0;

        for &pi in &group.members {
            if left <= 0.0 {
                break;
            }
            let available = state.production[pi].remaining_at(period);
            if available <= 0.0 {
                continue;
            }

            let amount = available.min(left);
            state.production[pi].remaining.subtract(period, amount);
            state.consumption[consumer_index].remaining.subtract(period, amount);
            state.ledger.record_allocation(
                &state.production[pi],
                &state.consumption[consumer_index],
                period,
                amount,
                Some(f64::from(shareholder.percentage)),
                true,
            );

            events.emit(AllocationEvent::Allocated {
                production_site_id: state.production[pi].site_id.clone(),
                consumption_site_id: state.consumption[consumer_index].site_id.clone(),
                period,
                amount,
            });

            left -= amount;
            given += amount;
        }

        given
    }
}

impl Default for CaptiveAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::UnitKind;
    use crate::domain::unit::Unit;
    use chrono::{TimeZone, Utc};

    fn production(site_id: &str, c1: f64) -> Unit {
        let mut unit = Unit::new(UnitKind::Production, site_id, "G1", "082025");
        unit.remaining.set(Period::C1, c1);
        unit
    }

    fn consumption(site_id: &str, shareholder: &str, c1: f64) -> Unit {
        let mut unit = Unit::new(UnitKind::Consumption, site_id, shareholder, "082025");
        unit.remaining.set(Period::C1, c1);
        unit
    }

    fn shareholder(id: &str, percentage: u32) -> ActiveShareholder {
        ActiveShareholder {
            shareholder_id: id.to_string(),
            name: String::new(),
            percentage,
        }
    }

    fn state(production: Vec<Unit>, consumption: Vec<Unit>) -> AllocationState {
        let order = (0..consumption.len()).collect();
        let at = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
        AllocationState::new("082025", at, production, consumption, order)
    }

    fn group(members: Vec<usize>) -> ProductionGroup {
        ProductionGroup {
            generator_company_id: "G1".to_string(),
            members,
        }
    }

    #[test]
    fn test_ceiling_floors() {
        let allocator = CaptiveAllocator::new();
        let mut totals = PeriodMap::zero();
        totals.set(Period::C1, 99.0);
        let ceiling = allocator.shareholder_ceiling(&totals, 33);
        assert_eq!(ceiling.c1, 32.0);
    }

    #[test]
    fn test_ceiling_shared_across_consumers() {
        let allocator = CaptiveAllocator::new();
        let mut st = state(
            vec![production("P1", 100.0)],
            vec![consumption("C1", "S1", 30.0), consumption("C2", "S1", 50.0)],
        );

        let total = allocator.allocate_group(
            &mut st,
            &group(vec![0]),
            &[shareholder("S1", 60)],
            &OptionalEventSink::none(),
        );

        assert_eq!(total, 60.0);
        assert_eq!(st.consumption[0].remaining.c1, 0.0);
        assert_eq!(st.consumption[1].remaining.c1, 20.0);
        assert_eq!(st.production[0].remaining.c1, 40.0);
    }

    #[test]
    fn test_greedy_spills_to_next_site() {
        let allocator = CaptiveAllocator::new();
        let mut st = state(
            vec![production("P1", 30.0), production("P2", 70.0)],
            vec![consumption("C1", "S1", 50.0)],
        );

        allocator.allocate_group(
            &mut st,
            &group(vec![0, 1]),
            &[shareholder("S1", 100)],
            &OptionalEventSink::none(),
        );

        let records = st.ledger.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].production_site_id, "P1");
        assert_eq!(records[0].allocated.c1, 30.0);
        assert_eq!(records[1].production_site_id, "P2");
        assert_eq!(records[1].allocated.c1, 20.0);
    }

    #[test]
    fn test_injection_capped_by_ceiling() {
        let allocator = CaptiveAllocator::new();
        let mut consumer = consumption("C1", "S1", 40.0);
        let mut ir = crate::domain::unit::IrAdjustment::default();
        ir.ir_type = "INJECTION".to_string();
        ir.injection.set(Period::C1, 30.0);
        consumer.ir = Some(ir);

        let mut st = state(vec![production("P1", 100.0)], vec![consumer]);
        let total = allocator.allocate_group(
            &mut st,
            &group(vec![0]),
            &[shareholder("S1", 50)],
            &OptionalEventSink::none(),
        );

        // take = min(40, 50) + 30 → 上限 50
        assert_eq!(total, 50.0);
        assert_eq!(st.consumption[0].remaining.c1, 0.0);
        assert!(st.ledger.records()[0].ir.is_some());
    }

    #[test]
    fn test_reduction_lowers_take() {
        let allocator = CaptiveAllocator::new();
        let mut consumer = consumption("C1", "S1", 40.0);
        let mut ir = crate::domain::unit::IrAdjustment::default();
        ir.reduction.set(Period::C1, 15.0);
        consumer.ir = Some(ir);

        let mut st = state(vec![production("P1", 100.0)], vec![consumer]);
        let total = allocator.allocate_group(
            &mut st,
            &group(vec![0]),
            &[shareholder("S1", 100)],
            &OptionalEventSink::none(),
        );

        assert_eq!(total, 25.0);
        assert_eq!(st.consumption[0].remaining.c1, 15.0);
    }

    #[test]
    fn test_reduction_carried_across_generators() {
        let allocator = CaptiveAllocator::new();
        let mut consumer = consumption("C1", "S1", 40.0);
        let mut ir = crate::domain::unit::IrAdjustment::default();
        ir.reduction.set(Period::C1, 15.0);
        consumer.ir = Some(ir);

        let mut small = production("P1", 10.0);
        small.company_id = "G1".to_string();
        let mut large = production("P2", 100.0);
        large.company_id = "G2".to_string();
        let mut st = state(vec![small, large], vec![consumer]);

        let first = allocator.allocate_group(
            &mut st,
            &group(vec![0]),
            &[shareholder("S1", 100)],
            &OptionalEventSink::none(),
        );
        let second = allocator.allocate_group(
            &mut st,
            &ProductionGroup {
                generator_company_id: "G2".to_string(),
                members: vec![1],
            },
            &[shareholder("S1", 100)],
            &OptionalEventSink::none(),
        );

        // 10 全部被削减抵扣, 剩余削减 5 由 G2 承担: 合计与只有 G2 时相同
        assert_eq!(first, 0.0);
        assert_eq!(second, 25.0);
        assert_eq!(st.consumption[0].remaining.c1, 15.0);
        assert_eq!(st.production[0].remaining.c1, 10.0);
    }

    #[test]
    fn test_reduction_not_reapplied_by_second_generator() {
        let allocator = CaptiveAllocator::new();
        let mut consumer = consumption("C1", "S1", 40.0);
        let mut ir = crate::domain::unit::IrAdjustment::default();
        ir.reduction.set(Period::C1, 15.0);
        consumer.ir = Some(ir);

        let mut st = state(vec![production("P1", 100.0), production("P2", 100.0)], vec![consumer]);
        let first = allocator.allocate_group(
            &mut st,
            &group(vec![0]),
            &[shareholder("S1", 100)],
            &OptionalEventSink::none(),
        );
        let second = allocator.allocate_group(
            &mut st,
            &group(vec![1]),
            &[shareholder("S1", 100)],
            &OptionalEventSink::none(),
        );

        assert_eq!(first, 25.0);
        assert_eq!(second, 0.0);
        assert_eq!(st.consumption[0].remaining.c1, 15.0);
    }

    #[test]
    fn test_shareholder_without_consumers_skipped() {
        let allocator = CaptiveAllocator::new();
        let mut st = state(vec![production("P1", 100.0)], vec![consumption("C1", "S9", 10.0)]);
        let total = allocator.allocate_group(
            &mut st,
            &group(vec![0]),
            &[shareholder("S1", 100)],
            &OptionalEventSink::none(),
        );
        assert_eq!(total, 0.0);
        assert!(st.ledger.is_empty());
    }
}
