// ==========================================
// 月度电量分配系统 - 剩余发电量终态处理
// ==========================================
// 职责: 所有分配完成后, 发电剩余量转为 BANKING (允许结转) 或 LAPSE
// 红线: 处理后每个发电单元各时段剩余恰为 0, 不静默丢弃
// ==========================================

use crate::domain::types::{AllocationType, Period};
use crate::engine::events::{AllocationEvent, OptionalEventSink};
use crate::engine::state::AllocationState;
use tracing::instrument;

/// 终态处理结果
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LapseOutcome {
    pub banked: f64,
    pub lapsed: f64,
}

pub struct LapseProcessor;

impl LapseProcessor {
    #[instrument(skip_all, fields(production_units = state.production.len()))]
    pub fn settle(&self, state: &mut AllocationState, events: &OptionalEventSink) -> LapseOutcome {
        let mut outcome = LapseOutcome::default();

        for pi in 0..state.production.len() {
            let banking_enabled = state.production[pi].banking_enabled;
            let record_type = if banking_enabled {
                AllocationType::Banking
            } else {
                AllocationType::Lapse
            };

            for period in Period::ALL {
                let amount = state.production[pi].remaining_at(period);
                if amount <= 0.0 {
                    continue;
                }

                state
                    .ledger
                    .record_terminal(record_type, &state.production[pi], period, amount);

                let site_id = state.production[pi].site_id.clone();
                if banking_enabled {
                    outcome.banked += amount;
                    events.emit(AllocationEvent::CarriedForward {
                        production_site_id: site_id,
                        period,
                        amount,
                    });
                } else {
                    outcome.lapsed += amount;
                    events.emit(AllocationEvent::Lapsed {
                        production_site_id: site_id,
                        period,
                        amount,
                    });
                }
            }

            state.production[pi].clear_remaining();
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::UnitKind;
    use crate::domain::unit::Unit;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_settle_routes_by_banking_flag() {
        let mut bankable = Unit::new(UnitKind::Production, "P1", "G1", "082025");
        bankable.banking_enabled = true;
        bankable.remaining.set(Period::C1, 12.0);

        let mut plain = Unit::new(UnitKind::Production, "P2", "G1", "082025");
        plain.remaining.set(Period::C4, 8.0);

        let at = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
        let mut st = AllocationState::new("082025", at, vec![bankable, plain], Vec::new(), Vec::new());

        let outcome = LapseProcessor.settle(&mut st, &OptionalEventSink::none());
        assert_eq!(outcome.banked, 12.0);
        assert_eq!(outcome.lapsed, 8.0);
        assert!(st.production.iter().all(|u| !u.has_remaining()));

        let (_, banking, lapse) = st.ledger.into_partitioned();
        assert_eq!(banking[0].production_site_id, "P1");
        assert_eq!(banking[0].allocated.c1, 12.0);
        assert_eq!(lapse[0].production_site_id, "P2");
        assert_eq!(lapse[0].allocated.c4, 8.0);
    }
}
