// ==========================================
// 月度电量分配系统 - 分配记录台账
// ==========================================
// 职责: 按唯一键 upsert 分配记录, 输出保持首次写入顺序
// 红线: 同一键只有一条记录, 重复贡献只累加
// ==========================================

use crate::domain::allocation::{AllocationKey, AllocationRecord};
use crate::domain::types::{AllocationType, Period};
use crate::domain::unit::{PeriodMap, Unit};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct AllocationLedger {
    month: String,
    computed_at: DateTime<Utc>,
    records: Vec<AllocationRecord>,
    index: HashMap<AllocationKey, usize>,
}

impl AllocationLedger {
    pub fn new(month: &str, computed_at: DateTime<Utc>) -> Self {
        Self {
            month: month.to_string(),
            computed_at,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// 记录 发电 → 用电 分配
    ///
    /// # 参数
    /// - `producer`: 发电（或结转）单元
    /// - `consumer`: 用电单元
    /// - `percentage`: 本次应用的分配比例（首次创建时写入）
    /// - `carry_ir`: 是否把用电侧 IR 信息带到记录上
    pub fn record_allocation(
        &mut self,
        producer: &Unit,
        consumer: &Unit,
        period: Period,
        amount: f64,
        percentage: Option<f64>,
        carry_ir: bool,
    ) {
        let key = AllocationKey {
            record_type: AllocationType::Allocation,
            production_site_id: producer.site_id.clone(),
            consumption_site_id: Some(consumer.site_id.clone()),
            month: self.month.clone(),
        };
        let at = self.computed_at;
        let month = self.month.clone();

        let record = self.upsert(key, || AllocationRecord {
            record_type: AllocationType::Allocation,
            production_site_id: producer.site_id.clone(),
            production_site_name: producer.site_name.clone(),
            generator_company_id: producer.company_id.clone(),
            consumption_site_id: Some(consumer.site_id.clone()),
            consumption_site_name: Some(consumer.site_name.clone()),
            shareholder_company_id: Some(consumer.company_id.clone()),
            month,
            allocated: PeriodMap::zero(),
            allocation_percentage: percentage,
            ir: None,
            created_at: at,
            updated_at: at,
        });

        if carry_ir && record.ir.is_none() {
            record.ir = consumer.ir.clone();
        }
        record.accumulate(period, amount, at);
    }

    /// 记录 BANKING / LAPSE 终态电量
    pub fn record_terminal(
        &mut self,
        record_type: AllocationType,
        producer: &Unit,
        period: Period,
        amount: f64,
    ) {
        let key = AllocationKey {
            record_type,
            production_site_id: producer.site_id.clone(),
            consumption_site_id: None,
            month: self.month.clone(),
        };
        let at = self.computed_at;
        let month = self.month.clone();

        let record = self.upsert(key, || AllocationRecord {
            record_type,
            production_site_id: producer.site_id.clone(),
            production_site_name: producer.site_name.clone(),
            generator_company_id: producer.company_id.clone(),
            consumption_site_id: None,
            consumption_site_name: None,
            shareholder_company_id: None,
            month,
            allocated: PeriodMap::zero(),
            allocation_percentage: None,
            ir: None,
            created_at: at,
            updated_at: at,
        });
        record.accumulate(period, amount, at);
    }

    pub fn records(&self) -> &[AllocationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按类型拆分（各自保持写入顺序）
    pub fn into_partitioned(
        self,
    ) -> (Vec<AllocationRecord>, Vec<AllocationRecord>, Vec<AllocationRecord>) {
        let mut allocations = Vec::new();
        let mut banking = Vec::new();
        let mut lapse = Vec::new();
        for record in self.records {
            match record.record_type {
                AllocationType::Allocation => allocations.push(record),
                AllocationType::Banking => banking.push(record),
                AllocationType::Lapse => lapse.push(record),
            }
        }
        (allocations, banking, lapse)
    }

    fn upsert(
        &mut self,
        key: AllocationKey,
        create: impl FnOnce() -> AllocationRecord,
    ) -> &mut AllocationRecord {
        let pos = match self.index.get(&key) {
            Some(&pos) => pos,
            None => {
                let pos = self.records.len();
                self.records.push(create());
                self.index.insert(key, pos);
                pos
            }
        };
        &mut self.records[pos]
    }
}
