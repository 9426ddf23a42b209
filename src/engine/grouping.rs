// ==========================================
// 月度电量分配系统 - 发电分组 / 用电排序
// ==========================================
// 职责:
// - 发电单元按发电公司分组（组内按投运日期）
// - 用电单元按外部优先级排序, 无优先级者按剩余需求降序
// 红线: 所有排序稳定, 同键保持输入顺序
// ==========================================

use crate::domain::unit::Unit;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::HashMap;

/// 同一发电公司的发电站点（存放单元下标）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionGroup {
    pub generator_company_id: String,
    pub members: Vec<usize>,
}

// ==========================================
// ProducerGrouper - 发电分组
// ==========================================
pub struct ProducerGrouper {
    default_generator_company_id: String,
}

impl ProducerGrouper {
    pub fn new(default_generator_company_id: &str) -> Self {
        Self {
            default_generator_company_id: default_generator_company_id.to_string(),
        }
    }

    /// 按投运日期升序（无日期者排后）稳定排序
    pub fn sort_by_commission(&self, units: &mut [Unit]) {
        units.sort_by(|a, b| {
            let date_a = a.commission_date.unwrap_or(NaiveDate::MAX);
            let date_b = b.commission_date.unwrap_or(NaiveDate::MAX);
            date_a.cmp(&date_b)
        });
    }

    /// 按发电公司分组
    ///
    /// # 参数
    /// - `units`: 发电单元（已排序）
    ///
    /// # 返回
    /// 分组列表, 组的顺序为发电公司首次出现顺序
    pub fn group(&self, units: &[Unit]) -> Vec<ProductionGroup> {
        let mut groups: Vec<ProductionGroup> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (index, unit) in units.iter().enumerate() {
            let generator_id = if unit.company_id.is_empty() {
                self.default_generator_company_id.clone()
            } else {
                unit.company_id.clone()
            };

            match positions.get(&generator_id) {
                Some(&pos) => groups[pos].members.push(index),
                None => {
                    positions.insert(generator_id.clone(), groups.len());
                    groups.push(ProductionGroup {
                        generator_company_id: generator_id,
                        members: vec![index],
                    });
                }
            }
        }

        groups
    }
}

// ==========================================
// ConsumerOrderer - 用电排序
// ==========================================
pub struct ConsumerOrderer;

impl ConsumerOrderer {
    /// 计算用电单元的服务顺序
    ///
    /// 排序键:
    /// 1) 有显式优先级者在前, 数值小者优先
    /// 2) 无优先级者在后, 剩余需求合计降序
    ///
    /// # 返回
    /// 单元下标序列
    pub fn order(&self, units: &[Unit], priorities: &HashMap<String, i64>) -> Vec<usize> {
        let mut order: Vec<usize> = (0..units.len()).collect();
        order.sort_by(|&a, &b| self.compare(&units[a], &units[b], priorities));
        order
    }

    fn compare(&self, a: &Unit, b: &Unit, priorities: &HashMap<String, i64>) -> Ordering {
        match (priorities.get(&a.site_id), priorities.get(&b.site_id)) {
            (Some(pa), Some(pb)) => pa.cmp(pb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => b
                .total_remaining()
                .partial_cmp(&a.total_remaining())
                .unwrap_or(Ordering::Equal),
        }
    }
}
