// ==========================================
// 月度电量分配系统 - 引擎层事件发布
// ==========================================
// 职责: 定义分配事件 sink trait, 追踪与控制流解耦
// 说明: 引擎只发布事件, 是否记录/转发由调用方决定
// ==========================================

use crate::domain::types::Period;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ==========================================
// 事件类型
// ==========================================

/// 被跳过的原始记录类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkippedKind {
    Production,
    Consumption,
    Banking,
    Captive,
}

/// 分配事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationEvent {
    /// 调用方未提供月份, 已按策略兜底
    MonthDefaulted { month: String },
    /// 原始记录被排除
    RecordSkipped { kind: SkippedKind, reason: String },
    /// 股东在某时段的分配上限
    ShareholderCeiling {
        generator_company_id: String,
        shareholder_company_id: String,
        period: Period,
        ceiling: f64,
    },
    /// 自备分配
    Allocated {
        production_site_id: String,
        consumption_site_id: String,
        period: Period,
        amount: f64,
    },
    /// 结转电量分配
    BankedAllocated {
        production_site_id: String,
        consumption_site_id: String,
        period: Period,
        amount: f64,
    },
    /// 结转至下月
    CarriedForward {
        production_site_id: String,
        period: Period,
        amount: f64,
    },
    /// 作废
    Lapsed {
        production_site_id: String,
        period: Period,
        amount: f64,
    },
}

impl AllocationEvent {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            AllocationEvent::MonthDefaulted { .. } => "MonthDefaulted",
            AllocationEvent::RecordSkipped { .. } => "RecordSkipped",
            AllocationEvent::ShareholderCeiling { .. } => "ShareholderCeiling",
            AllocationEvent::Allocated { .. } => "Allocated",
            AllocationEvent::BankedAllocated { .. } => "BankedAllocated",
            AllocationEvent::CarriedForward { .. } => "CarriedForward",
            AllocationEvent::Lapsed { .. } => "Lapsed",
        }
    }
}

// ==========================================
// 事件 Sink Trait
// ==========================================

/// 分配事件接收者
///
/// 引擎为同步计算, 接收者不应阻塞
pub trait AllocationEventSink: Send + Sync {
    fn emit(&self, event: &AllocationEvent);
}

/// 空操作接收者
#[derive(Debug, Clone, Default)]
pub struct NoOpEventSink;

impl AllocationEventSink for NoOpEventSink {
    fn emit(&self, event: &AllocationEvent) {
        tracing::trace!("NoOpEventSink: 丢弃事件 {}", event.as_str());
    }
}

/// 记录型接收者（测试与诊断使用）
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<AllocationEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已收到事件的快照
    pub fn events(&self) -> Vec<AllocationEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AllocationEventSink for RecordingEventSink {
    fn emit(&self, event: &AllocationEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

/// 可选的事件接收者包装
///
/// 简化 Option<Arc<dyn AllocationEventSink>> 的使用
#[derive(Clone)]
pub struct OptionalEventSink {
    inner: Option<Arc<dyn AllocationEventSink>>,
}

impl OptionalEventSink {
    pub fn with_sink(sink: Arc<dyn AllocationEventSink>) -> Self {
        Self { inner: Some(sink) }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn emit(&self, event: AllocationEvent) {
        if let Some(sink) = &self.inner {
            sink.emit(&event);
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventSink {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for OptionalEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionalEventSink")
            .field("configured", &self.is_configured())
            .finish()
    }
}
