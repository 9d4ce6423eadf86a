//! 이벤트 큐.
//!
//! 단일 스레드 협조식 FIFO 작업 목록입니다. 엔진은 현재 캔들에서 파생된
//! 이벤트가 모두 소진되기 전에는 데이터 소스에서 다음 캔들을 읽지 않습니다.
//! 이 전체 순서는 재현성 요구사항이며 어떤 구현도 완화할 수 없습니다.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::domain::{Event, EventKind};

/// 이벤트 종류별 누적 카운터.
///
/// 관측성과 실행 종료 통계에 사용됩니다. `put` 시점에 증가합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStats {
    /// 투입된 Market 이벤트 수
    pub market: usize,
    /// 투입된 Signal 이벤트 수
    pub signal: usize,
    /// 투입된 Order 이벤트 수
    pub order: usize,
    /// 투입된 Fill 이벤트 수
    pub fill: usize,
}

/// 단일 백테스트 run이 독점 소유하는 FIFO 이벤트 큐.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
    stats: EventStats,
}

impl EventQueue {
    /// 새 빈 큐를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 이벤트를 큐 끝에 추가하고 종류별 카운터를 증가시킵니다.
    pub fn put(&mut self, event: Event) {
        match event.kind() {
            EventKind::Market => self.stats.market += 1,
            EventKind::Signal => self.stats.signal += 1,
            EventKind::Order => self.stats.order += 1,
            EventKind::Fill => self.stats.fill += 1,
        }
        self.events.push_back(event);
    }

    /// 가장 오래된 이벤트를 꺼냅니다. 비어있으면 `None`.
    pub fn get(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// 큐가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// 대기 중인 이벤트 수.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// 누적 카운터 조회.
    pub fn stats(&self) -> EventStats {
        self.stats
    }
}
