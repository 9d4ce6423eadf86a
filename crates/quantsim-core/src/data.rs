//! 데이터 소스 계약.
//!
//! 엔진이 의존하는 pull 기반 캔들 공급 인터페이스와, 사전 적재된 과거
//! 데이터를 공급하는 [`HistoricalDataSource`] 구현을 제공합니다.
//!
//! 구현체는 최근 캔들의 유계 링 버퍼(기본 500개)만 유지합니다. 오래된
//! 캔들은 축출되므로 엔진과 전략은 무제한 히스토리를 가정해서는 안 됩니다.

use std::collections::VecDeque;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Bar;

/// 링 버퍼가 유지하는 최근 캔들 수의 기본 상한.
pub const MAX_LATEST_BARS: usize = 500;

/// 데이터 소스 구성 오류.
///
/// 실행을 완료할 수 없는 입력은 run 시작 전에 여기서 거부됩니다.
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// 캔들 데이터 없음
    #[error("캔들 데이터가 비어있습니다")]
    EmptyData,

    /// 시간순 정렬 위반
    #[error("캔들 데이터가 시간순으로 정렬되어 있지 않습니다 (index {index})")]
    UnsortedData {
        /// 정렬이 깨진 위치
        index: usize,
    },
}

/// 엔진이 의존하는 pull 기반 캔들 공급 계약.
///
/// `update_bars`는 정확히 한 캔들씩 전진하며, 소진되면 `None`을 반환하여
/// run을 종료시킵니다. 네트워크 기반 구현은 내부에서 블로킹할 수 있지만
/// 재시도나 취소는 이 계약 밖의 일입니다.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// 다음 캔들로 전진합니다. 소진되면 `None`.
    async fn update_bars(&mut self) -> Option<Bar>;

    /// 최근 `n`개 캔들을 시간순으로 반환합니다 (현재 캔들 포함).
    ///
    /// 지금까지 본 캔들이 `n`개 미만이면 `None`.
    fn latest_bars(&self, n: usize) -> Option<Vec<Bar>>;
}

/// 사전 적재된 캔들 벡터를 재생하는 인메모리 데이터 소스.
///
/// 백테스트의 기본 소스이자 테스트 더블입니다. 생성 시점에 입력을
/// 검증하며, 검증 실패는 run 시작 전의 치명적 오류입니다.
#[derive(Debug)]
pub struct HistoricalDataSource {
    bars: Vec<Bar>,
    cursor: usize,
    window: VecDeque<Bar>,
    capacity: usize,
}

impl HistoricalDataSource {
    /// 기본 링 버퍼 상한([`MAX_LATEST_BARS`])으로 생성합니다.
    pub fn new(bars: Vec<Bar>) -> Result<Self, DataSourceError> {
        Self::with_capacity(bars, MAX_LATEST_BARS)
    }

    /// 링 버퍼 상한을 지정하여 생성합니다.
    pub fn with_capacity(bars: Vec<Bar>, capacity: usize) -> Result<Self, DataSourceError> {
        if bars.is_empty() {
            return Err(DataSourceError::EmptyData);
        }
        for (index, window) in bars.windows(2).enumerate() {
            if window[0].timestamp > window[1].timestamp {
                return Err(DataSourceError::UnsortedData { index: index + 1 });
            }
        }

        Ok(Self {
            bars,
            cursor: 0,
            window: VecDeque::new(),
            capacity,
        })
    }

    /// 아직 공급되지 않은 캔들 수.
    pub fn remaining(&self) -> usize {
        self.bars.len() - self.cursor
    }

    /// 전체 캔들 수.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// 캔들이 없는지 확인합니다. 생성 검증상 항상 false입니다.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

#[async_trait]
impl DataSource for HistoricalDataSource {
    async fn update_bars(&mut self) -> Option<Bar> {
        let bar = self.bars.get(self.cursor)?.clone();
        self.cursor += 1;

        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(bar.clone());

        Some(bar)
    }

    fn latest_bars(&self, n: usize) -> Option<Vec<Bar>> {
        if self.window.len() < n {
            return None;
        }
        let skip = self.window.len() - n;
        Some(self.window.iter().skip(skip).cloned().collect())
    }
}
