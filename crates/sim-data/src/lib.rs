//! # Sim Data
//!
//! 시뮬레이션 코어가 외부 세계와 만나는 협력자 경계를 제공합니다:
//! - `MarketDataFeed` - 과거/최신 가격 바 공급 (재시도 정책 포함)
//! - `NewsSentiment` - 선택적 뉴스 감성 점수
//! - `EventStore` - 체결/스냅샷/감사 기록의 append-only 저장소
//! - `SnapshotSink` - 렌더링 계층으로의 성과 스트림
//!
//! 블로킹 I/O는 전부 이 경계 뒤에 격리됩니다. 코어(리스크/원장)는
//! 어떤 경우에도 I/O를 기다리지 않습니다.

pub mod feed;
pub mod sentiment;
pub mod sink;
pub mod store;

pub use feed::{FeedError, MarketDataFeed, ReplayFeed, RetryPolicy, RetryingFeed};
pub use sentiment::{NewsSentiment, StaticSentiment};
pub use sink::{LogSink, SnapshotSink};
pub use store::{EventStore, JsonlStore, MemoryStore};
