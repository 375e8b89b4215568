//! # Dispatcher
//!
//! 信封路由模块。
//!
//! 负责：
//! - 解析次要目的地地址 (显式参数优先，其次按顺序查找回退来源)
//! - 按主事件分类把每个信封交给唯一一个目的地
//! - 每个目的地独立队列与 worker，慢目的地不阻塞另一个
//! - flush / shutdown 扇出到两个目的地并合并错误

pub mod destination;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod resolver;
pub mod routing;
pub mod sinks;

pub use contracts::{Envelope, EnvelopeSink, Transport};
pub use destination::create_destination;
pub use error::DispatcherError;
pub use handle::TransportHandle;
pub use metrics::{DestinationMetrics, MetricsSnapshot};
pub use resolver::{
    configured_fallbacks, default_env_fallbacks, env_fallbacks, resolve_dsn, DestinationResolver,
    FallbackSource, ResolutionSource, Resolved,
};
pub use routing::{
    classify, route_for, LifecycleState, Route, RoutingStats, RoutingTransport,
    DEFAULT_FLUSH_TIMEOUT, PRIMARY_DESTINATION, SECONDARY_DESTINATION,
};
pub use sinks::{FileSink, LogSink, NetworkSink};
