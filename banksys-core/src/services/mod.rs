//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod cache;
pub mod logging;
mod session;
mod state;

pub use cache::{
    DomainCache, RefreshReport, DEFAULT_PAGE_SIZE, MAX_ANALYTICS_MONTHS, MAX_PAGE_SIZE,
};
pub use logging::{
    now_ms, EntryPoint, FailureCount, LogEntry, LogEvent, LogFilter, LoggingService, LOG_DB_FILE,
};
pub use session::SessionManager;
pub use state::{ClientState, StateStore};
