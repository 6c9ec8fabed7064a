//! Eligibility lookup engine for Eligo.
//!
//! Turns a scheme identifier into a structured eligibility record by driving
//! a pooled browser session against the remote checker page.
//!
//! # Architecture
//!
//! ```text
//! lookup(id)
//!     │
//!     ▼
//! ┌──────────────┐  hit
//! │ LookupCache  │──────────▶ stored response
//! └──────────────┘
//!     │ miss (single-flight)
//!     ▼
//! ┌──────────────────┐   fault: back off, retry
//! │ RetryOrchestrator│◀───────────────┐
//! └──────────────────┘                │
//!     │ attempt                       │
//!     ▼                               │
//! ┌─────────────┐   ┌─────────────┐   │
//! │ SessionPool │──▶│ SiteProfile │───┘
//! └─────────────┘   │  + probe    │
//!                   └─────────────┘
//!                         │ Success
//!                         ▼
//!                   parser::parse
//! ```
//!
//! Sessions come from a [`SessionFactory`]: [`WebDriverFactory`] in
//! production, `MockSessionFactory` (feature `testing`) in tests.

pub mod engine;
pub mod error;
pub mod outcome;
pub mod parser;
pub mod pool;
pub mod probe;
pub mod retry;
pub mod session;
pub mod site;
pub mod webdriver;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use engine::{LookupEngine, LookupEngineBuilder, LookupFailure};
pub use error::{AutomationError, EngineError, Fault, PoolError, Result};
pub use outcome::{EligibilityRecord, ErrorCode, LookupOutcome, LookupResponse};
pub use parser::parse;
pub use pool::{Lease, LeaseState, PoolConfig, PoolStats, SessionPool};
pub use probe::{Markers, PageSnapshot, classify};
pub use retry::{ExhaustionPolicy, RetryOrchestrator, RetryPolicy};
pub use session::{SessionFactory, SessionHandle};
pub use site::SiteProfile;
pub use webdriver::{WebDriverConfig, WebDriverFactory, WebDriverSession};

// Re-export cache types used in the engine API
pub use eligo_cache::{CacheConfig, CacheStats};
