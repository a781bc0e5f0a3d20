//! # strand-server
//!
//! HTTP API over the Strand inventory ledger: SKU catalog, checkout and
//! stock-takes.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Request Lifecycle                               │
//! │                                                                         │
//! │  JSON body ──► routes::* ──► strand-db service (one unit of work)      │
//! │                   │                     │                               │
//! │                   │                     ├── Ok  ──► 200/201 JSON        │
//! │                   │                     └── Err ──► ApiError            │
//! │                   │                                 {code, message}     │
//! │                   └── after commit: Notifier (orders only)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod notify;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use notify::{ConfirmationSink, Notifier, OrderConfirmation, TracingSink};
pub use routes::router;
pub use state::AppState;
