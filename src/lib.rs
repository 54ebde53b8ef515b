//! SecureCart Fraud Scoring & Alert Distribution Core
//!
//! Real-time pipeline that turns raw transaction records into fraud decisions
//! and fans those decisions out to live subscribers with topic- and
//! role-based routing.
//!
//! # Architecture
//!
//! ```text
//! transaction
//!     │
//!     ▼
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  Feature     │──▶│  Predictor  │──▶│  Ensemble +  │
//! │  Extractor   │   │  Set        │   │  Classifier  │
//! └──────────────┘   └─────────────┘   └──────┬───────┘
//!                                             │ alert-worthy?
//!                                             ▼
//!                                      ┌─────────────┐
//!                                      │ Alert Queue │
//!                                      │ + Dispatch  │
//!                                      └──────┬──────┘
//!                              ┌──────────────┴──────────────┐
//!                              ▼                             ▼
//!                    ┌──────────────────┐          ┌────────────────┐
//!                    │  Subscription    │          │  Event Bridge  │
//!                    │  Registry        │◀─────────│  (cross-       │
//!                    │  (local fan-out) │ listener │   instance)    │
//!                    └──────────────────┘          └────────────────┘
//! ```
//!
//! The connection health monitor and live-stats broadcaster run as
//! independent background tasks against the registry.

pub mod alerts;
pub mod bridge;
pub mod config;
pub mod constants;
pub mod error;
pub mod external;
pub mod health;
pub mod pipeline;
pub mod registry;
pub mod scoring;
pub mod stats;
pub mod types;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use pipeline::FraudPipeline;
pub use scoring::{FraudDetector, ScoreResult, ScoreStatus};
pub use types::Transaction;
