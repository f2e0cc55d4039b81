//! # Optimize Reports
//!
//! Combined evaluation of process reports on a shared bucket axis.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  ReportService                           │
//! │  (create / update / delete with conflicts and force)     │
//! └─────────────────────────────────────────────────────────┘
//!          │                                   │
//!          ▼ [validation]                      ▼ [store]
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │  Combinability check      │   │  DefinitionStore          │
//! │  (shape of every member)  │   │  (revision-checked batch) │
//! └──────────────────────────┘   └──────────────────────────┘
//!                          │
//!                          ▼ [evaluation]
//! ┌─────────────────────────────────────────────────────────┐
//! │        CombinedEvaluator (per-member filter routing)     │
//! │        over a SingleReportEvaluator                      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [reconcile]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Shared axis: date / numeric / categorical strategy     │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod evaluation;
pub mod model;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod validation;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::error::{ServiceError, ServiceResult};
    pub use crate::evaluation::{
        CombinedEvaluator, EvaluationError, FilterApplicability, InMemoryEvaluator,
        SingleReportEvaluator,
    };
    pub use crate::model::{
        BucketedResult, CombinedReportData, CombinedResult, ReportData, ReportDefinition,
        ReportFilter, SingleReportData,
    };
    pub use crate::reconcile::{AxisKind, AxisStrategy, ReconciledAxis};
    pub use crate::service::{EvaluatedReport, NewReport, ReportService};
    pub use crate::store::{DefinitionStore, InMemoryStore, SqliteStore, StoreExt};
    pub use crate::validation::{can_combine, check_combinable, ValidationError};
}

pub use error::{ServiceError, ServiceResult};
pub use service::ReportService;
