//! Data layer: feature schema, raw-input alignment, and table loading.
//!
//! Architecture:
//! ```text
//!  .parquet / .csv / .json              form / CLI JSON
//!        │                                    │
//!        ▼                                    ▼
//!   ┌──────────┐                     ┌──────────────────┐
//!   │  loader   │ → TrainingTable    │     features     │ RawPatientInput
//!   └──────────┘                     └──────────────────┘
//!        │                                    │
//!        └───────────────┬────────────────────┘
//!                        ▼
//!                  ┌──────────┐
//!                  │  schema   │  10 features, fixed order and encodings
//!                  └──────────┘
//! ```

pub mod features;
pub mod loader;
pub mod schema;
