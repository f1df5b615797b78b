//! Deterministic transaction risk assessment.
//!
//! Risk scores feed the workflow metadata snapshot as contextual input
//! for approvers and conditions; they never drive control flow directly.
//!
//! # Modules
//!
//! - `types` - Risk domain types (RiskLevel, RiskFactor, RiskAssessment)
//! - `assessor` - Table-driven scoring

pub mod assessor;
pub mod types;

pub use assessor::{RiskAssessor, RiskConfig, RiskInput};
pub use types::{Likelihood, RiskAssessment, RiskFactor, RiskFactorKind, RiskLevel};
