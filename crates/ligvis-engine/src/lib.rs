//! ligvis-engine — attribution of CNN pose scores to atoms and fragments.
//!
//! Three strategies over one planned set of units:
//! 1. Masking: score change when each unit is removed
//! 2. Gradient: magnitude of the score gradient at each atom
//! 3. LRP: relevance propagated from the score back to atoms
//!
//! The scorer is anything implementing [`ligvis_cnn::PoseScorer`].

pub mod config;
pub mod dx;
pub mod engine;
pub mod error;
pub mod planner;
pub mod report;
pub mod result;
pub mod strategy;

pub use config::{UnitMode, VisMethod, VisualizationConfig};
pub use engine::{run, visualize};
pub use error::{Result, VisError};
pub use planner::{plan, PerturbationUnit, PlanOptions, UnitKind};
pub use result::{AdditivityReport, AttributionResult, UnitAttribution};
pub use strategy::{RunContext, Strategy};
