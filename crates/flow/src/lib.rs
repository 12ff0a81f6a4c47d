pub mod engine;
pub mod error;
pub mod submit;
pub mod template;

// Re-export main types
pub use engine::{Advance, PendingStage, StageInput, StageOutcome, StepFlowEngine};
pub use error::{FlowError, SubmitError};
pub use submit::SubmitAdapter;
pub use template::{FlowTemplate, StageDescriptor, StageTemplate};
