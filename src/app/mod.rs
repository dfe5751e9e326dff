mod orchestrator;
mod runtime;
mod startup;
mod types;


pub use orchestrator::SdcamOrchestrator;
pub use types::ShutdownReason;
