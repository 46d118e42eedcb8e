pub mod annotate;
pub mod filter;
pub mod orchestrator;
pub mod resolve;
