//! Section drafting: paragraph contracts, validation, and the synthesizer
//! state machine that drives a draft into its contract.

pub mod assembly;
pub mod handlers;
pub mod intro_plan;
pub mod measure;
pub mod prompts;
pub mod sanitize;
pub mod spec;
pub mod synthesizer;
pub mod validate;
