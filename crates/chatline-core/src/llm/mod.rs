//! Generation provider abstractions for Chatline.
//!
//! - `GenerationProvider`: RPITIT trait for concrete provider implementations
//! - `BoxGenerationProvider`: Object-safe wrapper for dynamic dispatch
//! - `ModelRegistry`: resolves public model ids to providers

pub mod box_provider;
pub mod provider;
pub mod registry;
