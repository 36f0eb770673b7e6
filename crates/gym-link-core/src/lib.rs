//! # gym-link-core
//!
//! Core types for the Gym-Link compatibility layer.
//!
//! This crate provides the foundational types used across all Gym-Link crates:
//! - Space descriptions and the space/value codec
//! - Tool definitions and parameter schemas
//! - Environment and server metadata records
//! - Episode results
//! - The shared error taxonomy

pub mod error;
pub mod info;
pub mod results;
pub mod space;
pub mod tool;
pub mod value;

pub use error::{GymLinkError, Result};
pub use info::{EnvInfo, ServerInfo};
pub use results::EpisodeResult;
pub use space::{Space, SpaceDescription};
pub use tool::{ParamKind, PropertySpec, ToolDefinition, ToolSchema};
pub use value::SpaceValue;
