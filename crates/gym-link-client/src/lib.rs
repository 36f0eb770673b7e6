//! # gym-link-client
//!
//! Dual-mode environment client for Gym-Link.
//!
//! This crate provides:
//! - `ServerClient` for HTTP tool calls with health checks and the
//!   MCP-to-REST endpoint fallback
//! - `NativeEnvironment` trait for in-process environments
//! - `EnvTransport` implementations for local and remote execution
//! - `GymClient`, the unified mode-agnostic client

pub mod client;
pub mod native;
pub mod service;
pub mod transport;

pub use client::{ClientConfig, EnvProvider, GymClient, Mode};
pub use native::{NativeEnvironment, Options};
pub use service::{ServerClient, ToolTransport};
pub use transport::{EnvTransport, LocalTransport, RemoteTransport, StepOutcome};
