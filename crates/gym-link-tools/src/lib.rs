//! Tool adapter layer for Gym-Link servers.
//!
//! Turns a remote environment endpoint into a set of callable tools:
//! [`discovery`] figures out which tools a server offers, [`factory`]
//! binds each definition to a transport as an invokable [`Tool`], and
//! [`registry`] aggregates tools across several servers behind one
//! lookup surface. [`formats`] converts definitions into the shapes
//! agent frameworks expect.

pub mod discovery;
pub mod factory;
pub mod formats;
pub mod registry;

pub use discovery::{discover_tools, infer_tools_from_info};
pub use factory::{Tool, ToolArgs, ToolFactory};
pub use registry::MultiServerRegistry;

#[cfg(test)]
pub(crate) mod testing;
