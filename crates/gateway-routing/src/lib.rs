//! # Gateway Routing
//!
//! Model-aware provider selection for the LLM relay gateway.
//!
//! Routing is a pure table lookup: a model listed in the configured table goes
//! to its mapped provider, anything else goes to the default provider.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod router;

pub use router::ModelRouter;
