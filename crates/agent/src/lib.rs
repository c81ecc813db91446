//! Agent layer - vendor tools and free-text tool selection
//!
//! This crate sits between the HTTP router and the outside world:
//! - `tools` - the `Tool` trait, typed `ToolOutcome`, and the catalog of names
//! - `visa` - Visa Acceptance REST adapter (signed requests, payload mapping)
//! - `toolkit` - `Uninitialized -> Ready | Failed` lifecycle around the adapter
//! - `llm` / `selector` - optional LLM routing with a deterministic rule fallback
//!
//! # Safety Principle
//!
//! Neither the vendor nor the LLM is trusted to decide outcomes. Vendor
//! failures are reported as `ToolOutcome::Failure` for the router to degrade
//! on, and LLM output is only ever a suggestion parsed against the catalog.

pub mod llm;
pub mod selector;
pub mod signing;
pub mod toolkit;
pub mod tools;
pub mod visa;

pub use selector::{Selection, SelectionSource, ToolSelector};
pub use toolkit::{Toolkit, ToolkitError, ToolkitFactory, ToolkitState};
pub use tools::{Tool, ToolName, ToolOutcome, ToolRegistry};
