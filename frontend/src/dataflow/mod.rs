//! Dataflow primitives shared by the window core
//!
//! - **[`Relay`]** - sending half of the "asset changed" feed

pub mod relay;

pub use relay::{Relay, relay};
