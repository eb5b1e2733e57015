//! Courier Agent Library
//!
//! Off-chain coordination agent for a hub-and-spoke cross-domain bridge.
//! The agent ingests finalized transfers from per-domain indexers, keeps a
//! gap-free nonce-ordered cache, batches unprocessed transfers into broker
//! messages for the proof-generation stage, and drives the optimistic
//! aggregate-root lifecycle (hub proposal, spoke finalization).
//!
//! The agent is read-only on-chain: state-changing calls are encoded and
//! handed to external relayer backends, never signed locally.

pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod queue;
pub mod relayer;
pub mod store;
pub mod subgraph;
pub mod tasks;
pub mod types;
