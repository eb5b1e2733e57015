//! Agent Tasks
//!
//! The long-running loops of the agent: transfer ingestion and gap
//! backfill, broker-message publishing, and the optimistic root lifecycle
//! (hub propose, spoke finalize). Each task exposes a single-cycle function
//! taking the [`AgentContext`](crate::context::AgentContext); the binary
//! wraps them in interval loops.

pub mod finalize;
pub mod ingest;
pub mod propose;
pub mod publisher;
