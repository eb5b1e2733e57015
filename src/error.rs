//! Typed Failure Conditions
//!
//! Named error conditions shared across tasks. Task and client functions
//! return `anyhow::Result` and wrap these where a caller (or a test) needs
//! to distinguish the condition; transient I/O failures stay as plain
//! `anyhow` errors with context.

use thiserror::Error;

use crate::types::{AgentMode, Domain};

/// Failure conditions with defined handling policies.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The destination domain of a batch is not in the configured domain
    /// set. Fatal to the affected pair only.
    #[error("destination domain {0} is not configured for proof generation")]
    DestinationDomainNotConfigured(Domain),

    /// A domain referenced by a dispatch has no chain id configured.
    /// Fatal to the affected cycle only.
    #[error("no chain id configured for domain {0}")]
    NoChainIdForDomain(Domain),

    /// Every configured relayer backend rejected the submission. Callers
    /// log this and retry from current on-chain state next cycle.
    #[error("all {attempts} relayer backends rejected the submission")]
    RelaySubmissionExhausted { attempts: usize },

    /// The hub root manager and a spoke connector disagree on the
    /// finalization mode. Fatal to the whole propose run.
    #[error(
        "mode mismatch: hub {hub_domain} reports {hub_mode:?} but spoke {spoke_domain} reports {spoke_mode:?}"
    )]
    ModeMismatch {
        hub_domain: Domain,
        hub_mode: AgentMode,
        spoke_domain: Domain,
        spoke_mode: AgentMode,
    },

    /// One of the root-state values required to build a batch for a pair
    /// is absent. A hard precondition for the pair, not a recoverable
    /// partial state.
    #[error("missing {field} for pair {origin_domain} -> {destination_domain}")]
    MissingRootState {
        origin_domain: Domain,
        destination_domain: Domain,
        field: &'static str,
    },
}
