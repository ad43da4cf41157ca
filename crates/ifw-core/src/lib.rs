//! The intent firewall's hard core: a two-phase rule-matching engine with a
//! hot-reloadable rule store, embedded in a host dispatcher.
//!
//! Data flow at dispatch time: [`facade`] → [`store`] → [`resolver`] →
//! [`rule`] → [`predicate`]. Data flow at reload: [`watcher`] → [`loader`] →
//! a fresh [`store::StoreData`], published into the live [`store::RuleStore`]
//! by a single reference swap.
//!
//! This crate has no opinion on *how* a host wires its collaborators
//! together — see [`collaborators`] for the traits it expects, and
//! [`facade::Firewall`] for the entry points it exposes.

pub mod audit;
pub mod changeable;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod facade;
pub mod loader;
pub mod predicate;
pub mod resolver;
pub mod rule;
pub mod store;
pub mod watcher;

pub use collaborators::{CallerIdentityGuard, EvalContext, HostCollaborator, IdentityToken, PackageQueries};
pub use config::FirewallConfig;
pub use error::{LoadError, ParseError, ProviderError};
pub use facade::{AuditSink, Firewall};
pub use store::{RuleStore, StoreData};
