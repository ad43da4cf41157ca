//! Error taxonomy (spec §7): per-rule parse errors, per-file load errors, and
//! provider-unavailable errors. None of these ever abort a dispatch outright
//! — they degrade toward permissive, as described on each variant.

use miette::Diagnostic;
use thiserror::Error;

/// A single rule failed to parse. The loader catches this, discards the one
/// rule, and keeps parsing the rest of the file (§7 `ParsePerRule`).
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("`not` must have exactly one child, found {found}")]
    #[diagnostic(code(intent_firewall::parse::not_arity))]
    NotArity { found: usize },

    #[error("unrecognized predicate element `{0}`")]
    #[diagnostic(code(intent_firewall::parse::unknown_predicate))]
    UnknownPredicate(String),

    #[error("string-match leaf `{tag}` has no matching-mode attribute")]
    #[diagnostic(code(intent_firewall::parse::missing_mode))]
    MissingMatchMode { tag: String },

    #[error("string-match leaf `{tag}` has more than one matching-mode attribute")]
    #[diagnostic(code(intent_firewall::parse::ambiguous_mode))]
    AmbiguousMatchMode { tag: String },

    #[error("unparseable component string `{0}`")]
    #[diagnostic(code(intent_firewall::parse::bad_component))]
    BadComponent(String),

    #[error("`matchall` rule may not carry intent-filter or component-filter children")]
    #[diagnostic(code(intent_firewall::parse::matchall_with_filters))]
    MatchAllWithFilters,

    #[error("intent-filter child `{0}` is not a recognized filter attribute")]
    #[diagnostic(code(intent_firewall::parse::unknown_filter_attribute))]
    UnknownFilterAttribute(String),

    #[error("missing required attribute `{attr}` on `{tag}`")]
    #[diagnostic(code(intent_firewall::parse::missing_attribute))]
    MissingAttribute { tag: String, attr: String },

    #[error("invalid port value `{0}`")]
    #[diagnostic(code(intent_firewall::parse::bad_port))]
    BadPort(String),
}

/// A whole rules file failed to load. The loader discards the file and moves
/// on to the next one (§7 `ParsePerFile`).
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("reading {path}: {err}")]
    #[diagnostic(code(intent_firewall::load::io))]
    Io {
        path: std::path::PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("{path}: missing root `<rules>` element")]
    #[diagnostic(code(intent_firewall::load::missing_root))]
    MissingRoot { path: std::path::PathBuf },

    #[error("{path}: malformed XML: {err}")]
    #[diagnostic(code(intent_firewall::load::xml))]
    Xml {
        path: std::path::PathBuf,
        #[source]
        err: quick_xml::Error,
    },
}

/// A collaborator (package/permission provider, config reader) failed to
/// answer. Never propagated as a hard error — the calling predicate just
/// evaluates to `false` (§7 `ProviderUnavailable`). Kept around so callers
/// can log the underlying cause.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("permission check unavailable: {0}")]
    #[diagnostic(code(intent_firewall::provider::permission))]
    PermissionUnavailable(String),

    #[error("package query unavailable: {0}")]
    #[diagnostic(code(intent_firewall::provider::package))]
    PackageUnavailable(String),

    #[error("signature query unavailable: {0}")]
    #[diagnostic(code(intent_firewall::provider::signature))]
    SignatureUnavailable(String),

    #[error("configuration read unavailable: {0}")]
    #[diagnostic(code(intent_firewall::provider::config))]
    ConfigUnavailable(String),
}
