//! A thin host-dispatcher simulator: loads a rules tree, starts the
//! watcher, and evaluates one dispatch described on the command line,
//! logging the decision and any audit events via `tracing`.

mod mock;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ifw_events::{AuditEvent, CallerInfo, Component, DispatchKind, DispatchRequest, Intent, Uid, UserId};
use intent_firewall::{EvalContext, Firewall, FirewallConfig, RuleStore};
use miette::{IntoDiagnostic, Result};
use tracing::info;

use mock::{MockHost, MockPackages};

#[derive(Parser, Debug)]
#[command(name = "ifw", about = "Intent firewall dispatch simulator")]
struct Args {
    /// Writable, watched rules directory.
    #[arg(long)]
    rules_dir: PathBuf,

    /// Additional read-only rules directories, read once at startup.
    #[arg(long = "readonly-dir")]
    readonly_dirs: Vec<PathBuf>,

    /// Dispatch kind to simulate.
    #[arg(long, value_enum, default_value = "activity")]
    kind: SimKind,

    /// Intent action string, if any.
    #[arg(long)]
    action: Option<String>,

    /// Fully-qualified resolved component (`pkg/Cls`).
    #[arg(long)]
    component: Option<String>,

    /// Caller UID.
    #[arg(long, default_value_t = 10_050)]
    caller_uid: i32,

    /// Keep the process alive and watch the rules directory for changes.
    #[arg(long)]
    watch: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum SimKind {
    Activity,
    Service,
    Broadcast,
    Provider,
}

struct StderrSink;
impl intent_firewall::AuditSink for StderrSink {
    fn emit(&self, event: AuditEvent) {
        info!(?event, "audit event");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = FirewallConfig::new(&args.rules_dir);
    for dir in &args.readonly_dirs {
        config = config.with_readonly_dir(dir);
    }

    std::fs::create_dir_all(&config.writable_dir).into_diagnostic()?;

    let (store, summary) = intent_firewall::loader::load_directories(config.all_dirs().map(PathBuf::as_path));
    info!(?summary, "loaded rules");

    let firewall = Arc::new(Firewall::new(RuleStore::new(store), Box::new(StderrSink)));

    let _watcher = if args.watch {
        let fw = firewall.clone();
        let all_dirs: Vec<PathBuf> = config.all_dirs().cloned().collect();
        let watch_dir = config.writable_dir.clone();
        let debounce = config.debounce;
        Some(
            fw.watch(&watch_dir, debounce, move || {
                let (store, summary) =
                    intent_firewall::loader::load_directories(all_dirs.iter().map(PathBuf::as_path));
                info!(?summary, "rules reloaded");
                fw.store().publish(store);
            })
            .into_diagnostic()?,
        )
    } else {
        None
    };

    let host = MockHost::default();
    let packages = MockPackages::default();
    let ctx = EvalContext::new(&packages, &host);

    let resolved_component = args
        .component
        .as_deref()
        .and_then(Component::parse);

    let req = DispatchRequest {
        kind: match args.kind {
            SimKind::Activity => DispatchKind::Activity,
            SimKind::Service => DispatchKind::Service,
            SimKind::Broadcast => DispatchKind::Broadcast,
            SimKind::Provider => DispatchKind::Provider,
        },
        intent: args.action.map(|a| Intent::new().with_action(a)),
        resolved_component,
        caller: CallerInfo::new(args.caller_uid, 1, vec!["com.example.caller".into()]),
        receiving_uid: Uid(args.caller_uid + 1),
        resolved_type: None,
        user_id: UserId(0),
    };

    let allowed = match req.kind {
        DispatchKind::Activity => firewall.check_start_activity(&req, ctx),
        DispatchKind::Service => firewall.check_service(&req, ctx),
        DispatchKind::Broadcast => firewall.check_broadcast(&req, ctx),
        DispatchKind::Provider => firewall.check_provider(&req, ctx),
        DispatchKind::Package => unreachable!("package dispatches use check_query_package"),
    };
    info!(allowed, "dispatch decision");

    if args.watch {
        tokio::signal::ctrl_c().await.into_diagnostic()?;
    }

    Ok(())
}
