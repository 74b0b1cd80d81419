//! Handler for `ipdb resolve`.

use std::path::PathBuf;

use ipdb_core::config::GlobalConfig;
use ipdb_ops::ops_resolve::{DatabaseOptions, IpDatabase};
use ipdb_ops::prompt::{self, ConflictMode};
use ipdb_resolver::policy::CancelFlag;
use ipdb_util::errors::IpdbError;
use ipdb_util::progress::status;
use miette::Result;

use crate::cli::ListArgs;

pub struct ResolveArgs {
    pub list: ListArgs,
    pub build_deps_tree: bool,
    pub resolve_conflicts: bool,
    pub flat: bool,
    pub yes: bool,
    pub flat_on_conflict: bool,
    pub domain: Option<String>,
    pub alternatives: Vec<String>,
    pub output: Option<PathBuf>,
    pub save_cache: Option<PathBuf>,
    pub load_cache: Option<PathBuf>,
    pub verbose: bool,
}

pub async fn exec(config: &GlobalConfig, args: ResolveArgs) -> Result<()> {
    let list_path = super::list_path(&args.list)?;
    let mut options = DatabaseOptions::from_config(&list_path, config);
    if args.flat {
        options.build_deps_tree = false;
        options.resolve_conflicts = false;
    }
    options.build_deps_tree |= args.build_deps_tree;
    options.resolve_conflicts |= args.resolve_conflicts;
    options.jobs = super::jobs(&args.list, config);
    options.verbose = args.verbose;
    options.load_cache = args.load_cache;

    // First Ctrl+C leaves the hierarchical flow, a second one exits. Nothing
    // reads the flag unless conflicts get resolved.
    let cancel = CancelFlag::new();
    let watcher = options.asks_for_conflicts().then(|| {
        let flag = cancel.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if flag.is_cancelled() {
                    std::process::exit(130);
                }
                flag.cancel();
            }
        })
    });

    let mode = if args.flat_on_conflict {
        ConflictMode::Flat
    } else if args.yes {
        ConflictMode::First
    } else {
        ConflictMode::Ask
    };
    let mut decider = prompt::decider_for(options.verbose, mode, cancel.clone());
    let source = ipdb_ops::local_source(&list_path, config);
    let opened = IpDatabase::open(&options, config, source, decider.as_mut(), cancel).await;
    if let Some(watcher) = watcher {
        watcher.abort();
    }
    let db = opened?;
    tracing::debug!("IP list obtained through {:?} flow", db.flow);

    if let Some(cache) = &args.save_cache {
        db.save_cache(cache)?;
    }

    let list = db.export_list(args.domain.as_deref(), &args.alternatives);
    let text = list.to_string_pretty().map_err(|e| IpdbError::Manifest {
        message: format!("Failed to serialize IP list: {e}"),
    })?;
    match &args.output {
        Some(path) => {
            ipdb_util::fs::write_with_parents(path, &text).map_err(IpdbError::Io)?;
            status("Wrote", &format!("{} ips to {}", list.len(), path.display()));
        }
        None => print!("{text}"),
    }
    Ok(())
}
