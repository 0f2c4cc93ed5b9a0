use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rulesync_cli::settings::{FileStore, SettingsPaths, WORKSPACE_DIR};
use rulesync_cli::terminal::{TerminalPrompter, Unattended};
use rulesync_cli::{config, init_tracing, watch};
use rulesync_core::Scope;
use rulesync_engine::{
    Command as SyncCommand, CommandLayer, CommandOutcome, ImportOutcome, Prompter,
    ReconcileOutcome, Resolution, SyncEngine,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn scope_arg() -> Arg {
    Arg::new("scope")
        .long("scope")
        .value_parser(|s: &str| s.parse::<Scope>())
        .help("global or workspace; asked when omitted")
}

fn id_arg() -> Arg {
    Arg::new("id")
        .long("id")
        .value_parser(value_parser!(i64))
        .help("Rule id; picked from a list when omitted")
}

fn cli() -> Command {
    Command::new("rulesync")
        .version(rulesync_engine::VERSION)
        .about("Keep a rule list and its flattened key: value string in sync")
        .subcommand_required(true)
        .arg(
            Arg::new("workspace")
                .long("workspace")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Workspace root (default: the current directory if it has .rulesync)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (TOML)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log as JSON lines"),
        )
        .arg(
            Arg::new("no-input")
                .long("no-input")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Never prompt; questions are answered as dismissed"),
        )
        .subcommand(
            Command::new("add")
                .about("Add a rule")
                .arg(scope_arg())
                .arg(Arg::new("key").long("key").help("Rule key"))
                .arg(Arg::new("value").long("value").help("Rule value")),
        )
        .subcommand(
            Command::new("edit")
                .about("Change the key and value of a rule")
                .arg(scope_arg())
                .arg(id_arg())
                .arg(Arg::new("key").long("key").help("New key"))
                .arg(Arg::new("value").long("value").help("New value")),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a rule")
                .arg(scope_arg())
                .arg(id_arg())
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .short('y')
                        .action(ArgAction::SetTrue)
                        .help("Do not ask for confirmation"),
                ),
        )
        .subcommand(
            Command::new("view")
                .about("List rules with their values")
                .arg(scope_arg().help("Scope to list (default: all available)"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("sync")
                .about("Repair rule lists and regenerate flattened strings")
                .arg(scope_arg().help("Scope to sync (default: all available)")),
        )
        .subcommand(
            Command::new("reconcile")
                .about("Resolve external edits of the flattened string")
                .arg(scope_arg().help("Scope to reconcile (default: all available)"))
                .arg(
                    Arg::new("prefer")
                        .long("prefer")
                        .value_parser(|s: &str| s.parse::<Resolution>())
                        .help("pull or push without asking"),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Create rule lists from existing flattened strings")
                .arg(scope_arg().help("Scope to import (default: all available)"))
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .short('y')
                        .action(ArgAction::SetTrue)
                        .help("Do not ask for confirmation"),
                ),
        )
        .subcommand(Command::new("watch").about("Sync on every settings file change"))
}

fn workspace_root(matches: &ArgMatches) -> Option<PathBuf> {
    if let Some(dir) = matches.get_one::<PathBuf>("workspace") {
        return Some(dir.clone());
    }
    let cwd = std::env::current_dir().ok()?;
    cwd.join(WORKSPACE_DIR).is_dir().then_some(cwd)
}

fn scopes(engine: &SyncEngine, args: &ArgMatches) -> Vec<Scope> {
    match args.get_one::<Scope>("scope") {
        Some(scope) => vec![*scope],
        None => engine.available_scopes(),
    }
}

fn print_outcome(outcome: &CommandOutcome, json: bool) -> anyhow::Result<()> {
    match outcome {
        CommandOutcome::Viewed(views) if json => {
            println!("{}", serde_json::to_string_pretty(views)?);
        }
        CommandOutcome::Viewed(views) => {
            for view in views {
                match &view.value {
                    Some(value) => {
                        println!("{:<9} #{:<4} {}: {value}", view.scope, view.id, view.key);
                    }
                    None => println!("{:<9} #{:<4} {} (no value)", view.scope, view.id, view.key),
                }
            }
        }
        CommandOutcome::Synced(reports) => {
            for (scope, report) in reports {
                println!(
                    "{scope}: {} rule(s), repaired: {}, renamed: {}, text changed: {}",
                    report.rules, report.repaired, report.renamed, report.text_changed
                );
            }
        }
        CommandOutcome::Cancelled => println!("Cancelled."),
        CommandOutcome::Added { .. }
        | CommandOutcome::Edited { .. }
        | CommandOutcome::Deleted { .. } => {}
    }
    Ok(())
}

async fn reconcile(engine: &SyncEngine, args: &ArgMatches) -> bool {
    let mut ok = true;
    for scope in scopes(engine, args) {
        match engine.on_flattened_string_changed(scope).await {
            Ok(ReconcileOutcome::InSync) => println!("{scope}: in sync"),
            Ok(ReconcileOutcome::Pulled { rules, renamed }) => {
                println!("{scope}: pulled {rules} rule(s), {renamed} renamed");
            }
            Ok(ReconcileOutcome::Pushed) => println!("{scope}: pushed rule list"),
            Ok(ReconcileOutcome::Cancelled) => println!("{scope}: left unresolved"),
            Err(error) => {
                eprintln!("{scope}: {error}");
                ok = false;
            }
        }
    }
    ok
}

async fn import(engine: &SyncEngine, args: &ArgMatches) -> bool {
    let mut ok = true;
    for scope in scopes(engine, args) {
        let result = if args.get_flag("yes") {
            engine.import(scope).await
        } else {
            engine.offer_import(scope).await
        };
        match result {
            Ok(ImportOutcome::Imported { rules }) => println!("{scope}: imported {rules} rule(s)"),
            Ok(ImportOutcome::Declined) => println!("{scope}: import declined"),
            Ok(ImportOutcome::NotNeeded) => println!("{scope}: nothing to import"),
            Err(error) => {
                eprintln!("{scope}: {error}");
                ok = false;
            }
        }
    }
    ok
}

fn command_of(name: &str, args: &ArgMatches) -> Option<SyncCommand> {
    let scope = args.get_one::<Scope>("scope").copied();
    let text = |id: &str| args.get_one::<String>(id).cloned();
    let command = match name {
        "add" => SyncCommand::Add {
            scope,
            key: text("key"),
            value: text("value"),
        },
        "edit" => SyncCommand::Edit {
            scope,
            id: args.get_one::<i64>("id").copied(),
            key: text("key"),
            value: text("value"),
        },
        "delete" => SyncCommand::Delete {
            scope,
            id: args.get_one::<i64>("id").copied(),
            confirmed: args.get_flag("yes"),
        },
        "view" => SyncCommand::View { scope },
        "sync" => SyncCommand::ForceSync { scope },
        _ => return None,
    };
    Some(command)
}

fn build_engine(
    matches: &ArgMatches,
    config_path: Option<&Path>,
) -> anyhow::Result<(Arc<SyncEngine>, Arc<FileStore>)> {
    let mut config = config::load(config_path).context("loading configuration")?;
    if let Some(("reconcile", args)) = matches.subcommand() {
        if let Some(prefer) = args.get_one::<Resolution>("prefer") {
            config = config.with_default_resolution(Some(*prefer));
        }
    }

    let paths = SettingsPaths::resolve(workspace_root(matches).as_deref());
    tracing::debug!(
        global = %paths.global.display(),
        workspace = ?paths.workspace,
        "settings files"
    );
    let store = Arc::new(FileStore::new(paths, &config));

    let prompter: Arc<dyn Prompter> = if matches.get_flag("no-input") {
        Arc::new(Unattended)
    } else {
        Arc::new(TerminalPrompter::new())
    };
    let engine = Arc::new(SyncEngine::new(store.clone(), prompter, config));
    Ok((engine, store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let config_path = matches.get_one::<PathBuf>("config").cloned();
    let (engine, store) = build_engine(&matches, config_path.as_deref())?;

    let ok = match matches.subcommand() {
        Some(("reconcile", args)) => reconcile(&engine, args).await,
        Some(("import", args)) => import(&engine, args).await,
        Some(("watch", _)) => {
            engine.activate().await;
            watch::run(engine.clone(), store, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await;
            true
        }
        Some((name, args)) => {
            let Some(command) = command_of(name, args) else {
                anyhow::bail!("unknown command '{name}'");
            };
            let json = args.try_get_one::<bool>("json").ok().flatten().copied().unwrap_or(false);
            match CommandLayer::new(engine.clone()).run(command).await {
                Ok(outcome) => {
                    print_outcome(&outcome, json)?;
                    true
                }
                Err(_) => false,
            }
        }
        None => true,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
