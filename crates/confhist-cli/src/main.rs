//! `confhist`: inspect and maintain configuration histories on disk

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use confhist_revision::{EntityKind, EntityPath, EntityRef, RevisionId};
use confhist_store::{HistoryStore, StoreConfig};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let entity = Arg::new("entity")
        .required(true)
        .value_parser(value_parser!(EntityRef))
        .help("Entity as kind:path, e.g. job:team/build or node:agent-1");

    Command::new("confhist")
        .version(confhist_store::VERSION)
        .about("Configuration history store")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("History base directory, overrides the configuration"),
        )
        .subcommand(
            Command::new("revisions")
                .about("List revisions of an entity")
                .arg(entity.clone())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output descriptors as JSON"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Print the stored configuration of one revision")
                .arg(entity.clone())
                .arg(
                    Arg::new("revision")
                        .required(true)
                        .value_parser(value_parser!(RevisionId))
                        .help("Revision id, e.g. 2026-10-16_09-05-01_042"),
                ),
        )
        .subcommand(
            Command::new("entities")
                .about("List entities that have history")
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .default_value("job")
                        .value_parser(value_parser!(EntityKind))
                        .help("job, node or system"),
                )
                .arg(
                    Arg::new("folder")
                        .long("folder")
                        .value_parser(value_parser!(EntityPath))
                        .help("Folder path, omit for top level"),
                )
                .arg(
                    Arg::new("deleted")
                        .long("deleted")
                        .action(ArgAction::SetTrue)
                        .help("List retired histories of deleted entities instead"),
                ),
        )
        .subcommand(Command::new("systems").about("List system configurations that have history"))
        .subcommand(
            Command::new("purge")
                .about("Apply a retention cap to one entity now")
                .arg(entity)
                .arg(
                    Arg::new("max")
                        .long("max")
                        .required(true)
                        .value_parser(value_parser!(u32))
                        .help("Revisions to leave room for, 0 does nothing"),
                ),
        )
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let store = open_store(&matches)?;
    let mut out = std::io::stdout().lock();

    match matches.subcommand() {
        Some(("revisions", args)) => {
            let entity = required::<EntityRef>(args, "entity")?;
            let listing = store.list_revisions(entity);
            if args.get_flag("json") {
                let all = listing.load_all();
                serde_json::to_writer_pretty(&mut out, &all)?;
                writeln!(out)?;
            } else {
                for (id, descr) in listing.entries() {
                    match descr {
                        Ok(d) => writeln!(out, "{id}  {:<8}  {} ({})", d.operation, d.user, d.user_id)?,
                        Err(e) => writeln!(out, "{id}  <unreadable: {e}>")?,
                    }
                }
            }
        }
        Some(("show", args)) => {
            let entity = required::<EntityRef>(args, "entity")?;
            let id = required::<RevisionId>(args, "revision")?;
            let Some(bytes) = store.read_revision(entity, id)? else {
                bail!("{entity} has no stored configuration for revision {id}");
            };
            out.write_all(&bytes)?;
        }
        Some(("entities", args)) => {
            let kind = *required::<EntityKind>(args, "kind")?;
            let folder = args.get_one::<EntityPath>("folder").cloned().unwrap_or_default();
            if args.get_flag("deleted") {
                for retired in store.list_deleted_entities_with_history(kind, &folder) {
                    let when = retired
                        .deleted_at
                        .map_or_else(|| "?".to_string(), |t| t.to_rfc3339());
                    writeln!(out, "{}  deleted {when}  {}", retired.name, retired.root.display())?;
                }
            } else {
                for entity in store.list_entities_with_history(kind, &folder) {
                    writeln!(out, "{entity}")?;
                }
            }
        }
        Some(("systems", _)) => {
            for entity in store.list_system_configs() {
                writeln!(out, "{}", entity.name())?;
            }
        }
        Some(("purge", args)) => {
            let entity = required::<EntityRef>(args, "entity")?;
            let max = *required::<u32>(args, "max")?;
            let report = store.purge(entity, max);
            writeln!(
                out,
                "removed {}, kept {} origin revision(s) beyond the cap, {} failure(s)",
                report.removed.len(),
                report.retained_created.len(),
                report.failures.len()
            )?;
            for failure in &report.failures {
                writeln!(out, "  {}: {}", failure.revision, failure.message)?;
            }
            if !report.failures.is_empty() {
                std::process::exit(1);
            }
        }
        _ => unreachable!("subcommand is required"),
    }
    Ok(())
}

fn open_store(matches: &ArgMatches) -> Result<HistoryStore> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => StoreConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(root) = matches.get_one::<PathBuf>("root") {
        config.history_root.clone_from(root);
    }
    tracing::debug!(root = %config.history_root.display(), "opening history");
    Ok(HistoryStore::new(config))
}

fn required<'a, T: Clone + Send + Sync + 'static>(args: &'a ArgMatches, id: &str) -> Result<&'a T> {
    args.get_one::<T>(id).with_context(|| format!("missing argument {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn parses_entity_and_revision() {
        let m = cli()
            .try_get_matches_from(["confhist", "show", "node:agent-1", "2026-10-16_09-05-01_042"])
            .unwrap();
        let (_, args) = m.subcommand().unwrap();
        assert_eq!(args.get_one::<EntityRef>("entity").unwrap(), &EntityRef::node("agent-1").unwrap());
        assert_eq!(args.get_one::<RevisionId>("revision").unwrap().as_str(), "2026-10-16_09-05-01_042");
    }

    #[test]
    fn rejects_malformed_revision() {
        assert!(cli()
            .try_get_matches_from(["confhist", "show", "job:a", "yesterday"])
            .is_err());
    }

    #[test]
    fn global_root_after_subcommand() {
        let m = cli()
            .try_get_matches_from(["confhist", "systems", "--root", "/tmp/h"])
            .unwrap();
        let store = open_store(&m).unwrap();
        assert_eq!(store.config().history_root, PathBuf::from("/tmp/h"));
    }
}
