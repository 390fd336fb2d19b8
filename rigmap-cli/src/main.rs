use std::path::Path;

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser, Subcommand};
use rigmap_core::armature::{choose_root, detect_roots, detect_roots_with_generic};
use rigmap_core::build::{BuildReport, Builder, Destination, MarkActive};
use rigmap_core::capture::capture;
use rigmap_core::diagnostics::{activate_all, dump_bindings};
use rigmap_core::index::PathIndexCache;
use rigmap_core::naming::{canonical_key, canonical_of, slot_of, tokenize, HumanSlot};
use rigmap_core::resolve::{resolve_reference, Reference, Strategies, Strategy};
use rigmap_core::rig::path::split_segments;
use rigmap_core::{config, record, scene, NodeId, RetargetConfig, RigTree, VERSION};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rigmap", version = VERSION, about = "Constraint capture and retargeting between rigs")]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a scene's hierarchy and its armature root candidates
    Inspect { scene: String },
    /// Show tokens, canonical key, alias and humanoid slot of joint names
    Tokenize { names: Vec<String> },
    /// Capture every constraint under a root into records
    Capture {
        scene: String,
        /// Import root, relative to the scene root (default: scene root)
        #[arg(long)]
        root: Option<String>,
        /// Armature root override
        #[arg(long)]
        armature: Option<String>,
        #[arg(long)]
        out: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Rebuild records onto one or more destination scenes
    Build {
        records: String,
        #[arg(required = true)]
        destinations: Vec<String>,
        #[arg(long)]
        config: Option<String>,
        /// Armature root on every destination (default: detect)
        #[arg(long)]
        armature: Option<String>,
        /// Directory for rebuilt scenes; nothing is written without it
        #[arg(long)]
        out_dir: Option<String>,
        /// Build on copies named with the preview suffix
        #[arg(long)]
        preview: bool,
    },
    /// Resolve a single reference against a scene's armature
    Resolve {
        scene: String,
        #[arg(long)]
        armature: Option<String>,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        path: String,
        #[arg(long)]
        slot: Option<HumanSlot>,
        /// Strategy to disable; repeatable
        #[arg(long)]
        skip: Vec<Strategy>,
    },
    /// Print one line per constraint binding
    Dump {
        scene: String,
        #[arg(long)]
        root: Option<String>,
        /// Activate every component first and report failures
        #[arg(long)]
        activate: bool,
    },
}

/// Directive for the verbosity flags; `RUST_LOG` applies when neither is given.
fn log_directive(verbose: u8, quiet: bool) -> Option<&'static str> {
    match (quiet, verbose) {
        (true, _) => Some("error"),
        (false, 0) => None,
        (false, 1) => Some("info"),
        _ => Some("debug"),
    }
}

/// Core crates log through the `log` facade; the subscriber picks those
/// records up through its `tracing-log` bridge.
fn init_logging(verbose: u8, quiet: bool) {
    let filter = match log_directive(verbose, quiet) {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Empty or missing path is the scene root.
fn node_at(tree: &RigTree, path: Option<&str>) -> Result<NodeId> {
    let path = path.unwrap_or("");
    let segments = split_segments(path);
    if segments.is_empty() {
        return Ok(tree.root());
    }
    tree.find_by_segments(tree.root(), &segments)
        .ok_or_else(|| anyhow!("no node at '{}' in '{}'", path, tree.name(tree.root())))
}

fn detected_root(tree: &RigTree) -> Result<NodeId> {
    let candidates = detect_roots(tree, tree.root())?;
    let choice = choose_root(&candidates, None).ok_or_else(|| anyhow!("no armature root candidates"))?;
    Ok(choice.root)
}

fn print_tree(tree: &RigTree, id: NodeId, depth: usize) {
    let node = tree.node(id);
    let mut line = format!("{}{}", "  ".repeat(depth), node.name);
    match &node.avatar {
        Some(a) if a.is_human() => line.push_str(" [humanoid avatar]"),
        Some(_) => line.push_str(" [avatar]"),
        None => {}
    }
    if !node.components.is_empty() {
        line.push_str(&format!(" ({} constraint(s))", node.components.len()));
    }
    println!("{line}");
    for child in tree.children(id) {
        print_tree(tree, *child, depth + 1);
    }
}

fn print_report(report: &BuildReport) {
    println!(
        "{}: {}/{} record(s) completed, {}",
        report.destination,
        report.completed(),
        report.outcomes.len(),
        report.stats
    );
    for w in &report.warnings {
        println!("  warning: {w}");
    }
}

fn write_scene(out_dir: Option<&str>, tree: &RigTree, root: NodeId) -> Result<()> {
    let Some(dir) = out_dir else {
        return Ok(());
    };
    std::fs::create_dir_all(dir)?;
    let out = Path::new(dir).join(format!("{}.yaml", tree.name(root)));
    std::fs::write(&out, scene::to_yaml_string(tree, root)?)?;
    println!("Wrote {}", out.display());
    Ok(())
}

fn label_of(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    match cli.cmd {
        Command::Inspect { scene } => {
            let tree = scene::load_from_path(&scene)?;
            print_tree(&tree, tree.root(), 0);
            match detect_roots_with_generic(&tree, tree.root()) {
                Ok(candidates) => {
                    println!("armature root candidates:");
                    for (i, c) in candidates.iter().enumerate() {
                        println!("  [{}] {} score={} depth={} ({:?})", i, c.label, c.score, c.depth, c.source);
                    }
                    if let Some(deeper) = choose_root(&candidates, None).and_then(|c| c.deeper_alternative) {
                        println!("  note: default pick is the shallowest; '{}' is deeper", tree.path(deeper));
                    }
                }
                Err(e) => println!("no armature root: {e}"),
            }
        }
        Command::Tokenize { names } => {
            for name in &names {
                let alias = canonical_of(name);
                let slot = alias.as_ref().and_then(slot_of);
                println!(
                    "{}: tokens=[{}] key={} alias={} slot={}",
                    name,
                    tokenize(name).join(", "),
                    canonical_key(name).map(|k| k.to_string()).unwrap_or_else(|| "-".into()),
                    alias.map(|k| k.to_string()).unwrap_or_else(|| "-".into()),
                    slot.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                );
            }
        }
        Command::Capture { scene, root, armature, out, json } => {
            let tree = scene::load_from_path(&scene)?;
            let root = node_at(&tree, root.as_deref())?;
            let armature = armature.as_deref().map(|p| node_at(&tree, Some(p))).transpose()?;
            let records = capture(&tree, root, armature);
            let text = if json { record::to_json(&records)? } else { record::to_yaml(&records)? };
            match out {
                Some(path) => {
                    std::fs::write(&path, text)?;
                    println!("Wrote {} record(s) to {}", records.len(), path);
                }
                None => print!("{text}"),
            }
        }
        Command::Build { records, destinations, config, armature, out_dir, preview } => {
            let records = record::load_from_path(&records)?;
            let cfg = match config {
                Some(path) => config::load_from_path(&path)?,
                None => RetargetConfig::default(),
            };
            let mut builder = Builder::new(cfg);
            if preview {
                for path in &destinations {
                    let tree = scene::load_from_path(path)?;
                    let armature = armature.as_deref().map(|p| node_at(&tree, Some(p))).transpose()?;
                    let pv = builder.build_preview(&tree, tree.root(), armature, &records);
                    match &pv.report {
                        Some(report) => print_report(report),
                        None => println!("{}: no armature root, preview left unbuilt", tree.name(pv.root)),
                    }
                    write_scene(out_dir.as_deref(), &pv.tree, pv.root)?;
                }
            } else {
                let mut dests = Vec::with_capacity(destinations.len());
                for path in &destinations {
                    let tree = scene::load_from_path(path)?;
                    let armature = armature.as_deref().map(|p| node_at(&tree, Some(p))).transpose()?;
                    let root = tree.root();
                    dests.push(Destination { label: label_of(path), tree, root, armature });
                }
                let batch = builder.build_batch(&mut dests, &records);
                for report in &batch.built {
                    print_report(report);
                }
                for (label, e) in &batch.skipped {
                    println!("{label}: skipped ({e})");
                }
                println!("total: {}", batch.stats());
                for d in &dests {
                    if batch.skipped.iter().all(|(label, _)| label != &d.label) {
                        write_scene(out_dir.as_deref(), &d.tree, d.root)?;
                    }
                }
            }
        }
        Command::Resolve { scene, armature, name, path, slot, skip } => {
            let tree = scene::load_from_path(&scene)?;
            let root = match armature {
                Some(p) => node_at(&tree, Some(&p))?,
                None => detected_root(&tree)?,
            };
            let mut enabled = Strategies::all();
            for s in &skip {
                enabled.remove(s.flag());
            }
            let mut reference = Reference::new(&name, &path);
            if let Some(slot) = slot {
                reference = reference.with_slot(slot);
            }
            let mut cache = PathIndexCache::new();
            match resolve_reference(&tree, root, &reference, enabled, &mut cache) {
                Some(hit) => println!("{} via {}", tree.path(hit.node), hit.strategy),
                None => println!("unresolved: {reference}"),
            }
        }
        Command::Dump { scene, root, activate } => {
            let mut tree = scene::load_from_path(&scene)?;
            let root = node_at(&tree, root.as_deref())?;
            if activate {
                let report = activate_all(&mut tree, root, &mut MarkActive);
                println!("activation: {report}");
            }
            for line in dump_bindings(&tree, root) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_flags_map_to_filter_directives() {
        assert_eq!(log_directive(0, false), None);
        assert_eq!(log_directive(1, false), Some("info"));
        assert_eq!(log_directive(3, false), Some("debug"));
        assert_eq!(log_directive(2, true), Some("error"));
    }

    #[test]
    fn parses_build_with_repeated_destinations() {
        let cli = Cli::try_parse_from(["rigmap", "-vv", "build", "r.yaml", "a.yaml", "b.yaml", "--preview"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.cmd {
            Command::Build { destinations, preview, .. } => {
                assert_eq!(destinations, vec!["a.yaml", "b.yaml"]);
                assert!(preview);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["rigmap", "build", "r.yaml"]).is_err());
    }
}
