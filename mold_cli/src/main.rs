use mold_io::AssetRoot;
use mold_project::{ProjectConfig, load_project_toml};
use mold_reconcile::{
    BatchReport, Candidate, CompareOutcome, Comparison, Reconciler, Transaction, comparisons,
    journal_json,
};
use mold_runtime::World;
use mold_scene::{parse_scene, write_scene};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let Some(command) = args.get(1).map(String::as_str) else {
        print_usage();
        std::process::exit(2);
    };

    let result = match command {
        "scan" => scan_command(&args, &cwd),
        "compare" => compare_command(&args, &cwd),
        "revert" => revert_command(&args, &cwd),
        "replace" => replace_command(&args, &cwd),
        "replace-all" => replace_all_command(&args, &cwd),
        _ => {
            print_usage();
            eprintln!("unknown command `{command}`");
            std::process::exit(2);
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  mold_cli scan [--path <project_dir>]");
    eprintln!("  mold_cli compare [--path <project_dir>]");
    eprintln!("  mold_cli revert [--path <project_dir>] [--only a,b] [--write] [--journal <file>]");
    eprintln!("  mold_cli replace [--path <project_dir>] [--only a,b] [--write] [--journal <file>]");
    eprintln!("  mold_cli replace-all [--path <project_dir>] [--only a,b] [--write] [--journal <file>]");
}

fn parse_flag_value(args: &[String], flag: &str) -> Option<String> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1).cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_only(args: &[String]) -> Option<Vec<String>> {
    parse_flag_value(args, "--only").map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

/// Loaded project state shared by every command.
struct Session {
    config: ProjectConfig,
    assets: AssetRoot,
    world: World,
    reconciler: Reconciler<AssetRoot>,
}

fn open_session(args: &[String], cwd: &Path) -> Result<Session, String> {
    let project_dir = parse_flag_value(args, "--path")
        .map(|p| cwd.join(p))
        .unwrap_or_else(|| cwd.to_path_buf());
    let config = load_project_toml(&project_dir).map_err(|err| {
        format!(
            "failed to load {} in {}: {err}",
            mold_project::PROJECT_FILE,
            project_dir.display()
        )
    })?;
    let assets = AssetRoot::new(&project_dir);

    let source = assets
        .load_string(&config.scene)
        .map_err(|err| format!("failed to read scene {}: {err}", config.scene))?;
    let scene = parse_scene(&source).map_err(|err| format!("{}: {err}", config.scene))?;
    let mut world = World::new();
    world
        .load_scene(&scene)
        .map_err(|err| format!("{}: {err}", config.scene))?;

    let reconciler =
        Reconciler::from_project(&config, assets.clone()).map_err(|err| err.to_string())?;
    log::info!(
        "project `{}`: {} catalog entries, {} nodes",
        config.name,
        reconciler.catalog().len(),
        world.len()
    );

    Ok(Session {
        config,
        assets,
        world,
        reconciler,
    })
}

fn describe_candidate(c: &Candidate) -> String {
    match c.matched.as_deref() {
        Some(template) => format!("{} `{}` -> {template}", c.node, c.display_name),
        None => format!("{} `{}` (found, unmapped)", c.node, c.display_name),
    }
}

fn scan_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let session = open_session(args, cwd)?;
    let candidates = session
        .reconciler
        .scan_world(&session.world)
        .map_err(|err| err.to_string())?;
    for c in &candidates {
        println!("{}", describe_candidate(c));
    }
    let unmapped = candidates.iter().filter(|c| !c.is_mapped()).count();
    println!(
        "{} candidates ({} mapped, {unmapped} unmapped)",
        candidates.len(),
        candidates.len() - unmapped
    );
    Ok(())
}

fn compare_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let session = open_session(args, cwd)?;
    let candidates = session
        .reconciler
        .scan_world(&session.world)
        .map_err(|err| err.to_string())?;
    let outcomes = session.reconciler.compare_all(&candidates);

    let mut flagged = 0;
    for outcome in &outcomes {
        match outcome {
            CompareOutcome::Compared(c) => {
                if c.has_differences() {
                    flagged += 1;
                }
                println!("{}", describe_comparison(c));
            }
            CompareOutcome::Unmatched(c) => println!("{}", describe_candidate(c)),
            CompareOutcome::TemplateUnresolvable { candidate, error } => {
                println!("{} `{}`: {error}", candidate.node, candidate.display_name)
            }
        }
    }
    println!("{flagged} of {} candidates flagged", outcomes.len());
    Ok(())
}

fn describe_comparison(c: &Comparison) -> String {
    let mark = |differs: bool| if differs { "!" } else { " " };
    format!(
        "{} `{}` -> {}: position {}{:.4}  rotation {}{:.3}deg  scale {}{:.4}",
        c.candidate.node,
        c.candidate.display_name,
        c.template,
        mark(c.position_differs),
        c.position_delta,
        mark(c.rotation_differs),
        c.rotation_delta,
        mark(c.scale_differs),
        c.scale_delta,
    )
}

/// Flagged comparisons, restricted to `--only` templates when given.
fn selected_comparisons(session: &Session, args: &[String]) -> Result<Vec<Comparison>, String> {
    let candidates = session
        .reconciler
        .scan_world(&session.world)
        .map_err(|err| err.to_string())?;
    let mut results = comparisons(session.reconciler.compare_all(&candidates));
    if let Some(only) = parse_only(args) {
        for r in results.iter_mut() {
            if !only.contains(&r.template) {
                r.set_selected(false);
            }
        }
    }
    Ok(results)
}

fn revert_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let mut session = open_session(args, cwd)?;
    let results = selected_comparisons(&session, args)?;
    let mut host: Vec<Transaction> = Vec::new();
    let report = session
        .reconciler
        .revert(&mut session.world, &results, &mut host);
    finish_batch(&mut session, args, &report, &host)
}

fn replace_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let mut session = open_session(args, cwd)?;
    let results = selected_comparisons(&session, args)?;
    let mut host: Vec<Transaction> = Vec::new();
    let report = session
        .reconciler
        .replace(&mut session.world, &results, &mut host);
    finish_batch(&mut session, args, &report, &host)
}

fn replace_all_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let mut session = open_session(args, cwd)?;
    let mut candidates = session
        .reconciler
        .scan_world(&session.world)
        .map_err(|err| err.to_string())?;
    if let Some(only) = parse_only(args) {
        candidates.retain(|c| c.matched.as_ref().is_some_and(|m| only.contains(m)));
    }
    let mut host: Vec<Transaction> = Vec::new();
    let report = session
        .reconciler
        .replace_all(&mut session.world, &candidates, &mut host);
    finish_batch(&mut session, args, &report, &host)
}

fn finish_batch(
    session: &mut Session,
    args: &[String],
    report: &BatchReport,
    host: &[Transaction],
) -> Result<(), String> {
    for item in &report.items {
        println!("{} `{}`: {}", item.node, item.name, item.outcome);
    }
    println!("{report}");

    let remaining = session
        .reconciler
        .flagged_count(&session.world, session.world.root())
        .map_err(|err| err.to_string())?;
    println!("{remaining} flagged after batch");

    if let Some(path) = parse_flag_value(args, "--journal") {
        let json = journal_json(host).map_err(|err| format!("failed to encode journal: {err}"))?;
        fs::write(&path, json).map_err(|err| format!("failed to write {path}: {err}"))?;
        println!("journal written to {path}");
    }

    if has_flag(args, "--write") {
        if !session.world.has_unsaved_changes() {
            println!("no changes to write");
            return Ok(());
        }
        let Some(scene) = session.world.to_scene(session.world.root()) else {
            return Err("scene root vanished".to_string());
        };
        let saved = session
            .assets
            .save_string(&session.config.scene, &write_scene(&scene))
            .map_err(|err| format!("failed to write {}: {err}", session.config.scene))?;
        session.world.clear_dirty();
        println!("saved {}", saved.display());
    }
    Ok(())
}
