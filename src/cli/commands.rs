//! Command dispatch

use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::{
    collect, compare, same_with, CompareOptions, Comparison, CountMode, SideReport,
};
use crate::cli::args::{Cli, Commands, ConfigCommands, TreeArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::{Tree, TreeNodeConvert};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        None => run_exercise(&load_settings(cli)?),
        Some(Commands::Same {
            seed_a,
            seed_b,
            tree,
            strategy,
            fixed,
            capacity,
            timeout_ms,
            report,
        }) => {
            let mut options = load_settings(cli)?.to_options();
            if let Some(strategy) = strategy {
                options.strategy = *strategy;
            }
            if let Some(n) = fixed {
                if *n == 0 {
                    return Err(CliError::InvalidArgs("--fixed must be positive".into()));
                }
                options.count_mode = CountMode::Fixed(*n);
            }
            if let Some(capacity) = capacity {
                options.capacity = *capacity;
            }
            if let Some(ms) = timeout_ms {
                options.recv_timeout = (*ms > 0).then(|| std::time::Duration::from_millis(*ms));
            }
            run_same(*seed_a, *seed_b, tree, &options, *report)
        }
        Some(Commands::Walk { seed, tree }) => run_walk(*seed, tree, &load_settings(cli)?),
        Some(Commands::Show { seed, tree }) => run_show(*seed, tree),
        Some(Commands::Config { command }) => run_config(cli, command),
        Some(Commands::Completion { shell }) => write_completion(*shell, &mut io::stdout().lock()),
    }
}

/// Renders the completion script first so a failing writer surfaces as an I/O error.
fn write_completion(shell: Shell, out: &mut impl Write) -> CliResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let mut script = Vec::new();
    generate(shell, &mut cmd, name, &mut script);
    out.write_all(&script)?;
    out.flush()?;
    Ok(())
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let settings = Settings::load(cli.config.as_deref())?;
    debug!(?settings, "settings loaded");
    Ok(settings)
}

/// Builds the tree for `seed` as described by the tree arguments.
pub fn build_tree(seed: i32, args: &TreeArgs) -> CliResult<Tree> {
    let tree = if args.shuffle {
        Tree::shuffled(seed, args.size, &mut rand::thread_rng())?
    } else {
        Tree::balanced(seed, args.size)?
    };
    Ok(tree)
}

/// The exercise driver: a tree against its twin, then against another seed.
#[instrument(skip(settings))]
fn run_exercise(settings: &Settings) -> CliResult<()> {
    let options = settings.to_options();
    let t1a = Tree::new(1);
    let t1b = Tree::new(1);
    let t2 = Tree::new(2);
    output::info(&format!(
        "same(tree(1), tree(1)) -> {}",
        same_with(&t1a, &t1b, &options)
    ));
    output::info(&format!(
        "same(tree(1), tree(2)) -> {}",
        same_with(&t1a, &t2, &options)
    ));
    Ok(())
}

#[instrument(skip(tree_args, options))]
fn run_same(
    seed_a: i32,
    seed_b: i32,
    tree_args: &TreeArgs,
    options: &CompareOptions,
    report: bool,
) -> CliResult<()> {
    let left = build_tree(seed_a, tree_args)?;
    let right = build_tree(seed_b, tree_args)?;
    let comparison = compare(&left, &right, options)?;

    let label = format!("tree({seed_a}) vs tree({seed_b})");
    if comparison.equivalent {
        output::success(&format!("{label}: same"));
    } else {
        output::failure(&format!("{label}: different"));
    }
    if report {
        print_report(&comparison);
    }
    Ok(())
}

fn print_report(comparison: &Comparison) {
    for (name, side) in [("left", &comparison.left), ("right", &comparison.right)] {
        output::header(name);
        output::detail(&format_side(side));
    }
    if let Some(index) = comparison.first_divergence {
        output::action("first divergence at index", &index);
    }
}

fn format_side(side: &SideReport) -> String {
    format!(
        "[{}] sent={} received={}{}",
        side.values.iter().join(", "),
        side.sent(),
        side.received(),
        if side.walk.is_completed() {
            ""
        } else {
            " (walk abandoned)"
        }
    )
}

#[instrument(skip(tree_args, settings))]
fn run_walk(seed: i32, tree_args: &TreeArgs, settings: &Settings) -> CliResult<()> {
    let tree = build_tree(seed, tree_args)?;
    let walked = collect(&tree, &settings.to_options())?;
    output::info(&walked.values.iter().join(" "));
    debug!(sent = walked.sent(), received = walked.received(), "walk collected");
    Ok(())
}

fn run_show(seed: i32, tree_args: &TreeArgs) -> CliResult<()> {
    let tree = build_tree(seed, tree_args)?;
    output::info(&tree.to_tree_string());
    output::detail(&format!("nodes={} depth={}", tree.len(), tree.depth()));
    Ok(())
}

fn run_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => match global_config_path() {
            Some(path) => output::info(&path.display()),
            None => output::info(&"no config directory available"),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::WalkOutcome;
    use crate::exitcode;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn given_bash_when_writing_completion_then_script_names_binary() {
        let mut out = Vec::new();

        write_completion(Shell::Bash, &mut out).unwrap();

        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("treewalk"));
    }

    #[test]
    fn given_closed_pipe_when_writing_completion_then_io_exit_code() {
        let err = write_completion(Shell::Zsh, &mut ClosedPipe).unwrap_err();

        assert!(matches!(err, CliError::Io(_)));
        assert_eq!(err.exit_code(), exitcode::IOERR);
    }

    #[test]
    fn given_abandoned_walk_when_formatting_side_then_marks_it() {
        let side = SideReport {
            values: vec![1, 2],
            walk: WalkOutcome::Abandoned { sent: 3 },
        };
        assert_eq!(format_side(&side), "[1, 2] sent=3 received=2 (walk abandoned)");
    }

    #[test]
    fn given_shuffle_flag_when_building_tree_then_content_is_unchanged() {
        let args = TreeArgs {
            size: 25,
            shuffle: true,
        };
        let tree = build_tree(4, &args).unwrap();
        assert_eq!(tree.len(), 25);
        assert!(tree.values().eq((1..=25).map(|k| 4 * k)));
    }
}
