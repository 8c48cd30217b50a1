use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use git_linestage::{
    DeletionPolicy, GitRepo, LineStageError, Move, SessionId, StageMode, StageOutcome, Stager,
    StagerConfig, TextViewport,
};
use std::io::{self, BufRead};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const VIEW_WIDTH: usize = 120;

#[derive(Parser)]
#[command(name = "git-linestage", version)]
#[command(about = "Stage single lines or hunks of a file's unstaged changes")]
struct Cli {
    /// Repository to operate on
    #[arg(short = 'C', global = true, default_value = ".")]
    repo: PathBuf,

    /// Lines of context in the diff being staged from
    #[arg(long, global = true, default_value_t = 3)]
    context: u32,

    /// What line staging does with deletions that were not selected
    #[arg(long, global = true, value_enum, default_value_t = DeletionPolicy::AsContext)]
    deletion_policy: DeletionPolicy,

    /// Rows shown by `walk`
    #[arg(long, global = true, default_value_t = 20)]
    height: usize,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the diff with stageable lines numbered
    Show { file: String },
    /// Stage one line, by its number from `show`
    StageLine { file: String, index: usize },
    /// Stage the hunk holding a line, by the line's number from `show`
    StageHunk { file: String, index: usize },
    /// Print the patch staging a line would apply, without applying it
    Patch {
        file: String,
        index: usize,
        /// Build the patch for the whole hunk instead
        #[arg(long)]
        hunk: bool,
    },
    /// Step through a file's changes, reading commands from stdin
    ///
    /// j/k: next/previous line, J/K: next/previous hunk,
    /// s: stage line, S: stage hunk, q: quit
    Walk { file: String },
    /// Generate shell completions
    Completions { shell: Shell },
    /// Generate a man page
    Man,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut stager = Stager::new(
        GitRepo::new(&cli.repo, cli.context),
        StagerConfig {
            deletion_policy: cli.deletion_policy,
        },
    );

    match cli.command {
        Commands::Show { file } => show(&mut stager, &file)?,
        Commands::StageLine { file, index } => {
            stage(&mut stager, &file, index, StageMode::Line)?
        }
        Commands::StageHunk { file, index } => {
            stage(&mut stager, &file, index, StageMode::Hunk)?
        }
        Commands::Patch { file, index, hunk } => {
            let id = stager.start(&file)?;
            stager.select(id, index)?;
            let mode = if hunk { StageMode::Hunk } else { StageMode::Line };
            print!("{}", stager.patch(id, mode)?);
        }
        Commands::Walk { file } => walk(&mut stager, &file, cli.height)?,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "git-linestage", &mut io::stdout());
        }
        Commands::Man => clap_mangen::Man::new(Cli::command()).render(&mut io::stdout())?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("GIT_LINESTAGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn show(stager: &mut Stager<GitRepo>, file: &str) -> Result<(), LineStageError> {
    stager.start(file)?;
    let Some(session) = stager.session() else {
        return Ok(());
    };

    let diff = session.diff();
    for (n, line) in diff.lines().iter().enumerate() {
        if let Ok(index) = diff.stageable_lines().binary_search(&n) {
            println!("{index:>5} {line}");
        } else if let Ok(hunk) = diff.hunk_starts().binary_search(&n) {
            println!("{:>5} {line}", format!("h{hunk}"));
        } else {
            println!("      {line}");
        }
    }

    stager.escape();
    Ok(())
}

fn stage(
    stager: &mut Stager<GitRepo>,
    file: &str,
    index: usize,
    mode: StageMode,
) -> Result<(), LineStageError> {
    let id = stager.start(file)?;
    let line = stager.select(id, index)?;

    match stager.stage(id, mode)? {
        StageOutcome::Continued => {
            eprintln!("Staged {file} (diff line {line})");
            stager.escape();
        }
        StageOutcome::Finished => eprintln!("Staged {file}; nothing left to stage"),
    }

    Ok(())
}

enum Action {
    Go(Move),
    Stage(StageMode),
    Quit,
}

fn parse_action(command: &str) -> Option<Action> {
    Some(match command {
        "j" => Action::Go(Move::NextLine),
        "k" => Action::Go(Move::PrevLine),
        "J" => Action::Go(Move::NextHunk),
        "K" => Action::Go(Move::PrevHunk),
        "s" => Action::Stage(StageMode::Line),
        "S" => Action::Stage(StageMode::Hunk),
        "q" => Action::Quit,
        _ => return None,
    })
}

fn walk(stager: &mut Stager<GitRepo>, file: &str, height: usize) -> Result<(), LineStageError> {
    let id = stager.start(file)?;
    render(stager, id, height)?;

    for command in io::stdin().lock().lines() {
        let Ok(command) = command else { break };
        let command = command.trim();
        if command.is_empty() {
            continue;
        }

        match parse_action(command) {
            Some(Action::Go(step)) => {
                stager.navigate(id, step)?;
            }
            Some(Action::Stage(mode)) => match stager.stage(id, mode) {
                Ok(StageOutcome::Continued) => {}
                Ok(StageOutcome::Finished) => {
                    println!("-- nothing left to stage in {file} --");
                    return Ok(());
                }
                Err(LineStageError::PatchApply { stderr }) => eprintln!("{stderr}"),
                Err(e) => return Err(e),
            },
            Some(Action::Quit) => break,
            None => {
                eprintln!("unknown command: {command}");
                continue;
            }
        }

        render(stager, id, height)?;
    }

    stager.escape();
    Ok(())
}

fn render(stager: &Stager<GitRepo>, id: SessionId, height: usize) -> Result<(), LineStageError> {
    let Some(session) = stager.session() else {
        return Ok(());
    };

    let mut view = TextViewport::new(session.display_text(), VIEW_WIDTH, height);
    stager.focus(id, &mut view)?;

    print!("{}", view.render());
    println!(
        "-- {} {}/{} --",
        session.file(),
        session.current_index() + 1,
        session.diff().stageable_lines().len()
    );
    Ok(())
}
