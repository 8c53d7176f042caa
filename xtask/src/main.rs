//! Workspace automation: man pages and shell completions.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation tasks")]
struct Xtask {
    #[command(subcommand)]
    task: Task,
}

#[derive(Subcommand)]
enum Task {
    /// Render the man page for the `licitacoes` binary
    Man {
        /// Output directory
        #[arg(long, default_value = "target/man")]
        out_dir: PathBuf,
    },
    /// Generate shell completion scripts
    Completions {
        /// Output directory
        #[arg(long, default_value = "target/completions")]
        out_dir: PathBuf,
        /// Only this shell (default: all supported shells)
        #[arg(long, value_enum)]
        shell: Option<Shell>,
    },
}

fn workspace_root() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap_or_else(|| Path::new("."))
}

fn man(out_dir: &Path) -> Result<(), String> {
    fs::create_dir_all(out_dir).map_err(|e| format!("failed to create {}: {e}", out_dir.display()))?;
    let cmd = licitacoes::command();
    let path = out_dir.join("licitacoes.1");
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd)
        .render(&mut buffer)
        .map_err(|e| format!("failed to render man page: {e}"))?;
    fs::write(&path, buffer).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}

fn completions(out_dir: &Path, shell: Option<Shell>) -> Result<(), String> {
    fs::create_dir_all(out_dir).map_err(|e| format!("failed to create {}: {e}", out_dir.display()))?;
    let shells = shell.map_or_else(
        || vec![Shell::Bash, Shell::Elvish, Shell::Fish, Shell::PowerShell, Shell::Zsh],
        |s| vec![s],
    );
    for shell in shells {
        let mut cmd = licitacoes::command();
        let path = clap_complete::generate_to(shell, &mut cmd, "licitacoes", out_dir)
            .map_err(|e| format!("failed to generate {shell} completions: {e}"))?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let xtask = Xtask::parse();
    let root = workspace_root();

    let result = match xtask.task {
        Task::Man { out_dir } => man(&root.join(out_dir)),
        Task::Completions { out_dir, shell } => completions(&root.join(out_dir), shell),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
