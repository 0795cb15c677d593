//! simfs CLI - an interactive shell over the in-memory filesystem.
//!
//! Usage:
//!   simfs [OPTIONS] [SCRIPT]
//!
//! Examples:
//!   simfs                            # Interactive shell
//!   simfs --user alice               # Create alice and log in first
//!   simfs session.sfs                # Run commands from a file, then exit
//!   simfs -c 'mkdir docs' -c ls      # Run commands, then exit
//!   simfs --json -c 'mkdir a' -c ls  # Print listings as JSON
//!   simfs --default-perm r--         # New files start read-only

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use clap::Parser;
use crossterm::tty::IsTty;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use simfs_core::{Filesystem, FsConfig, Permission};

use simfs_cli::{Flow, Shell, StdConsole};

/// In-memory filesystem shell
#[derive(Parser, Debug)]
#[command(name = "simfs")]
#[command(about = "Simulated in-memory filesystem shell")]
struct Args {
    /// Script file with one command per line
    script: Option<PathBuf>,

    /// Command to run (repeatable); the shell exits afterwards
    #[arg(short = 'c', long = "command")]
    commands: Vec<String>,

    /// Create this user and log in before reading commands
    #[arg(short, long)]
    user: Option<String>,

    /// Flags given to newly created files, e.g. `rw-`
    #[arg(long, value_name = "rwx")]
    default_perm: Option<Permission>,

    /// Print `ls` and `stat` output as JSON
    #[arg(long)]
    json: bool,

    /// Disable coloured output
    #[arg(long)]
    no_color: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    trace: bool,
}

impl Args {
    fn fs_config(&self) -> FsConfig {
        match self.default_perm {
            Some(permission) => FsConfig::default().with_default_permission(permission),
            None => FsConfig::default(),
        }
    }
}

/// Install the stderr log subscriber.
fn init_tracing(trace: bool) {
    let default_level = if trace { "debug" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Read a script file, dropping a leading shebang line.
fn read_script(path: &Path) -> io::Result<String> {
    let source = std::fs::read_to_string(path)?;
    if source.starts_with("#!") {
        Ok(source.lines().skip(1).collect::<Vec<_>>().join("\n"))
    } else {
        Ok(source)
    }
}

/// Read lines from stdin until `exit` or end of input.
fn run_interactive(mut shell: Shell<StdConsole>) -> io::Result<()> {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        shell.show_prompt();
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            // End of input
            println!();
            break;
        }
        if shell.handle_line(&line) == Flow::Exit {
            break;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(args.trace);

    let mut fs = Filesystem::with_config(args.fs_config());
    if let Some(name) = &args.user {
        fs.create_user(name)?;
        fs.login(name)?;
    }

    let color = !args.no_color && io::stdout().is_tty();
    let mut shell = Shell::new(fs, StdConsole::new(color)).with_json(args.json);

    // Batch mode: script first, then -c commands
    if args.script.is_some() || !args.commands.is_empty() {
        if let Some(path) = &args.script {
            let source = read_script(path)?;
            if shell.run_script(&source) == Flow::Exit {
                return Ok(());
            }
        }
        shell.run_lines(&args.commands);
        return Ok(());
    }

    println!("----- simfs shell -----");
    println!("Type 'help' for commands, 'exit' or 'quit' to leave.");

    // The read loop blocks on stdin, so it runs off the async runtime
    let repl = tokio::task::spawn_blocking(move || run_interactive(shell));

    tokio::select! {
        result = repl => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("bye");
            // The blocking reader cannot be cancelled; exit without waiting on it
            std::process::exit(0);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    use simfs_cli::BufferConsole;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "simfs", "--user", "alice", "-c", "ls", "-c", "pwd", "--json",
        ]);
        assert_eq!(args.user.as_deref(), Some("alice"));
        assert_eq!(args.commands, ["ls", "pwd"]);
        assert!(args.json);
        assert!(args.script.is_none());
    }

    #[test]
    fn test_default_perm_reaches_new_files() {
        let args = Args::parse_from(["simfs", "--default-perm", "r--"]);
        assert_eq!(args.fs_config().default_permission.to_string(), "r--");

        let fs = Filesystem::with_config(args.fs_config());
        let mut shell = Shell::new(fs, BufferConsole::new());
        shell.run_script("useradd alice\nlogin alice\ntouch f\nopen f\nwrite hi");
        assert_eq!(
            shell.console().lines().last().map(String::as_str),
            Some("access denied: user 'alice' may not write 'f'")
        );
        assert_eq!(shell.fs().file_info("f").unwrap().size, 0);
    }

    #[test]
    fn test_default_perm_defaults_and_rejects_garbage() {
        let args = Args::parse_from(["simfs"]);
        assert_eq!(args.fs_config(), FsConfig::default());
        assert!(Args::try_parse_from(["simfs", "--default-perm", "abc"]).is_err());
    }

    #[test]
    fn test_read_script_strips_shebang() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "#!/usr/bin/env simfs").unwrap();
        writeln!(file, "mkdir docs").unwrap();
        writeln!(file, "cd docs").unwrap();

        let source = read_script(file.path()).unwrap();
        assert_eq!(source, "mkdir docs\ncd docs");

        let mut shell = Shell::new(Filesystem::new(), BufferConsole::new());
        assert_eq!(shell.run_script(&source), Flow::Continue);
        assert_eq!(shell.fs().current_path(), "/docs");
    }

    #[test]
    fn test_read_script_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_script(&dir.path().join("missing.sfs")).is_err());
    }
}
