//! Command dispatch for the simfs shell.
//!
//! A line is split on whitespace; the first word picks the command and the
//! rest are its arguments. Each command maps onto one `Filesystem` call and
//! prints the result. Failures are printed and the shell keeps going.

use simfs_core::{Access, DirChange, FileInfo, Filesystem, FsError, Listing, Permission};
use thiserror::Error;

use crate::console::ShellConsole;

const HELP: &str = "\
Commands:
-------------------------
[system]
  help               : show this help
  exit, quit         : leave the shell

[users]
  useradd <name>     : create a user
  login <name>       : log in
  logout             : log out
  whoami             : show the logged-in user
  users              : list users

[directories]
  pwd                : show the current path
  ls                 : list the current directory
  mkdir <name>       : create a directory
  rmdir <name>       : remove an empty directory
  cd <name|.|..>     : change directory (one level at a time)

[files]
  touch <name>       : create a file (alias: create)
  rm <name>          : delete a file (alias: delete)
  open <name>        : open a file
  close              : close the open file
  read               : print the open file (alias: cat)
  write <text...>    : append a line to the open file
  rename <old> <new> : rename a file (alias: mv)
  chmod <perm> <name>: set owner flags, e.g. rw-
  stat <name>        : show file metadata
-------------------------";

/// Whether the shell should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Why a command did not run.
#[derive(Debug, Error)]
enum CommandError {
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Interactive shell over a [`Filesystem`].
pub struct Shell<C: ShellConsole> {
    fs: Filesystem,
    console: C,
    json: bool,
}

impl<C: ShellConsole> Shell<C> {
    pub fn new(fs: Filesystem, console: C) -> Self {
        Self {
            fs,
            console,
            json: false,
        }
    }

    /// Render `ls` and `stat` as JSON.
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn fs(&self) -> &Filesystem {
        &self.fs
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    /// Prompt text: `[user@/path] $ `, with `guest` when nobody is logged in.
    pub fn prompt(&self) -> String {
        let user = self.fs.current_user().unwrap_or("guest");
        format!("[{}@{}] $ ", user, self.fs.current_path())
    }

    /// Show the prompt on the console.
    pub fn show_prompt(&mut self) {
        let prompt = self.prompt();
        self.console.prompt(&prompt);
    }

    /// Run every line of a script, skipping blank lines and `#` comments.
    /// Stops early at `exit`.
    pub fn run_script(&mut self, source: &str) -> Flow {
        let lines = source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));
        self.run_lines(lines)
    }

    /// Run lines in order until one of them exits.
    pub fn run_lines<I, S>(&mut self, lines: I) -> Flow
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            if self.handle_line(line.as_ref()) == Flow::Exit {
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    /// Parse and execute one line.
    pub fn handle_line(&mut self, line: &str) -> Flow {
        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else {
            return Flow::Continue;
        };
        let args: Vec<&str> = words.collect();
        tracing::debug!(cmd, ?args, "dispatching command");

        match self.dispatch(cmd, &args) {
            Ok(flow) => flow,
            Err(e @ CommandError::Usage(_)) => {
                self.console.print(&e.to_string());
                Flow::Continue
            }
            Err(e) => {
                self.console.error(&format!("error: {e}"));
                Flow::Continue
            }
        }
    }

    fn dispatch(&mut self, cmd: &str, args: &[&str]) -> Result<Flow, CommandError> {
        match cmd {
            "exit" | "quit" => {
                self.console.print("bye");
                return Ok(Flow::Exit);
            }
            "help" => self.console.print(HELP),

            "useradd" => {
                let name = arg(args, 0, "useradd <name>")?;
                self.fs.create_user(name)?;
                self.console.print(&format!("user '{name}' created"));
            }
            "login" => {
                let name = arg(args, 0, "login <name>")?;
                self.fs.login(name)?;
                self.console.print(&format!("user '{name}' logged in"));
            }
            "logout" => {
                self.fs.logout()?;
                self.console.print("logged out");
            }
            "whoami" => match self.fs.current_user() {
                Some(name) => self.console.print(name),
                None => self.console.print("not logged in"),
            },
            "users" => {
                let names: Vec<String> = self.fs.users().map(str::to_string).collect();
                for name in names {
                    self.console.print(&name);
                }
            }

            "pwd" => {
                let path = self.fs.current_path();
                self.console.print(&path);
            }
            "ls" => {
                let listing = self.fs.list_directory()?;
                self.print_listing(&listing)?;
            }
            "mkdir" => {
                let name = arg(args, 0, "mkdir <name>")?;
                self.fs.make_directory(name)?;
            }
            "rmdir" => {
                let name = arg(args, 0, "rmdir <name>")?;
                self.fs.remove_directory(name)?;
                self.console.print(&format!("directory '{name}' removed"));
            }
            "cd" => {
                let token = arg(args, 0, "cd <name> (. and .. supported)")?;
                if self.fs.change_directory(token)? == DirChange::AtRoot {
                    self.console.warn("already at the root directory");
                }
            }

            "touch" | "create" => {
                let name = arg(args, 0, "touch <name>")?;
                self.fs.create_file(name)?;
            }
            "rm" | "delete" => {
                let name = arg(args, 0, "rm <name>")?;
                self.fs.delete_file(name)?;
                self.console.print(&format!("file '{name}' deleted"));
            }
            "open" => {
                let name = arg(args, 0, "open <name>")?;
                self.fs.open_file(name)?;
                self.console.print(&format!(
                    "file '{name}' opened (use 'write', 'read', 'close')"
                ));
            }
            "close" => {
                self.fs.close_file()?;
                self.console.print("file closed");
            }
            "read" | "cat" => match self.fs.read_file()? {
                Access::Granted(content) => {
                    let content = content.strip_suffix('\n').unwrap_or(&content);
                    if !content.is_empty() {
                        self.console.print(content);
                    }
                }
                Access::Denied(denied) => self.console.warn(&denied.to_string()),
            },
            "write" => {
                if args.is_empty() {
                    return Err(CommandError::Usage("write <text...>"));
                }
                let mut content = args.join(" ");
                content.push('\n');
                match self.fs.write_file(&content)? {
                    Access::Granted(()) => self.console.print("written"),
                    Access::Denied(denied) => self.console.warn(&denied.to_string()),
                }
            }
            "rename" | "mv" => {
                let usage = "rename <old> <new>";
                let old = arg(args, 0, usage)?;
                let new = arg(args, 1, usage)?;
                self.fs.rename_file(old, new)?;
                self.console.print(&format!("file '{old}' renamed to '{new}'"));
            }
            "chmod" => {
                let usage = "chmod <perm> <name>";
                let perm: Permission = arg(args, 0, usage)?.parse()?;
                let name = arg(args, 1, usage)?;
                self.fs.set_permission(name, perm)?;
            }
            "stat" => {
                let name = arg(args, 0, "stat <name>")?;
                let info = self.fs.file_info(name)?;
                self.print_info(&info)?;
            }

            other => self.console.error(&format!("unknown command: {other}")),
        }
        Ok(Flow::Continue)
    }

    fn print_listing(&mut self, listing: &Listing) -> Result<(), CommandError> {
        if self.json {
            let json = serde_json::to_string_pretty(listing)?;
            self.console.print(&json);
            return Ok(());
        }

        self.console.print(&format!("path: {}", listing.path));
        if listing.is_empty() {
            return Ok(());
        }
        self.console.print("--- directories ---");
        for dir in &listing.directories {
            self.console.print(&format!("- {dir}"));
        }
        self.console.print("--- files ---");
        for file in &listing.files {
            self.console.print(file);
        }
        Ok(())
    }

    fn print_info(&mut self, info: &FileInfo) -> Result<(), CommandError> {
        if self.json {
            let json = serde_json::to_string_pretty(info)?;
            self.console.print(&json);
            return Ok(());
        }

        const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
        self.console.print(&format!("name: {}", info.name));
        self.console.print(&format!("owner: {}", info.owner));
        self.console.print(&format!("size: {}", info.size));
        self.console.print(&format!("permission: {}", info.permission));
        self.console.print(&format!(
            "created: {}",
            info.create_time.format(TIME_FORMAT)
        ));
        self.console.print(&format!(
            "modified: {}",
            info.modify_time.format(TIME_FORMAT)
        ));
        Ok(())
    }
}

/// Positional argument `index`, or a usage error.
fn arg<'a>(args: &[&'a str], index: usize, usage: &'static str) -> Result<&'a str, CommandError> {
    args.get(index).copied().ok_or(CommandError::Usage(usage))
}
