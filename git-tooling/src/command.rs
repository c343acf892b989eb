use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;
use std::process::Output;

use tracing::debug;
use which::which;

use crate::errors::GitToolingError;
use crate::errors::Result;

/// Output of a finished command, decoded lossily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandOutput {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// Both streams, for tools that report state on stdout.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

pub(crate) fn ensure_program(program: &'static str) -> Result<()> {
    which(program)
        .map(|_| ())
        .map_err(|_| GitToolingError::ProgramNotFound { program })
}

/// Runs `program args..` in `cwd` and returns its output whatever the exit
/// status.
pub(crate) fn run<I, S>(program: &'static str, cwd: &Path, args: I) -> Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let rendered = render(program, &args);
    debug!(cwd = %cwd.display(), command = %rendered, "running");
    // Output is matched against English messages, so pin the locale.
    let output = Command::new(program)
        .args(&args)
        .current_dir(cwd)
        .env("LC_ALL", "C")
        .output()
        .map_err(|source| GitToolingError::Spawn {
            command: rendered,
            source,
        })?;
    Ok(CommandOutput::from_output(output))
}

/// Like [`run`] but turns a non-zero exit into [`GitToolingError::CommandFailed`].
pub(crate) fn run_checked<I, S>(program: &'static str, cwd: &Path, args: I) -> Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let rendered = render(program, &args);
    let output = run(program, cwd, args)?;
    if output.success {
        Ok(output)
    } else {
        Err(GitToolingError::CommandFailed {
            command: rendered,
            status: output.status,
            stderr: output.stderr.trim().to_string(),
        })
    }
}

fn render<S: AsRef<OsStr>>(program: &str, args: &[S]) -> String {
    let mut rendered = program.to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.as_ref().to_string_lossy());
    }
    rendered
}
