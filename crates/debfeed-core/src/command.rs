//! External process execution.
//!
//! Every tool debfeed drives (`gpg`, `apt-get`, `lsb_release`, the config validator and the
//! service manager) goes through [`CommandRunner`], so tests can substitute a recording fake.

use std::{
    fmt,
    io::{self, Write},
    process::{Command, Output, Stdio},
    thread,
};

use tracing::debug;

/// A single process invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub stdin: Option<Vec<u8>>,
    /// Capture stdout/stderr instead of passing them through to the terminal.
    pub capture: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            capture: true,
            ..Default::default()
        }
    }

    /// Builds an invocation from an argv vector. Returns `None` for an empty vector.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).args(args.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, input: Vec<u8>) -> Self {
        self.stdin = Some(input);
        self
    }

    /// Lets the child write directly to the terminal.
    pub fn passthrough(mut self) -> Self {
        self.capture = false;
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Outcome of a finished process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Short description of a failure, suitable for error messages.
    pub fn failure_reason(&self) -> String {
        let status = match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };
        let stderr = String::from_utf8_lossy(&self.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            status
        } else {
            format!("{status}: {stderr}")
        }
    }
}

pub trait CommandRunner {
    /// Runs `invocation` to completion.
    ///
    /// A non-zero exit is reported through [`CommandOutput::code`], not as an error. Errors are
    /// reserved for failures to start or talk to the process (e.g. the program is missing).
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput>;
}

#[derive(Default, Clone)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        debug!("running: {}", invocation);

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        for (key, value) in &invocation.envs {
            cmd.env(key, value);
        }

        if invocation.capture {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        if invocation.stdin.is_some() {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null());
        }

        let mut child = cmd.spawn()?;
        let pipe = child.stdin.take();

        // stdin is fed from its own thread while the output pipes are drained
        let output = thread::scope(|scope| -> io::Result<Output> {
            let writer = pipe
                .zip(invocation.stdin.as_deref())
                .map(|(mut pipe, input)| scope.spawn(move || pipe.write_all(input)));

            let output = child.wait_with_output()?;
            if let Some(writer) = writer {
                match writer.join() {
                    Ok(Err(err)) if err.kind() != io::ErrorKind::BrokenPipe => return Err(err),
                    Ok(_) => {}
                    Err(_) => return Err(io::Error::other("stdin writer panicked")),
                }
            }
            Ok(output)
        })?;
        debug!("{} exited with {:?}", invocation.program, output.status.code());

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
