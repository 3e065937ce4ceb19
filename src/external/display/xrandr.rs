use super::{Brightness, DisplayBackend, Output};
use anyhow::Result;
use async_trait::async_trait;
use std::{path::PathBuf, process::Stdio};
use thiserror::Error;
use tokio::process::Command;

/// Failures of the xrandr utility or of understanding its output.
#[derive(Debug, Error)]
pub enum XrandrError {
    #[error("failed to execute {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("output {0} is not present in xrandr's report")]
    UnknownOutput(String),
    #[error("couldn't parse brightness of output {output} from {line:?}")]
    Parse { output: String, line: String },
}

/// A [DisplayBackend] which drives the X server through the `xrandr` utility.
///
/// Brightness here is xrandr's software brightness, a scaling factor applied
/// to the output's gamma ramps, not the panel backlight.
#[derive(Debug, Clone)]
pub struct XrandrBackend {
    program: PathBuf,
    debug: bool,
}

impl XrandrBackend {
    /// Create a backend running the xrandr binary at `program`. With `debug`
    /// set, every command line and its stdout are logged.
    pub fn new(program: impl Into<PathBuf>, debug: bool) -> XrandrBackend {
        XrandrBackend {
            program: program.into(),
            debug,
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, XrandrError> {
        let command = format!("{} {}", self.program.display(), args.join(" "));
        let out = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| XrandrError::Spawn {
                command: command.clone(),
                source,
            })?;
        if !out.status.success() {
            return Err(XrandrError::Failed {
                command,
                status: out.status,
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
            });
        }
        let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
        if self.debug {
            log::debug!("Command executed successfully: {}", command);
            log::debug!("Stdout: {}", stdout);
        }
        Ok(stdout)
    }
}

#[async_trait]
impl DisplayBackend for XrandrBackend {
    async fn list_outputs(&self) -> Result<Vec<Output>> {
        let report = self.run(&["--query"]).await?;
        Ok(parse_connected_outputs(&report))
    }

    async fn get_brightness(&self, output: &str) -> Result<Brightness> {
        let report = self.run(&["--verbose"]).await?;
        Ok(parse_brightness(&report, output)?)
    }

    async fn set_brightness(&self, output: &str, value: Brightness) -> Result<String> {
        let value = value.to_string();
        self.run(&["--output", output, "--brightness", &value])
            .await?;
        Ok(format!("Brightness set for {}: {}", output, value))
    }
}

/// Names of connected outputs in an `xrandr --query` report, in report order.
pub fn parse_connected_outputs(report: &str) -> Vec<Output> {
    report
        .lines()
        .filter(|line| line.contains(" connected"))
        .filter_map(|line| line.split_whitespace().next())
        .map(|name| name.to_owned())
        .collect()
}

/// Find the `Brightness:` property of `output` in an `xrandr --verbose` report.
///
/// Output headers start at the beginning of a line, their properties are
/// indented below them. Values outside of the supported range (xrandr happily
/// accepts e.g. 1.5) are clamped.
pub fn parse_brightness(report: &str, output: &str) -> Result<Brightness, XrandrError> {
    let mut in_block = false;
    let mut seen = false;
    for line in report.lines() {
        if !line.starts_with(char::is_whitespace) {
            in_block = line.split_whitespace().next() == Some(output);
            seen |= in_block;
            continue;
        }
        if !in_block {
            continue;
        }
        if let Some(raw) = line.trim().strip_prefix("Brightness:") {
            let parse_error = || XrandrError::Parse {
                output: output.to_owned(),
                line: line.trim().to_owned(),
            };
            let value: f64 = raw.trim().parse().map_err(|_| parse_error())?;
            return Brightness::from_control(value).map_err(|_| parse_error());
        }
    }
    if seen {
        Err(XrandrError::Parse {
            output: output.to_owned(),
            line: String::new(),
        })
    } else {
        Err(XrandrError::UnknownOutput(output.to_owned()))
    }
}
