use anyhow::{anyhow, Context};
use regex::Regex;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

use crate::error::{Result, ReviewError};

/// Exit status and combined stdout/stderr of a finished tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub output: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs the transcoding tool. `args` are argument units as produced by
/// [`crate::encode::ffmpeg_full_args`]; the first unit is the tool itself.
pub trait ToolRunner {
    fn run(&self, args: &[String]) -> Result<ToolOutput>;
}

/// Blocking subprocess runner without a shell.
#[derive(Debug, Clone, Default)]
pub struct SubprocessRunner;

impl ToolRunner for SubprocessRunner {
    fn run(&self, args: &[String]) -> Result<ToolOutput> {
        let tokens = command_tokens(args);
        let (program, rest) = tokens
            .split_first()
            .ok_or_else(|| ReviewError::Unsupported("empty command".to_string()))?;

        debug!("Running {} with {} arguments", program, rest.len());
        let output = Command::new(program).args(rest).output()?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ToolOutput {
            code: output.status.code(),
            output: combined,
        })
    }
}

/// Runs the tool and turns a non-zero exit into `ToolFailed`.
pub fn run_checked(runner: &dyn ToolRunner, args: &[String]) -> Result<ToolOutput> {
    let output = runner.run(args)?;
    if !output.success() {
        let tool = args
            .first()
            .map(|t| t.trim_matches('"').to_string())
            .unwrap_or_default();
        return Err(ReviewError::ToolFailed {
            tool,
            code: output.code,
            output: output.output,
        });
    }
    Ok(output)
}

/// Splits argument units into argv tokens with shell quoting rules:
/// single quotes are literal, double quotes allow `\"` and `\\`, and a
/// backslash outside quotes escapes the next character.
pub fn command_tokens(units: &[String]) -> Vec<String> {
    let mut tokens = Vec::new();
    for unit in units {
        split_unit(unit, &mut tokens);
    }
    tokens
}

fn split_unit(unit: &str, tokens: &mut Vec<String>) {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Plain,
        Single,
        Double,
    }

    let mut state = State::Plain;
    let mut current = String::new();
    // Distinguishes `""` (empty token) from no token
    let mut has_token = false;
    let mut chars = unit.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Plain => match c {
                '\'' => {
                    state = State::Single;
                    has_token = true;
                }
                '"' => {
                    state = State::Double;
                    has_token = true;
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                    has_token = true;
                }
                c if c.is_whitespace() => {
                    if has_token {
                        tokens.push(std::mem::take(&mut current));
                        has_token = false;
                    }
                }
                c => {
                    current.push(c);
                    has_token = true;
                }
            },
            State::Single => match c {
                '\'' => state = State::Plain,
                c => current.push(c),
            },
            State::Double => match c {
                '"' => state = State::Plain,
                '\\' => match chars.peek() {
                    Some(&next) if next == '"' || next == '\\' => {
                        current.push(next);
                        chars.next();
                    }
                    _ => current.push('\\'),
                },
                c => current.push(c),
            },
        }
    }

    if has_token {
        tokens.push(current);
    }
}

/// Runs `<ffmpeg> -version` and returns (major, minor, patch).
pub fn check_ffmpeg_version(ffmpeg_path: &str) -> anyhow::Result<(u32, u32, u32)> {
    let output = Command::new(PathBuf::from(ffmpeg_path))
        .arg("-version")
        .output()
        .with_context(|| {
            format!(
                "Failed to execute {} -version. Is ffmpeg installed and in PATH?",
                ffmpeg_path
            )
        })?;

    if !output.status.success() {
        return Err(anyhow!("ffmpeg -version command failed"));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_ffmpeg_version(&stdout)
}

pub fn parse_ffmpeg_version(stdout: &str) -> anyhow::Result<(u32, u32, u32)> {
    // "ffmpeg version 6.1.1", "ffmpeg version n6.1.1-static" or "ffmpeg version 4.4"
    let re = Regex::new(r"ffmpeg version[^\d]*(\d+)\.(\d+)(?:\.(\d+))?")?;

    let caps = re
        .captures(stdout)
        .ok_or_else(|| anyhow!("Failed to parse ffmpeg version from output: {}", stdout))?;

    let major: u32 = caps[1].parse().context("Failed to parse major version")?;
    let minor: u32 = caps[2].parse().context("Failed to parse minor version")?;
    let patch: u32 = match caps.get(3) {
        Some(patch) => patch.as_str().parse().context("Failed to parse patch version")?,
        None => 0,
    };

    Ok((major, minor, patch))
}
