use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::config::RemoteState;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to run {0}: {1}")]
    Spawn(String, #[source] std::io::Error),

    #[error("terraform {command} failed with exit code {code}")]
    NonZeroExit {
        command: String,
        code: i32,
        output: String,
    },

    #[error("Unable to parse terraform outputs: {0}")]
    Outputs(String),
}

#[derive(Debug, Deserialize)]
pub struct TerraformOutput {
    pub value: serde_json::Value,
}

/// Runs terraform commands against the configuration in `dir`.
pub struct TerraformRunner {
    binary: PathBuf,
    dir: PathBuf,
    remote_state: Option<RemoteState>,
    stream: bool,
}

impl TerraformRunner {
    pub fn new(
        binary: impl Into<PathBuf>,
        dir: impl Into<PathBuf>,
        remote_state: Option<RemoteState>,
        stream: bool,
    ) -> Self {
        Self {
            binary: binary.into(),
            dir: dir.into(),
            remote_state,
            stream,
        }
    }

    fn init_args(&self) -> Vec<String> {
        let mut args = vec![String::from("-input=false")];
        if let Some(remote_state) = &self.remote_state {
            for (key, value) in &remote_state.config {
                args.push(format!("-backend-config={}={}", key, value));
            }
        }
        args
    }

    pub async fn init(&self) -> Result<(), Error> {
        if let Some(remote_state) = &self.remote_state {
            warn!("Setting terraform remote state backend: {}", remote_state.backend);
        }
        self.run("init", &self.init_args()).await?;
        info!("Terraform initialized.");
        return Ok(());
    }

    pub async fn validate(&self) -> Result<(), Error> {
        self.init().await?;
        let output = self.run("validate", &[]).await?;
        self.finished("validate", &output);
        return Ok(());
    }

    pub async fn plan(&self) -> Result<(), Error> {
        self.init().await?;
        let args = ["-input=false", "-refresh=true"].map(String::from);
        warn!("Running terraform plan: {}", args.join(" "));
        let output = self.run("plan", &args).await?;
        self.finished("plan", &output);
        return Ok(());
    }

    pub async fn apply(&self) -> Result<(), Error> {
        self.init().await?;
        let args = ["-input=false", "-refresh=true", "-auto-approve"].map(String::from);
        warn!("Running terraform apply: {}", args.join(" "));
        let output = self.run("apply", &args).await?;
        self.finished("apply", &output);
        return Ok(());
    }

    pub async fn destroy(&self) -> Result<(), Error> {
        self.init().await?;
        let args = ["-input=false", "-refresh=true", "-auto-approve"].map(String::from);
        warn!("Running terraform destroy: {}", args.join(" "));
        let output = self.run("destroy", &args).await?;
        self.finished("destroy", &output);
        return Ok(());
    }

    /// Reads the outputs of the applied configuration.
    pub async fn outputs(&self) -> Result<BTreeMap<String, TerraformOutput>, Error> {
        let output = self.capture("output", &[String::from("-json")]).await?;
        parse_outputs(&output)
    }

    fn finished(&self, command: &str, output: &str) {
        if self.stream {
            warn!("Terraform {} finished successfully.", command);
        } else {
            warn!("Terraform {} finished successfully:\n{}", command, output);
        }
    }

    async fn run(&self, command: &str, args: &[String]) -> Result<String, Error> {
        if self.stream {
            self.stream_output(command, args).await
        } else {
            self.capture(command, args).await
        }
    }

    /// Runs one command and returns its combined stdout and stderr.
    async fn capture(&self, command: &str, args: &[String]) -> Result<String, Error> {
        let command_line = self.command_line(command, args);
        info!("Running terraform command: {}", command_line);

        let output = self
            .command(command, args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|error| Error::Spawn(self.binary.display().to_string(), error))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        debug!("Command output:\n{}", combined);

        self.check(command, &command_line, output.status.code(), combined)
    }

    /// Runs one command with its output going straight to the terminal.
    async fn stream_output(&self, command: &str, args: &[String]) -> Result<String, Error> {
        let command_line = self.command_line(command, args);
        info!("Running terraform command and streaming output: {}", command_line);

        let status = self
            .command(command, args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|error| Error::Spawn(self.binary.display().to_string(), error))?;

        self.check(command, &command_line, status.code(), String::new())
    }

    fn check(
        &self,
        command: &str,
        command_line: &str,
        code: Option<i32>,
        output: String,
    ) -> Result<String, Error> {
        // No exit code means the process was killed by a signal.
        let code = code.unwrap_or(-1);
        info!("Command exited with code {}", code);
        if code != 0 {
            error!(
                "Terraform command ({}) failed with exit code {}:\n{}",
                command_line, code, output
            );
            return Err(Error::NonZeroExit {
                command: command.to_string(),
                code,
                output,
            });
        }

        return Ok(output);
    }

    fn command(&self, command: &str, args: &[String]) -> Command {
        let mut process = Command::new(&self.binary);
        process.arg(command).args(args).current_dir(&self.dir);
        process
    }

    fn command_line(&self, command: &str, args: &[String]) -> String {
        let mut parts = vec![self.binary.display().to_string(), command.to_string()];
        parts.extend(args.iter().cloned());
        parts.join(" ")
    }
}

pub fn parse_outputs(raw: &str) -> Result<BTreeMap<String, TerraformOutput>, Error> {
    serde_json::from_str(raw).map_err(|error| Error::Outputs(error.to_string()))
}

/// The public URL of every endpoint, derived from `base_url` and the
/// `<endpoint>_path` outputs.
pub fn endpoint_urls(outputs: &BTreeMap<String, TerraformOutput>) -> BTreeMap<String, String> {
    let base_url = match outputs.get("base_url").and_then(|output| output.value.as_str()) {
        Some(url) => url.trim_end_matches('/'),
        None => return BTreeMap::new(),
    };

    outputs
        .iter()
        .filter_map(|(name, output)| {
            let endpoint = name.strip_suffix("_path")?;
            let path = output.value.as_str()?;
            Some((
                endpoint.to_string(),
                format!("{}/{}/", base_url, path.trim_matches('/')),
            ))
        })
        .collect()
}
