use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use webhook2lambda2sqs::aws::{self, AwsInfo, Identity};
use webhook2lambda2sqs::config::{self, LoadedConfig, PROJECT_URL};
use webhook2lambda2sqs::generator::TerraformGenerator;
use webhook2lambda2sqs::terraform::{endpoint_urls, TerraformRunner};
use webhook2lambda2sqs::{function, logging, writer};

#[derive(Debug, Parser)]
#[command(name = "webhook2lambda2sqs", version)]
#[command(about = format!(
    "webhook2lambda2sqs - Generate code and manage infrastructure for receiving webhooks with AWS API Gateway and pushing to SQS via Lambda - <{}>",
    PROJECT_URL
))]
struct Cli {
    /// path to config.json
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// verbose output. specify twice for debug-level output.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// path to terraform binary, if not in PATH
    #[arg(short = 't', long = "terraform-path", default_value = "terraform")]
    tf_path: PathBuf,

    /// stream Terraform output to STDOUT (combined) in realtime
    #[arg(short = 's', long = "stream-tf")]
    stream_tf: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// generate lambda function and terraform configs in ./
    Generate,
    /// generate function and terraform configs in ./, then run terraform apply
    Genapply,
    /// run terraform plan to show changes which will be made
    Plan,
    /// run terraform apply to apply changes/create infrastructure
    Apply,
    /// run terraform destroy to completely destroy infrastructure
    Destroy,
    /// run terraform validate against the generated configuration
    Validate,
    /// write example config to STDOUT and description of it to STDERR, then exit
    ExampleConfig,
    /// show the latest CloudWatch Logs entries of the lambda function
    Logs {
        /// number of log entries to show
        #[arg(short = 'n', long, default_value_t = 10, value_parser = clap::value_parser!(i32).range(1..))]
        count: i32,
    },
    /// show messages waiting in one or all configured queues
    Queuepeek {
        /// queue name to read (default: every configured queue)
        #[arg(short, long)]
        queue: Option<String>,

        /// number of messages to show per queue (at most 10)
        #[arg(
            short = 'n',
            long,
            default_value_t = aws::MAX_RECEIVE_COUNT,
            value_parser = clap::value_parser!(i32).range(1..=i64::from(aws::MAX_RECEIVE_COUNT))
        )]
        count: i32,

        /// delete the messages after showing them
        #[arg(short, long)]
        delete: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Action::ExampleConfig = cli.action {
        println!("{}", serde_json::to_string_pretty(&config::example_config())?);
        eprintln!("{}", config::EXAMPLE_DOCS);
        return Ok(());
    }

    logging::init(cli.verbose)?;

    let loaded = config::parse(&cli.config)
        .with_context(|| format!("Unable to load configuration from {}", cli.config.display()))?;
    let cwd = Path::new(".");

    if let Action::Generate | Action::Genapply = cli.action {
        generate(&loaded, cwd).await?;
    }

    let runner = TerraformRunner::new(
        &cli.tf_path,
        cwd,
        loaded.config.terraform_remote_state.clone(),
        cli.stream_tf,
    );

    match cli.action {
        Action::Generate | Action::ExampleConfig => {}
        Action::Genapply | Action::Apply => {
            ensure_generated(cwd)?;
            runner.apply().await?;
            show_outputs(&runner).await?;
        }
        Action::Plan => {
            ensure_generated(cwd)?;
            runner.plan().await?;
        }
        Action::Validate => {
            ensure_generated(cwd)?;
            runner.validate().await?;
        }
        Action::Destroy => runner.destroy().await?,
        Action::Logs { count } => {
            let sdk_config = aws::sdk_config(loaded.config.aws_region.as_deref()).await;
            AwsInfo::new(&sdk_config)
                .show_cloudwatch_logs(&loaded.config.resource_name(), count)
                .await?;
        }
        Action::Queuepeek {
            queue,
            count,
            delete,
        } => {
            let queues = match queue {
                Some(name) => vec![name],
                None => loaded.config.queue_names(),
            };
            let sdk_config = aws::sdk_config(loaded.config.aws_region.as_deref()).await;
            AwsInfo::new(&sdk_config)
                .show_queues(&queues, count, delete)
                .await?;
        }
    }

    Ok(())
}

async fn generate(loaded: &LoadedConfig, dir: &Path) -> Result<()> {
    let sdk_config = aws::sdk_config(loaded.config.aws_region.as_deref()).await;
    let identity = Identity::resolve(&sdk_config)
        .await
        .context("Unable to resolve the AWS account and region")?;

    let func_source = function::generate(&loaded.config);
    let tf_config = TerraformGenerator::new(loaded, &identity).generate();
    writer::write(dir, &func_source, &tf_config)?;

    Ok(())
}

fn ensure_generated(dir: &Path) -> Result<()> {
    if !writer::exists(dir) {
        bail!(
            "{} or the function files are missing; run `webhook2lambda2sqs generate` first",
            writer::TF_CONFIG_FILE
        );
    }
    Ok(())
}

async fn show_outputs(runner: &TerraformRunner) -> Result<()> {
    let outputs = runner.outputs().await?;
    if let Some(base_url) = outputs.get("base_url").and_then(|output| output.value.as_str()) {
        warn!("Base URL: {}", base_url);
    }
    for (endpoint, url) in endpoint_urls(&outputs) {
        println!("{} => {}", endpoint, url);
    }
    Ok(())
}
