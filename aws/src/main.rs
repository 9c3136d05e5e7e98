use clap::{Parser, Subcommand};
use provider_aws::services::cloudcontrol::{
    self, PROPAGATION_TIMEOUT, RESOURCE_REQUEST_TIMEOUT,
};
use provider_aws::validation::validate_type_name;
use provider_aws::{AwsConfig, CloudControlClient};
use std::time::Duration;
use tfwait::Context;

#[derive(Parser)]
#[command(name = "aws-wait")]
#[command(about = "Wait for AWS resources to reach a desired state", long_about = None)]
struct Cli {
    /// Log verbosity (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", env = "AWS_WAIT_LOG_LEVEL", global = true)]
    log_level: tracing::Level,

    /// AWS region, defaults to AWS_REGION / AWS_DEFAULT_REGION
    #[arg(long, global = true)]
    region: Option<String>,

    /// Shared config profile, defaults to AWS_PROFILE
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Custom endpoint, e.g. a local emulator
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for a Cloud Control resource request to succeed
    Request {
        /// Request token returned by CreateResource/UpdateResource/DeleteResource
        #[arg(long)]
        token: String,

        /// Give up after this many seconds
        #[arg(long, default_value_t = RESOURCE_REQUEST_TIMEOUT.as_secs())]
        timeout_secs: u64,
    },
    /// Wait for a newly created resource to become readable
    Resource {
        /// Resource type, e.g. AWS::Logs::LogGroup
        #[arg(long)]
        type_name: String,

        /// Primary identifier of the resource
        #[arg(long)]
        identifier: String,

        /// Give up after this many seconds
        #[arg(long, default_value_t = PROPAGATION_TIMEOUT.as_secs())]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = AwsConfig::new();
    if let Some(region) = cli.region {
        config = config.with_region(region);
    }
    if let Some(profile) = cli.profile {
        config = config.with_profile(profile);
    }
    if let Some(endpoint_url) = cli.endpoint_url {
        config = config.with_endpoint_url(endpoint_url);
    }

    let sdk_config = config.load().await?;
    let client = CloudControlClient::new(&sdk_config);

    let ctx = Context::new();
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling wait");
            interrupt.cancel();
        }
    });

    let output = match cli.command {
        Commands::Request {
            token,
            timeout_secs,
        } => {
            let event = cloudcontrol::wait_resource_request_succeeded(
                &ctx,
                &client,
                &token,
                Duration::from_secs(timeout_secs),
            )
            .await?;
            serde_json::to_string_pretty(&event)?
        }
        Commands::Resource {
            type_name,
            identifier,
            timeout_secs,
        } => {
            validate_type_name(&type_name)?;
            let resource = cloudcontrol::find_resource_after_create(
                &ctx,
                &client,
                &type_name,
                &identifier,
                Duration::from_secs(timeout_secs),
            )
            .await?;
            serde_json::to_string_pretty(&resource)?
        }
    };

    println!("{}", output);
    Ok(())
}
