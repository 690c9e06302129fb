use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use spotwatch::cli::{self, Style};
use spotwatch::fetch::FetchConfig;
use spotwatch::kube::{KubeClient, IN_CLUSTER_CA_PATH, IN_CLUSTER_TOKEN_PATH};
use spotwatch::watch::WatchConfig;

/// spotwatch — Records SpotBugs report summaries on Jenkins X pipeline activities.
#[derive(Parser)]
#[command(name = "spotwatch", version, about)]
struct Cli {
    /// Timeout in seconds for report downloads and API updates.
    #[arg(long, global = true, default_value_t = 10)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch PipelineActivities and attach report summaries as facts.
    Watch {
        /// Namespace to watch.
        #[arg(long, env = "TEAM_NAMESPACE", default_value = "jx")]
        namespace: String,

        /// Kubernetes API server base URL (default: in-cluster service,
        /// or a local `kubectl proxy`).
        #[arg(long, env = "SPOTWATCH_API_SERVER")]
        api_server: Option<String>,

        /// File holding a bearer token for the API server.
        #[arg(long, default_value = IN_CLUSTER_TOKEN_PATH)]
        token_file: PathBuf,

        /// PEM bundle of CAs trusted for the API server. Ignored if the
        /// file does not exist.
        #[arg(long, default_value = IN_CLUSTER_CA_PATH)]
        ca_file: PathBuf,

        /// Name of the attachment that lists report URLs.
        #[arg(long, default_value = "spotbugs")]
        attachment: String,

        /// Skip activities that already carry a static-analysis fact.
        #[arg(long)]
        skip_summarized: bool,
    },

    /// Summarize a report file or URL.
    Summarize {
        /// Path or http(s) URL of a spotbugsXml.xml report.
        location: String,

        /// Output style.
        #[arg(long, value_enum, default_value = "text")]
        style: Style,
    },

    /// Print the fact that would be written for a report file or URL.
    Fact {
        /// Path or http(s) URL of a spotbugsXml.xml report.
        location: String,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn default_api_server() -> String {
    match (
        std::env::var("KUBERNETES_SERVICE_HOST"),
        std::env::var("KUBERNETES_SERVICE_PORT"),
    ) {
        (Ok(host), Ok(port)) => format!("https://{}:{}", host, port),
        (Ok(host), Err(_)) => format!("https://{}", host),
        _ => "http://127.0.0.1:8001".to_string(),
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let fetch = FetchConfig {
        timeout: Duration::from_secs(cli.timeout_secs),
        ..Default::default()
    };

    let output = match cli.command {
        Commands::Watch {
            namespace,
            api_server,
            token_file,
            ca_file,
            attachment,
            skip_summarized,
        } => {
            let api_server = api_server.unwrap_or_else(default_api_server);
            let token = KubeClient::read_token(&token_file)
                .with_context(|| format!("Failed to read token from {}", token_file.display()))?;
            info!(%namespace, %api_server, "watching PipelineActivities");
            let mut client =
                KubeClient::new(&api_server, &namespace, fetch.timeout).with_token(token);
            let ca = KubeClient::read_ca(&ca_file)
                .with_context(|| format!("Failed to read CA bundle from {}", ca_file.display()))?;
            if let Some(ca) = ca {
                client = client
                    .with_ca_pem(&ca)
                    .with_context(|| format!("Invalid CA bundle in {}", ca_file.display()))?;
            }
            let config = WatchConfig {
                attachment_name: attachment,
                skip_summarized,
            };
            cli::cmd_watch(&client, &fetch, config)?
        }
        Commands::Summarize { location, style } => cli::cmd_summarize(&location, style, &fetch)?,
        Commands::Fact { location } => cli::cmd_fact(&location, &fetch)?,
    };

    print!("{}", output);
    Ok(())
}
