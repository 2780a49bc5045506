mod mail;
mod source;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mail::RestMailer;
use pdf_despatch::{HttpLabelFetcher, JobContext, JobOutput, Mailer, RunConfig, Since};
use source::HttpOrderSource;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "despatch", about = "Order reports and pack sheets for the despatch bench", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Email a tabular report of the window's orders
    Report {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Email despatch notes with postage labels, one page per order
    Packsheets {
        #[command(flatten)]
        run: RunArgs,

        /// Clockwise rotation applied to each label
        #[arg(long, env = "LABEL_ROTATION", default_value = "0", value_enum)]
        rotation: RotationArg,

        /// Shared batch-label PDF; `{{since}}` is replaced by the window start
        #[arg(long, env = "BATCH_LABEL_URL")]
        batch_label_url: Option<String>,

        /// Sender address line printed under the brand (repeatable)
        #[arg(long = "sender-line", env = "SENDER_LINES", value_delimiter = '|')]
        sender_lines: Vec<String>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Brand name used in titles and subjects
    #[arg(long, env = "BRAND_NAME", default_value = "Orders")]
    brand: String,

    /// Window start (RFC 3339), overrides --hours
    #[arg(long, env = "SINCE")]
    since: Option<DateTime<Utc>>,

    /// Window length in hours before now
    #[arg(long, env = "HOURS_BACK", default_value = "24")]
    hours: u32,

    /// Only include orders whose reference starts with this prefix
    #[arg(long, env = "REFERENCE_PREFIX")]
    prefix: Option<String>,

    /// Order API base URL
    #[arg(long, env = "ORDERS_API_URL")]
    api_url: String,

    #[arg(long, env = "ORDERS_API_KEY", hide_env_values = true)]
    api_key: String,

    #[arg(long, env = "ORDERS_API_SECRET", hide_env_values = true)]
    api_secret: String,

    /// Send-mail endpoint
    #[arg(long, env = "MAIL_API_URL")]
    mail_url: Option<String>,

    #[arg(long, env = "MAIL_API_TOKEN", hide_env_values = true)]
    mail_token: Option<String>,

    #[arg(long, env = "MAIL_FROM")]
    mail_from: Option<String>,

    /// Recipient address (repeatable or comma separated)
    #[arg(long, env = "MAIL_TO", value_delimiter = ',')]
    mail_to: Vec<String>,

    /// HTTP timeout in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "30")]
    timeout_secs: u64,

    /// Also write the PDF to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Build the PDF without emailing it
    #[arg(long)]
    no_email: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum RotationArg {
    #[value(name = "0")]
    None,
    #[value(name = "90")]
    Clockwise90,
    #[value(name = "180")]
    Clockwise180,
    #[value(name = "270")]
    Clockwise270,
}

impl From<RotationArg> for pdf_despatch::Rotation {
    fn from(arg: RotationArg) -> Self {
        match arg {
            RotationArg::None => Self::None,
            RotationArg::Clockwise90 => Self::Clockwise90,
            RotationArg::Clockwise180 => Self::Clockwise180,
            RotationArg::Clockwise270 => Self::Clockwise270,
        }
    }
}

impl RunArgs {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn run_config(&self, now: DateTime<Utc>) -> RunConfig {
        let since = match self.since {
            Some(at) => Since::At(at),
            None => Since::HoursBack(self.hours),
        };
        let mut config = RunConfig::new(self.brand.clone(), since.resolve(now));
        config.reference_prefix = self.prefix.clone().filter(|p| !p.is_empty());
        config
    }

    fn order_source(&self) -> Result<HttpOrderSource> {
        Ok(HttpOrderSource::new(
            &self.api_url,
            &self.api_key,
            &self.api_secret,
            self.timeout(),
        )?)
    }

    fn mailer(&self) -> Result<Option<RestMailer>> {
        if self.no_email {
            return Ok(None);
        }
        let (Some(url), Some(token), Some(from)) = (&self.mail_url, &self.mail_token, &self.mail_from) else {
            bail!("--mail-url, --mail-token and --mail-from are required unless --no-email is given");
        };
        let mailer = RestMailer::new(url, token, from, self.mail_to.clone(), self.timeout())?;
        Ok(Some(mailer))
    }
}

async fn finish(output: JobOutput, path: Option<PathBuf>) -> Result<()> {
    if let Some(path) = path {
        pdf_despatch::write_pdf(&output.pdf, &path)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {} bytes → {}", output.pdf.len(), path.display());
    }
    let summary = &output.summary;
    println!("{}", summary.subject);
    if let Some(stats) = summary.compose_stats {
        println!(
            "  Labels: {} placed, {} missing, {} failed",
            stats.labels_placed, stats.labels_missing, stats.labels_failed
        );
    }
    if summary.emailed {
        println!("  Emailed as {}", summary.attachment_name);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let now = Utc::now();

    match cli.command {
        Commands::Report { run } => {
            let config = run.run_config(now);
            let source = run.order_source()?;
            let mailer = run.mailer()?;
            let ctx = JobContext {
                source: &source,
                mailer: mailer.as_ref().map(|m| m as &dyn Mailer),
                now,
            };
            let output = pdf_despatch::run_report(&config, &ctx).await?;
            finish(output, run.output).await?;
        }

        Commands::Packsheets {
            run,
            rotation,
            batch_label_url,
            sender_lines,
        } => {
            let mut config = run.run_config(now);
            config.label_rotation = rotation.into();
            config.batch_label_url = batch_label_url.filter(|u| !u.trim().is_empty());
            config.sender_lines = sender_lines;

            let source = run.order_source()?;
            let mailer = run.mailer()?;
            let fetcher = HttpLabelFetcher::with_timeout(run.timeout())?;
            let ctx = JobContext {
                source: &source,
                mailer: mailer.as_ref().map(|m| m as &dyn Mailer),
                now,
            };
            let output = pdf_despatch::run_packsheets(&config, &ctx, &fetcher).await?;
            finish(output, run.output).await?;
        }
    }

    Ok(())
}
