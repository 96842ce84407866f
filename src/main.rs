use anyhow::{Context, bail};
use clap::Parser;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use cdp_crawler::config::{
    CrawlerConfig, Credentials, DEFAULT_POLL_INTERVAL, DEFAULT_TELNET_PORT, split_include_list,
};
use cdp_crawler::crawler::Crawler;
use cdp_crawler::session::{SessionClient, TelnetTransport};
use cdp_crawler::topology::Switch;

#[derive(Parser)]
#[clap(name = "cdp-crawler", about = "Discover Cisco switch topology via CDP over telnet")]
struct Opts {
    /// Root switch address.
    #[clap(long)]
    address: String,

    #[clap(long)]
    user: String,

    /// Prompted for when omitted.
    #[clap(long, env = "CDP_CRAWLER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Echo the switch sessions to stderr and log at debug level.
    #[clap(long)]
    verbose: bool,

    /// Comma-separated addresses and networks allowed to be crawled.
    #[clap(long, default_value = "")]
    include: String,

    /// Indent the JSON output.
    #[clap(long)]
    pretty: bool,

    #[clap(long, default_value_t = DEFAULT_TELNET_PORT)]
    port: u16,

    #[clap(long, default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    poll_interval_ms: u64,
}

impl Opts {
    fn config(&self) -> CrawlerConfig {
        CrawlerConfig {
            verbose: self.verbose,
            include: split_include_list(&self.include),
            pretty: self.pretty,
            telnet_port: self.port,
            poll_interval_ms: self.poll_interval_ms,
            ..Default::default()
        }
    }

    /// Startup checks that must pass before the password prompt.
    fn validate(&self) -> anyhow::Result<()> {
        let root = Switch::new(&self.address).with_context(|| format!("root address {:?}", self.address))?;
        if !root.has_address() {
            bail!("root address {:?} does not identify a switch", self.address);
        }
        if self.user.trim().is_empty() {
            bail!("empty user name");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    let level = if opts.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = opts.config();
    let filter = config.address_filter()?;
    opts.validate()?;

    let password = match &opts.password {
        Some(password) => password.clone(),
        None => rpassword::prompt_password("Password: ").context("reading password")?,
    };
    let credentials = Credentials::new(opts.user.trim(), password)?;

    let transport = TelnetTransport::new(config.write_delay(), config.read_timeout());
    let session = SessionClient::new(transport)
        .with_verbose(config.verbose)
        .with_port(config.telnet_port);
    let mut crawler = Crawler::new(session, filter).with_poll_interval(config.poll_interval());

    let cancel = CancellationToken::new();
    let listener = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping after the current switch");
                listener.cancel();
            }
            Err(e) => warn!("Unable to listen for interrupt: {}", e),
        }
    });

    let summary = crawler.build(&opts.address, &credentials, &cancel).await?;
    info!(
        "Crawl finished: {} visited, {} failed, {} pending{}",
        summary.visited,
        summary.failed,
        summary.pending,
        if summary.cancelled { " (cancelled)" } else { "" }
    );

    let graph = crawler.into_graph();
    let output = if config.pretty {
        graph.to_pretty_json()?
    } else {
        graph.to_json()?
    };
    println!("{output}");
    Ok(())
}
