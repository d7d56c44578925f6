use clap::Parser;
use link_harvest::config::CrawlConfig;

#[derive(Parser, Debug)]
#[command(name = "link-harvest")]
#[command(about = "Browser-driven crawler that extracts, records and downloads page links")]
#[command(version)]
pub struct Args {
    /// URL to start crawling from
    pub url: String,

    /// Load settings from a JSON config file; flags below override it
    #[arg(long)]
    pub config: Option<String>,

    /// Directory to write logs, manifests and downloads into
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// WebDriver server URL (WEBDRIVER_URL env var overrides)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Full-match regex for anchor display text
    #[arg(long)]
    pub text_pattern: Option<String>,

    /// Search-match regex for anchor hrefs
    #[arg(long)]
    pub url_pattern: Option<String>,

    /// Full-match regex for anchor class tokens
    #[arg(long)]
    pub class_pattern: Option<String>,

    /// Download matching links instead of only recording them
    #[arg(short, long)]
    pub download: bool,

    /// Per-download timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Fixed delay between downloads in seconds
    #[arg(long)]
    pub wait: Option<u64>,
}

/// Merge CLI arguments over an optional config file into one configuration.
pub fn build_config(args: &Args) -> link_harvest::error::Result<CrawlConfig> {
    let mut config = match &args.config {
        Some(path) => CrawlConfig::from_file(path)?,
        None => CrawlConfig::new(&args.url),
    };

    config.start_url = args.url.clone();
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(webdriver_url) = &args.webdriver_url {
        config.webdriver_url = webdriver_url.clone();
    }
    if let Some(timeout) = args.timeout {
        config.download_timeout_secs = timeout;
    }
    if let Some(wait) = args.wait {
        config.wait_secs = wait;
    }
    if args.text_pattern.is_some() {
        config.text_pattern = args.text_pattern.clone();
    }
    if args.url_pattern.is_some() {
        config.url_pattern = args.url_pattern.clone();
    }
    if args.class_pattern.is_some() {
        config.class_pattern = args.class_pattern.clone();
    }
    if args.download {
        config.download = true;
    }
    Ok(config)
}
