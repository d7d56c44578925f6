use clap::Parser;
use link_harvest::crawler::Crawler;
use link_harvest::download::Downloader;
use link_harvest::extract::LinkFilter;

mod args;
use args::{Args, build_config};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();
    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    ::log::info!("Starting crawl of {}", config.start_url);
    println!("Note: crawling requires a WebDriver server (e.g. ChromeDriver or geckodriver).");
    println!(
        "Set WEBDRIVER_URL if not using the default {}",
        config.webdriver_url
    );

    if let Err(e) = run(&config).await {
        ::log::error!("Crawl failed: {e}");
        std::process::exit(1);
    }
}

async fn run(config: &link_harvest::config::CrawlConfig) -> link_harvest::error::Result<()> {
    let mut filter = LinkFilter::new();
    if let Some(pattern) = &config.text_pattern {
        filter = filter.text(pattern)?;
    }
    if let Some(pattern) = &config.url_pattern {
        filter = filter.url(pattern)?;
    }
    if let Some(pattern) = &config.class_pattern {
        filter = filter.class(pattern)?;
    }

    let mut crawler = Crawler::start(
        &config.effective_webdriver_url(),
        &config.start_url,
        config.output_dir.as_str(),
    )
    .await?
    .with_downloader(Downloader::with_timeout(config.download_timeout())?);

    let links = crawler.links(&filter).await?;
    ::log::info!("Found {} matching links", links.len());

    if config.download {
        let records = crawler.save_links(&links, config.wait_between()).await?;
        println!(
            "Downloaded {} of {} links into {}",
            records.len(),
            links.len(),
            crawler.state().dir().display()
        );
    } else {
        crawler.write_links(&links)?;
        println!(
            "Recorded {} links in {}",
            links.len(),
            crawler.state().manifest_file().display()
        );
    }

    crawler.close().await
}
