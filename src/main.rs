use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use vpn_detector::{logging, output, Config, DetectionResult, Detector};

#[derive(Parser)]
#[command(name = "vpn-detector")]
#[command(about = "Guess whether a client IP sits behind a VPN via STUN leaks and ISP lookups")]
struct Cli {
    /// Claimed public IPv4 address of the client
    ///
    /// The leak probe reports the egress address of the machine running this
    /// command. Pass --no-probe when checking an address other than this
    /// host's own, or every mismatch will read as a VPN.
    ip: String,

    /// JSON config file (defaults apply to missing keys)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Proxy URL for lookup requests (http://, socks5://, or host:port:user:pass)
    #[arg(long)]
    proxy: Option<String>,

    /// Browser preset for lookups: chrome-143, firefox-133, safari-18
    #[arg(long)]
    browser: Option<String>,

    /// Skip the STUN leak probe
    #[arg(long)]
    no_probe: bool,

    /// Leak probe time limit in milliseconds
    #[arg(long)]
    probe_timeout: Option<u64>,

    /// Per-lookup time limit in milliseconds
    #[arg(long)]
    lookup_timeout: Option<u64>,

    /// Give up with "unknown" after this many milliseconds
    #[arg(long)]
    deadline: Option<u64>,

    /// Show debug logs and extra report fields
    #[arg(long)]
    verbose: bool,

    /// Output raw JSON
    #[arg(long)]
    json: bool,
}

/// Turn `host:port:user:pass` or a scheme-less address into a proxy URL.
fn normalize_proxy(proxy_str: &str) -> String {
    // Already carries credentials in URL form.
    if proxy_str.contains('@') {
        if !proxy_str.contains("://") {
            return format!("http://{}", proxy_str);
        }
        return proxy_str.to_string();
    }

    let (scheme, rest) = match proxy_str.find("://") {
        Some(idx) => (&proxy_str[..idx], &proxy_str[idx + 3..]),
        None => ("http", proxy_str),
    };

    // host:port:user:pass, where the password may itself contain ':'
    let parts: Vec<&str> = rest.split(':').collect();
    if parts.len() >= 4 && parts[1].parse::<u16>().is_ok() {
        let pass = parts[3..].join(":");
        return format!("{}://{}:{}@{}:{}", scheme, parts[2], pass, parts[0], parts[1]);
    }

    format!("{}://{}", scheme, rest)
}

/// Hide proxy credentials before logging the URL.
fn mask_proxy(proxy_url: &str) -> String {
    match proxy_url.rfind('@') {
        Some(idx) => {
            let scheme_end = proxy_url.find("://").map(|i| i + 3).unwrap_or(0);
            format!("{}***@{}", &proxy_url[..scheme_end], &proxy_url[idx + 1..])
        }
        None => proxy_url.to_string(),
    }
}

fn build_config(cli: &Cli) -> vpn_detector::Result<Config> {
    let mut config = match cli.config {
        Some(ref path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(ref proxy) = cli.proxy {
        config.proxy = Some(normalize_proxy(proxy));
    }
    if let Some(ref browser) = cli.browser {
        config.browser = browser.clone();
    }
    if cli.no_probe {
        config.probe.enabled = false;
    }
    if let Some(ms) = cli.probe_timeout {
        config.probe.timeout_ms = ms;
    }
    if let Some(ms) = cli.lookup_timeout {
        config.lookup_timeout_ms = ms;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(ref proxy) = config.proxy {
        tracing::info!(proxy = %mask_proxy(proxy), "routing lookups through proxy");
    }

    let detector = match Detector::from_config(&config) {
        Ok(detector) => detector,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = match cli.deadline {
        Some(ms) => {
            detector
                .detect_with_deadline(&cli.ip, Duration::from_millis(ms))
                .await
        }
        None => detector.inspect(&cli.ip).await,
    };

    if cli.json {
        output::render_json(&report);
    } else {
        output::render_table(&report, cli.verbose);
    }

    if report.verdict == DetectionResult::InvalidInput {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}
