use clap::{Parser, Subcommand};
use reqwest::header::HeaderMap;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Operator CLI for the rewriting proxy", long_about = None)]
struct Cli {
    /// Base URL of a running proxy
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the proxy handler is up (`?test=true`)
    Ping,
    /// Force a refresh of one page's cache entry (`?clear_cache=true`)
    Refresh {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Fetch a page and show its cache headers
    Inspect {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Show the origin diagnostic page (`?debug=true`)
    Debug {
        #[arg(default_value = "/")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Ping => {
            let res = client.get(format!("{base}/?test=true")).send().await?;
            let status = res.status();
            let body = res.text().await?;
            if status.is_success() && body.contains("PROXY HANDLER IS WORKING") {
                println!("ok ({status})");
            } else {
                eprintln!("Error: liveness check returned status {status}");
                std::process::exit(1);
            }
        }
        Commands::Refresh { path } => {
            let res = client
                .get(target(base, &path, "clear_cache=true"))
                .send()
                .await?;
            print_summary(res).await?;
        }
        Commands::Inspect { path } => {
            let res = client.get(target(base, &path, "")).send().await?;
            print_summary(res).await?;
        }
        Commands::Debug { path } => {
            let res = client.get(target(base, &path, "debug=true")).send().await?;
            println!("{}", res.text().await?);
        }
    }

    Ok(())
}

fn target(base: &str, path: &str, extra_query: &str) -> String {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    if extra_query.is_empty() {
        format!("{base}{path}")
    } else if path.contains('?') {
        format!("{base}{path}&{extra_query}")
    } else {
        format!("{base}{path}?{extra_query}")
    }
}

async fn print_summary(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let headers = res.headers().clone();
    let size = res.bytes().await?.len();

    let summary = json!({
        "status": status.as_u16(),
        "cache_status": header(&headers, "x-cache-status"),
        "cache_timestamp": header(&headers, "x-cache-timestamp"),
        "cache_control": header(&headers, "cache-control"),
        "content_type": header(&headers, "content-type"),
        "body_bytes": size,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if !status.is_success() {
        eprintln!("Error: proxy returned status {status}");
    }
    Ok(())
}

fn header(headers: &HeaderMap, name: &str) -> Value {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map_or(Value::Null, |v| Value::String(v.to_string()))
}
