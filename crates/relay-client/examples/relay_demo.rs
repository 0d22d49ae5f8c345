//! Relays a single call to a sibling service, the way a request handler would.
//!
//! ```text
//! RELAY_TARGET_HOST=localhost cargo run -p relay-client --example relay_demo -- \
//!     --inbound https://localhost:9443/ \
//!     --cookie 'LtpaToken2=...' \
//!     --context-root inventory --path items
//! ```

use anyhow::Result;
use clap::Parser;
use http::header::{COOKIE, HeaderMap, HeaderValue};
use log::info;
use reqwest::Method;
use url::Url;

use relay_client::{APPLICATION_JSON, RelayClientFactory, RelayRequest};
use relay_common::InboundContext;

#[derive(Parser, Debug)]
#[command(about = "Relay one request to a sibling service")]
struct Args {
    /// Base URL of the (simulated) inbound request
    #[arg(long, default_value = "https://localhost:9443/")]
    inbound: Url,

    /// Cookie header of the inbound request
    #[arg(long, env = "RELAY_DEMO_COOKIE")]
    cookie: Option<String>,

    /// Context root of the target service
    #[arg(long)]
    context_root: String,

    /// Port of the target service (defaults to the inbound port)
    #[arg(long)]
    port: Option<u16>,

    /// Path below the context root
    #[arg(long, default_value = "")]
    path: String,

    /// HTTP method
    #[arg(long, default_value = "GET")]
    method: Method,

    /// JSON body to send with PUT or POST
    #[arg(long)]
    body: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut headers = HeaderMap::new();
    if let Some(cookie) = &args.cookie {
        headers.insert(COOKIE, HeaderValue::from_str(cookie)?);
    }
    let context = InboundContext::new(args.inbound, headers);

    let factory = RelayClientFactory::from_env()?;
    let client = match factory.scoped(&context) {
        Ok(client) => client,
        Err(e) => {
            let response = e.into_response();
            eprintln!("{} {}", response.status(), response.body());
            return Ok(());
        }
    };

    let url = match args.port {
        Some(port) => client.resolve_target_on_port(port, &args.context_root)?,
        None => client.resolve_target(&args.context_root)?,
    };
    info!("Relaying {} {url}", args.method);

    let request = RelayRequest::new(url).path(&args.path);
    let response = match args.body {
        Some(body) if args.method == Method::PUT => {
            client.put_with_content(request, body, APPLICATION_JSON).await?
        }
        Some(body) if args.method == Method::POST => {
            client.post_with_content(request, body, APPLICATION_JSON).await?
        }
        _ => client.send(request, args.method).await?,
    };

    println!("{}", response.status());
    println!("{}", response.text().await?);

    Ok(())
}
