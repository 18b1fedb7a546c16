//! Navigation example
//!
//! Walks a hypermedia API from its root by following link relations.
//!
//! Run with: cargo run --example navigate -- <root-uri> [rel...]
//!
//! Configuration is read from `HYPERMEDIA_*` environment variables; set
//! `RUST_LOG=debug` to see every request and cache decision.

use anyhow::{bail, Context};
use hypermedia_client::cache::ShortCache;
use hypermedia_client::middleware::DeprecationWarning;
use hypermedia_client::{Body, Client, ClientConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(root) = args.next() else {
        bail!("usage: navigate <root-uri> [rel...]");
    };
    let rels: Vec<String> = args.collect();

    let config = ClientConfig::from_env()
        .context("reading HYPERMEDIA_* configuration")?
        .with_cache(ShortCache::new());
    let client = Client::with_config(config)?;
    client.use_middleware(DeprecationWarning::new(), "*")?;

    let root = client.go(&root)?;
    let state = match rels.split_first() {
        None => root.get().await?,
        Some((first, rest)) => {
            let relation = rest
                .iter()
                .fold(root.follow(first), |relation, rel| relation.follow(rel));
            relation
                .get()
                .await
                .with_context(|| format!("following {}", rels.join(" -> ")))?
        }
    };

    println!("{}", state.uri());
    println!("==========================\n");
    match state.body() {
        Body::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
        Body::Text(text) => println!("{}", text),
        Body::Binary(bytes) => println!("<{} bytes>", bytes.len()),
        _ => println!("<no body>"),
    }

    println!("\nLinks:");
    for link in state.links() {
        println!("  {:<16} {}", link.rel, link.href);
    }

    let actions = state.actions();
    if !actions.is_empty() {
        println!("\nActions:");
        for action in actions {
            println!("  {:<16} {} {}", action.name(), action.method(), action.uri());
        }
    }

    for (rel, embedded) in state.embedded() {
        println!("\nEmbedded `{}`: {} state(s)", rel, embedded.len());
    }

    Ok(())
}
