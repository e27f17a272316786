use std::str::FromStr;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::info;
use vitrine_api::{capitalize, PdpSession, PlpSession, VitrineError};
use vitrine_core::{Product, ProductId, SortOrder};
use vitrine_persist::{CartStore, SqliteStore};
use vitrine_store::{CatalogSource, CatalogStore, Facets};

#[derive(Parser, Debug)]
#[command(name = "vitrine", version, about = "Vitrine storefront CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Catalog resource: http(s) URL or file path
    #[arg(long = "catalog", global = true, env = "VITRINE_CATALOG", default_value = "data/products.json")]
    catalog: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List products (the PLP grid)
    Ls {
        /// Seed category/sub from a page address instead of flags
        #[arg(long = "page-url")]
        page_url: Option<String>,
        #[arg(long = "category")]
        category: Option<String>,
        /// Subcategory tag
        #[arg(long = "sub")]
        sub: Option<String>,
        /// Size filter; repeat for OR semantics
        #[arg(long = "size")]
        sizes: Vec<String>,
        /// Color filter; repeat for OR semantics
        #[arg(long = "color")]
        colors: Vec<String>,
        /// Inclusive minimum price
        #[arg(long = "min")]
        min: Option<u64>,
        /// Inclusive maximum price
        #[arg(long = "max")]
        max: Option<u64>,
        /// Sort order: popular, price-asc, price-desc, new
        #[arg(long = "sort", default_value = "popular")]
        sort: String,
        /// Print the filter option lists derived from the full catalog
        #[arg(long = "facets", action = ArgAction::SetTrue)]
        facets: bool,
    },
    /// Show one product with related suggestions (the PDP)
    Show {
        /// Product id
        id: String,
    },
    /// Add a product to the cart
    Add {
        /// Product id
        id: String,
        /// Size label; omitting it exercises the no-size prompt
        size: Option<String>,
    },
    /// Print the persisted cart
    Cart,
}

fn init_tracing() {
    let env = std::env::var("VITRINE_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("VITRINE_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid VITRINE_METRICS_ADDR; expected host:port");
        }
    }
}

fn print_row(p: &Product) {
    println!("{:<8} {:<24} {:<12} {:<10} {:>8}", p.id, p.name, p.category, p.color, p.price);
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    let store = CatalogStore::new();
    store.load(&CatalogSource::parse(&cli.catalog)).await;
    let snap = store.current();

    match cli.command {
        Commands::Ls { page_url, category, sub, sizes, colors, min, max, sort, facets } => {
            let mut plp = match page_url.as_deref() {
                Some(url) => PlpSession::from_page_url(url),
                None => PlpSession::new(),
            };
            if category.is_some() {
                plp.set_category(category);
            }
            if sub.is_some() {
                plp.set_sub(sub);
            }
            for s in &sizes {
                plp.toggle_size(s);
            }
            for c in &colors {
                plp.toggle_color(c);
            }
            if min.is_some() || max.is_some() {
                plp.set_price_bounds(min, max);
            }
            plp.set_sort(sort.parse::<SortOrder>()?);
            info!(filters = ?plp.filters(), "ls invoked");

            let (rows, count) = plp.results(&snap);
            let option_lists = Facets::derive(&snap);
            match cli.output {
                Output::Human => {
                    println!("{}", plp.title());
                    println!("{:<8} {:<24} {:<12} {:<10} {:>8}", "ID", "NAME", "CATEGORY", "COLOR", "PRICE");
                    for p in &rows {
                        print_row(p);
                    }
                    println!("{} item{}", count, if count != 1 { "s" } else { "" });
                    if facets {
                        println!("categories: {}", option_lists.categories.join(", "));
                        println!("sizes:      {}", option_lists.sizes.join(", "));
                        println!("colors:     {}", option_lists.colors.join(", "));
                    }
                }
                Output::Json => {
                    let mut body = serde_json::json!({ "items": rows, "count": count });
                    if facets {
                        body["facets"] = serde_json::json!({
                            "categories": option_lists.categories,
                            "sizes": option_lists.sizes,
                            "colors": option_lists.colors,
                        });
                    }
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
            }
        }
        Commands::Show { id } => {
            let id = ProductId::new(id);
            match PdpSession::open(&snap, &id) {
                Ok(pdp) => {
                    let p = pdp.product();
                    let related = pdp.suggestions(&snap);
                    match cli.output {
                        Output::Human => {
                            println!("{}", capitalize(&p.category));
                            println!("{}  ({})", p.name, p.id);
                            println!("price: {}", p.price);
                            println!("color: {}", capitalize(&p.color));
                            println!("sizes: {}", p.sizes.join(", "));
                            if !p.description.is_empty() {
                                println!("{}", p.description);
                            }
                            if !related.is_empty() {
                                println!("\nYou might also like:");
                                for s in &related {
                                    print_row(s);
                                }
                            }
                        }
                        Output::Json => {
                            let body = serde_json::json!({ "product": p, "suggestions": related });
                            println!("{}", serde_json::to_string_pretty(&body)?);
                        }
                    }
                }
                Err(VitrineError::NotFound(_)) => println!("Product not found."),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Add { id, size } => {
            let id = ProductId::new(id);
            let cart = SqliteStore::open_default()?;
            let mut pdp = match PdpSession::open(&snap, &id) {
                Ok(p) => p,
                Err(VitrineError::NotFound(_)) => {
                    println!("Product not found.");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            if let Some(size) = size.as_deref() {
                if let Err(VitrineError::Validation(msg)) = pdp.select_size(size) {
                    println!("{msg}");
                    return Ok(());
                }
            }
            match pdp.add_to_cart(&cart) {
                Ok(n) => println!("Added to cart! ({} item{})", n, if n != 1 { "s" } else { "" }),
                Err(VitrineError::Validation(msg)) => println!("{msg}"),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Cart => {
            let cart = SqliteStore::open_default()?;
            let entries = cart.load()?;
            match cli.output {
                Output::Human => {
                    println!("{:<8} {:<8} {:>4}", "ID", "SIZE", "QTY");
                    for e in &entries {
                        println!("{:<8} {:<8} {:>4}", e.product_id, e.size, e.quantity);
                    }
                    println!("{} item{}", entries.len(), if entries.len() != 1 { "s" } else { "" });
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
            }
        }
    }

    Ok(())
}
