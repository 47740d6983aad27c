use clap::{Args, Subcommand, ValueEnum};

use crate::config::Config;
use crate::db::{NewProduct, ProductRepository};
use crate::models::{validate_name, validate_price, Product, ProductChanges};
use crate::remote::{RemoteCatalog, SignedClient};
use crate::sync::{SyncEngine, SyncOutcome};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct ProductCommand {
    #[command(subcommand)]
    pub command: ProductSubcommand,
}

#[derive(Subcommand)]
pub enum ProductSubcommand {
    /// Create a product locally and push it to the remote platform
    Add {
        /// Product name
        name: String,

        /// Product description
        #[arg(long)]
        description: Option<String>,

        /// Price, e.g. "9.99"
        #[arg(long)]
        price: String,

        /// Image URL
        #[arg(long)]
        image_url: Option<String>,
    },

    /// List all products
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a product's details
    Show {
        /// Product ID
        id: i64,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Also fetch the product's current remote state
        #[arg(long)]
        remote: bool,
    },

    /// Update a product; the change is pushed remotely only if the
    /// product is currently synced
    Update {
        /// Product ID
        id: i64,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New price
        #[arg(long)]
        price: Option<String>,

        /// New image URL
        #[arg(long)]
        image_url: Option<String>,
    },

    /// Delete a product locally, removing the remote copy best-effort
    Delete {
        /// Product ID
        id: i64,
    },

    /// Push a product that is not currently synced to the remote platform
    Sync {
        /// Product ID
        id: i64,
    },
}

impl ProductCommand {
    pub async fn run(
        &self,
        repo: &ProductRepository,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ProductSubcommand::Add {
                name,
                description,
                price,
                image_url,
            } => {
                // Remote credentials are checked before any local write
                let remote = remote_catalog(config)?;
                let engine = SyncEngine::new(repo, &remote);

                if !validate_name(name) {
                    return Err("Product name must be 1-255 characters".into());
                }
                if !validate_price(price) {
                    return Err(
                        "Price must be a positive decimal with at most 2 fractional digits".into(),
                    );
                }

                let product = repo
                    .create(&NewProduct {
                        name: name.trim().to_string(),
                        description: description.clone(),
                        price: price.clone(),
                        image_url: image_url.clone(),
                        owner: config.owner.clone(),
                    })
                    .await?;

                let (product, outcome) = engine.after_create(&product).await?;
                match outcome {
                    SyncOutcome::Synced => {
                        println!("Product {} created and synced to the remote shop", product.id);
                    }
                    SyncOutcome::Failed { warning } => {
                        println!("Product {} created locally but not synced", product.id);
                        println!("Warning: {}", warning);
                    }
                    _ => {}
                }
                print_product(&product);
                Ok(())
            }

            ProductSubcommand::List { format } => {
                let products = repo.list(&config.owner).await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&products)?);
                    }
                    OutputFormat::Text => {
                        if products.is_empty() {
                            println!("No products found.");
                        }
                        for product in &products {
                            println!(
                                "{:>4}  {:<30}  {:>10}  {}",
                                product.id,
                                product.name,
                                product.price,
                                product.status
                            );
                        }
                    }
                }
                Ok(())
            }

            ProductSubcommand::Show { id, format, remote } => {
                let product = get_owned(repo, *id, config).await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&product)?);
                    }
                    OutputFormat::Text => print_product(&product),
                }

                if *remote {
                    match product.remote_id {
                        Some(remote_id) => {
                            let catalog = remote_catalog(config)?;
                            match catalog.fetch_product(remote_id).await {
                                Ok(state) => {
                                    println!();
                                    println!("Remote state:");
                                    println!("  Name:   {}", state.name);
                                    println!("  Price:  {}", state.regular_price);
                                    println!("  Status: {}", state.status);
                                }
                                Err(e) => println!("Could not fetch remote state: {}", e),
                            }
                        }
                        None => println!("Product has never been pushed remotely"),
                    }
                }
                Ok(())
            }

            ProductSubcommand::Update {
                id,
                name,
                description,
                price,
                image_url,
            } => {
                let remote = remote_catalog(config)?;
                let engine = SyncEngine::new(repo, &remote);

                let before = get_owned(repo, *id, config).await?;

                let changes = ProductChanges {
                    name: name.clone(),
                    description: description.clone(),
                    price: price.clone(),
                    image_url: image_url.clone(),
                };
                if changes.is_empty() {
                    return Err("Nothing to update: supply at least one field".into());
                }
                if let Some(name) = &changes.name {
                    if !validate_name(name) {
                        return Err("Product name must be 1-255 characters".into());
                    }
                }
                if let Some(price) = &changes.price {
                    if !validate_price(price) {
                        return Err(
                            "Price must be a positive decimal with at most 2 fractional digits"
                                .into(),
                        );
                    }
                }

                let updated = repo.update_fields(*id, &changes).await?;
                let (committed, outcome) = engine.after_update(&before, &changes).await?;
                let product = committed.unwrap_or(updated);

                match outcome {
                    SyncOutcome::Synced => {
                        println!("Product {} updated and synced to the remote shop", product.id);
                    }
                    SyncOutcome::Failed { warning } => {
                        println!("Product {} updated locally but not synced", product.id);
                        println!("Warning: {}", warning);
                    }
                    SyncOutcome::Skipped => {
                        println!(
                            "Product {} updated locally ({}); run 'product sync {}' to push it",
                            product.id, product.status, product.id
                        );
                    }
                    SyncOutcome::AlreadySynced => {}
                }
                print_product(&product);
                Ok(())
            }

            ProductSubcommand::Delete { id } => {
                let remote = remote_catalog(config)?;
                let engine = SyncEngine::new(repo, &remote);

                let product = get_owned(repo, *id, config).await?;
                let warning = engine.delete(&product).await?;

                println!("Product {} deleted", product.id);
                if let Some(warning) = warning {
                    println!("Warning: {}", warning);
                }
                Ok(())
            }

            ProductSubcommand::Sync { id } => {
                let remote = remote_catalog(config)?;
                let engine = SyncEngine::new(repo, &remote);

                let product = get_owned(repo, *id, config).await?;
                let (product, outcome) = engine.resync(&product).await?;

                match outcome {
                    SyncOutcome::AlreadySynced => {
                        println!("Product {} is already synced", product.id);
                    }
                    SyncOutcome::Synced => {
                        println!("Product {} synced to the remote shop", product.id);
                    }
                    SyncOutcome::Failed { warning } => {
                        println!("Product {} could not be synced", product.id);
                        println!("Warning: {}", warning);
                    }
                    SyncOutcome::Skipped => {}
                }
                print_product(&product);
                Ok(())
            }
        }
    }
}

fn remote_catalog(config: &Config) -> Result<RemoteCatalog, Box<dyn std::error::Error>> {
    let credentials = config.remote.credentials()?;
    Ok(RemoteCatalog::new(SignedClient::new(credentials)))
}

async fn get_owned(
    repo: &ProductRepository,
    id: i64,
    config: &Config,
) -> Result<Product, Box<dyn std::error::Error>> {
    repo.get(id, &config.owner)
        .await?
        .ok_or_else(|| format!("Product {} not found", id).into())
}

fn print_product(product: &Product) {
    println!();
    println!("ID:          {}", product.id);
    println!("Name:        {}", product.name);
    if let Some(description) = &product.description {
        println!("Description: {}", description);
    }
    println!("Price:       {}", product.price);
    if let Some(image_url) = &product.image_url {
        println!("Image:       {}", image_url);
    }
    println!("Status:      {}", product.status);
    match product.remote_id {
        Some(remote_id) => println!("Remote ID:   {}", remote_id),
        None => println!("Remote ID:   (none)"),
    }
}
