use clap::{Args, Subcommand};

use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show,
    /// Print the default config file path
    Path,
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show => {
                println!("Configuration");
                println!("=============\n");

                println!("database_path: {}", config.database_path.display());
                println!("owner:         {}", config.owner);
                println!();

                if config.remote.is_configured() {
                    let creds = config.remote.credentials()?;
                    println!("remote:");
                    println!("  api_url:         {}", creds.api_url);
                    println!("  consumer_key:    {}", creds.consumer_key);
                    println!(
                        "  consumer_secret: {}...",
                        &creds.consumer_secret[..creds.consumer_secret.len().min(4)]
                    );
                } else {
                    println!("remote: not configured");
                    println!();
                    println!("To enable remote sync, add to your config file:");
                    println!();
                    println!("  remote:");
                    println!("    api_url: \"https://shop.example.com/wp-json/wc/v3\"");
                    println!("    consumer_key: \"ck_...\"");
                    println!("    consumer_secret: \"cs_...\"");
                    println!();
                    println!("Or set environment variables:");
                    println!("  SHOPSYNC_API_URL");
                    println!("  SHOPSYNC_CONSUMER_KEY");
                    println!("  SHOPSYNC_CONSUMER_SECRET");
                }
                Ok(())
            }
            ConfigSubcommand::Path => {
                println!("{}", Config::default_config_path().display());
                Ok(())
            }
        }
    }
}
