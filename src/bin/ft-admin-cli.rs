use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "ft-admin-cli")]
#[command(about = "Command-line client for the ft-admin gateway", long_about = None)]
struct Cli {
    #[arg(short, long, env = "FT_ADMIN_URL", default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a new fungible token class
    Issue {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        subunit: String,
        #[arg(long, default_value_t = 6)]
        precision: u32,
        /// Initial supply in subunits, as a decimal integer
        #[arg(long, default_value = "0")]
        initial_amount: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Transfer admin rights of a denom to another account
    TransferAdmin {
        #[arg(long)]
        denom: String,
        #[arg(long)]
        new_admin: String,
    },
    /// Clear admin rights of a denom
    ClearAdmin {
        #[arg(long)]
        denom: String,
    },
    /// Check node reachability through the gateway
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Issue {
            symbol,
            subunit,
            precision,
            initial_amount,
            description,
        } => {
            client
                .post(format!("{}/api/issue-token", base))
                .json(&json!({
                    "symbol": symbol,
                    "subunit": subunit,
                    "precision": precision,
                    "initial_amount": initial_amount,
                    "description": description,
                }))
                .send()
                .await?
        }
        Commands::TransferAdmin { denom, new_admin } => {
            client
                .post(format!("{}/api/transfer-admin", base))
                .json(&json!({ "denom": denom, "new_admin": new_admin }))
                .send()
                .await?
        }
        Commands::ClearAdmin { denom } => {
            client
                .post(format!("{}/api/clear-admin", base))
                .json(&json!({ "denom": denom }))
                .send()
                .await?
        }
        Commands::Status => client.get(format!("{}/api/status", base)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", rendered);
        Ok(())
    } else {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("{}", rendered);
        std::process::exit(1);
    }
}
