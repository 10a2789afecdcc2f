use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "eligibility-cli")]
#[command(about = "Operator CLI for the eligibility gateway", long_about = None)]
struct Cli {
    /// Admin API base URL
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Admin bearer token
    #[arg(short, long, env = "ADMIN_API_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// Show circuit breaker state and rolling window
    Breaker,
    /// Show idempotency cache size
    Cache,
    /// Submit an eligibility request to the public endpoint
    Verify {
        /// Request body as JSON
        #[arg(short, long)]
        body: String,

        /// Idempotency key sent as x-idempotency-key
        #[arg(short, long)]
        idempotency_key: Option<String>,

        /// Gateway base URL
        #[arg(long, default_value = "http://localhost:3000")]
        gateway: String,

        /// Caller API key sent as x-api-key
        #[arg(long, env = "API_KEY", default_value = "dev-key-123")]
        api_key: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status => admin_get(&client, &cli.url, "status", headers).await?,
        Commands::Breaker => admin_get(&client, &cli.url, "breaker", headers).await?,
        Commands::Cache => admin_get(&client, &cli.url, "idempotency", headers).await?,
        Commands::Verify {
            body,
            idempotency_key,
            gateway,
            api_key,
        } => {
            let body: Value = serde_json::from_str(&body)?;
            let mut req = client
                .post(format!("{}/eligibility/verify", gateway))
                .header("x-api-key", api_key)
                .json(&body);
            if let Some(key) = idempotency_key {
                req = req.header("x-idempotency-key", key);
            }
            req.send().await?
        }
    };

    print_response(res).await
}

async fn admin_get(
    client: &reqwest::Client,
    base: &str,
    path: &str,
    headers: HeaderMap,
) -> Result<reqwest::Response, reqwest::Error> {
    client
        .get(format!("{}/admin/{}", base, path))
        .headers(headers)
        .send()
        .await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
