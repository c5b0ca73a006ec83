//! Bulk-create tasks by posting each row of a CSV file to a running API.

use std::path::PathBuf;

use clap::Parser;
use serde_json::{json, Value};

use task_api::tasks::import::{self, EXPECTED_HEADER};

#[derive(Parser)]
#[command(name = "import-csv")]
#[command(about = "Import tasks from a CSV file into the Task API", long_about = None)]
struct Cli {
    /// CSV file with a `title,description` header.
    file: PathBuf,

    /// Base URL of the API.
    #[arg(short, long, env = "API_URL", default_value = "http://localhost:3000")]
    api_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let data = std::fs::read(&cli.file)
        .map_err(|e| format!("cannot read {}: {e}", cli.file.display()))?;

    let header = import::read_header(&data)?;
    if !import::has_expected_header(&header) {
        return Err(format!(
            "expected header `{}`, found `{}`",
            EXPECTED_HEADER.join(","),
            header.join(",")
        )
        .into());
    }

    let records = import::read_records(&data)?;
    if records.is_empty() {
        return Err("CSV file has no data rows".into());
    }

    let client = reqwest::Client::new();
    let endpoint = format!("{}/tasks", cli.api_url.trim_end_matches('/'));
    let (mut created, mut failed) = (0usize, 0usize);

    for record in records {
        let body = json!({ "title": record.title, "description": record.description });
        match post_task(&client, &endpoint, &body).await {
            Ok(()) => created += 1,
            Err(e) => {
                failed += 1;
                eprintln!("Row {}: {e}", record.line);
            }
        }
    }

    println!("Imported {created} task(s), {failed} failed");
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

async fn post_task(client: &reqwest::Client, endpoint: &str, body: &Value) -> Result<(), String> {
    let res = client
        .post(endpoint)
        .json(body)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = res.status();
    if status.is_success() {
        return Ok(());
    }
    let detail = res
        .json::<Value>()
        .await
        .ok()
        .and_then(|v| v.get("errors").or(v.get("message")).map(Value::to_string))
        .unwrap_or_default();
    Err(format!("API returned {status} {detail}"))
}
