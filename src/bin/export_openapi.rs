//! Dump the gateway's OpenAPI document
//!
//! ```text
//! export_openapi                      # pretty JSON on stdout
//! export_openapi --output openapi.json
//! ```

use anyhow::Context;
use utoipa::OpenApi;

use corebank::gateway::openapi::ApiDoc;

fn main() -> anyhow::Result<()> {
    let json = ApiDoc::openapi()
        .to_pretty_json()
        .context("serialize OpenAPI document")?;

    let args: Vec<String> = std::env::args().collect();
    match args.iter().position(|a| a == "--output") {
        Some(i) => {
            let path = args.get(i + 1).context("--output needs a file path")?;
            std::fs::write(path, &json).with_context(|| format!("write {}", path))?;
            eprintln!("OpenAPI document written to {}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}
