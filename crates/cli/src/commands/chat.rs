use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use finmate_agent::conversation::ConversationState;
use finmate_agent::flow::ConditionCatalog;
use finmate_agent::runtime::AdvisorRuntime;
use finmate_core::catalog::{normalize_products, CatalogProduct};
use finmate_core::config::{AppConfig, LoadOptions};
use finmate_core::domain::product_type::ProductType;
use serde_json::Value;

use crate::commands::CommandResult;

pub fn run(catalog_path: Option<&Path>, product_type: Option<&str>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let products = match catalog_path.map(load_catalog).transpose() {
        Ok(products) => products.unwrap_or_default(),
        Err(error) => return CommandResult::invalid_input("chat", format!("{error:#}")),
    };
    let product_type = match product_type.map(str::parse::<ProductType>).transpose() {
        Ok(product_type) => product_type,
        Err(error) => return CommandResult::invalid_input("chat", error.to_string()),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let advisor = AdvisorRuntime::new(ConditionCatalog::builtin(), config.advisor.clone());
    let stdin = io::stdin();
    let stdout = io::stdout();
    let result = runtime.block_on(converse(
        &advisor,
        &products,
        product_type,
        stdin.lock(),
        &mut stdout.lock(),
    ));

    match result {
        Ok(turns) => CommandResult::success("chat", format!("conversation ended after {turns} turns")),
        Err(error) => CommandResult::failure("chat", "io", error.to_string(), 1),
    }
}

/// Reads one user message per line until EOF or `/quit`, writing each reply
/// followed by a blank line. Returns the number of turns handled.
///
/// Without a fixed product type, the first message picks one.
pub async fn converse<R: BufRead, W: Write>(
    advisor: &AdvisorRuntime,
    products: &[CatalogProduct],
    product_type: Option<ProductType>,
    input: R,
    output: &mut W,
) -> io::Result<u32> {
    let mut state = product_type.map(ConversationState::new);

    for line in input.lines() {
        let line = line?;
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "/quit" | "/exit") {
            break;
        }

        let current =
            state.take().unwrap_or_else(|| ConversationState::for_opening_message(message));
        let (next, reply) = advisor.respond(&current, message, products).await;
        writeln!(output, "{reply}\n")?;
        output.flush()?;
        state = Some(next);
    }

    Ok(state.map(|state| state.turns).unwrap_or(0))
}

/// Product rows from a JSON file holding either an array or `{"products": [...]}`.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogProduct>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("catalog {} is not valid JSON", path.display()))?;

    let rows = match value {
        Value::Array(rows) => rows,
        Value::Object(mut object) => match object.remove("products") {
            Some(Value::Array(rows)) => rows,
            _ => bail!("catalog {} has no products array", path.display()),
        },
        _ => bail!("catalog {} must be a JSON array of products", path.display()),
    };

    Ok(normalize_products(&rows))
}
