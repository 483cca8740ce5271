//! Ids command: dump an identity tree.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;

use crate::error::{CraftError, Result};
use crate::identity::IdentityRegistry;
use crate::output::{display_path, plural, Printer};

/// Print an identity tree
#[derive(Args, Debug)]
pub struct IdsArgs {
    /// Identity file (usually build/uuid.json)
    pub file: PathBuf,

    /// Only list one category, e.g. assets.textures
    #[arg(long, short)]
    pub category: Option<String>,
}

pub fn run(args: IdsArgs, printer: &Printer) -> Result<()> {
    if !args.file.is_file() {
        return Err(CraftError::Io {
            path: args.file.clone(),
            message: "Identity file not found".to_string(),
        });
    }
    let registry = IdentityRegistry::open(&args.file)?;
    let rows = rows(&registry, args.category.as_deref());

    let mut stdout = io::stdout().lock();
    for line in format_rows(&rows) {
        writeln!(stdout, "{}", line)?;
    }

    printer.info(
        "Listed",
        &format!(
            "{} from {}",
            plural(rows.len(), "identifier", "identifiers"),
            display_path(&args.file)
        ),
    );
    Ok(())
}

fn rows(registry: &IdentityRegistry, category: Option<&str>) -> Vec<(String, String, String)> {
    match category {
        Some(category) => registry
            .list_category(category)
            .into_iter()
            .map(|(id, key)| (id.to_string(), category.to_string(), key))
            .collect(),
        None => registry
            .entries()
            .into_iter()
            .map(|(id, category, key)| (id.to_string(), category, key))
            .collect(),
    }
}

/// `identifier  category  key`, with the first two columns padded.
fn format_rows(rows: &[(String, String, String)]) -> Vec<String> {
    let id_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(0);
    let category_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(id, category, key)| format!("{id:<id_width$}  {category:<category_width$}  {key}"))
        .collect()
}
