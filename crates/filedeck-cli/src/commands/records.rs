//! Raw record commands for any collection.

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde_json::Value;

use filedeck_core::traits::Session;
use filedeck_core::types::CollectionName;
use filedeck_core::{ListQuery, RecordFields};

use super::{attachment, record_id};
use crate::output;
use crate::session::SessionStore;

#[derive(Args, Debug)]
pub struct RecordsCommand {
    #[command(subcommand)]
    pub command: RecordsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum RecordsSubcommand {
    /// List every record of a collection, one JSON object per line
    List(ListArgs),

    /// Fetch a single record
    Get(GetArgs),

    /// Create a record from JSON fields
    Create(WriteArgs),

    /// Update a record with JSON fields
    Update(UpdateArgs),

    /// Delete a record
    Delete(GetArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    pub collection: String,

    /// Sort expression, e.g. "-created,name"
    #[arg(long)]
    pub sort: Option<String>,

    /// Filter expression, e.g. 'owner = "abc" && name ~ "report"'
    #[arg(long)]
    pub filter: Option<String>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    pub collection: String,
    pub id: String,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    pub collection: String,

    /// JSON file with the field values (use - for stdin)
    #[arg(long)]
    pub json: Option<String>,

    /// Attach a file as FIELD=PATH; repeatable
    #[arg(long = "file", value_name = "FIELD=PATH")]
    pub files: Vec<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub id: String,

    #[command(flatten)]
    pub write: WriteArgs,
}

pub async fn handle(cmd: RecordsCommand, store: &SessionStore) -> Result<()> {
    let session = store.require().await?;

    match cmd.command {
        RecordsSubcommand::List(args) => {
            let collection = collection(&args.collection)?;
            let query = ListQuery {
                sort: args.sort,
                filter: args.filter,
            };
            let records = session
                .get_full_list(&collection, &query)
                .await
                .context("Failed to list records")?;

            if records.is_empty() {
                eprintln!("{}", "No records found.".dimmed());
                return Ok(());
            }
            for record in &records {
                if args.pretty {
                    output::json_pretty(record)?;
                } else {
                    output::json(record)?;
                }
            }
            output::hint(&format!("{} records", records.len()));
        }
        RecordsSubcommand::Get(args) => {
            let record = session
                .get_one(&collection(&args.collection)?, &record_id(&args.id)?)
                .await
                .context("Failed to fetch record")?;
            output::json_pretty(&record)?;
        }
        RecordsSubcommand::Create(args) => {
            let collection = collection(&args.collection)?;
            let fields = fields(&args)?;
            let record = session
                .create(&collection, &fields)
                .await
                .context("Failed to create record")?;
            output::json(&record)?;
            output::success(&format!("Created {} record {}", collection, record.id));
        }
        RecordsSubcommand::Update(args) => {
            let collection = collection(&args.write.collection)?;
            let fields = fields(&args.write)?;
            let record = session
                .update(&collection, &record_id(&args.id)?, &fields)
                .await
                .context("Failed to update record")?;
            output::json(&record)?;
            output::success(&format!("Updated {} record {}", collection, record.id));
        }
        RecordsSubcommand::Delete(args) => {
            let collection = collection(&args.collection)?;
            session
                .delete(&collection, &record_id(&args.id)?)
                .await
                .context("Failed to delete record")?;
            output::success(&format!("Deleted {} record {}", collection, args.id));
        }
    }

    Ok(())
}

fn collection(name: &str) -> Result<CollectionName> {
    CollectionName::new(name).with_context(|| format!("Invalid collection name '{}'", name))
}

fn fields(args: &WriteArgs) -> Result<RecordFields> {
    let value: Value = match args.json.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            serde_json::from_str(&buf).context("Invalid JSON from stdin")?
        }
        Some(path) => {
            let content = std::fs::read_to_string(path).context("Failed to read JSON file")?;
            serde_json::from_str(&content).context("Invalid JSON in file")?
        }
        None => Value::Object(serde_json::Map::new()),
    };

    let mut fields = RecordFields::from_value(value).context("Invalid record fields")?;
    for pair in &args.files {
        let (field, path) = pair
            .split_once('=')
            .with_context(|| format!("Expected FIELD=PATH, got '{}'", pair))?;
        fields = fields.attach(field, attachment(&PathBuf::from(path))?);
    }
    Ok(fields)
}
