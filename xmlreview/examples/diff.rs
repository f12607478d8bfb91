//! Example: Print the change records between two XML documents
//!
//! This example compares an older and a newer version of one document and
//! writes the records, in export format, to stdout.
//!
//! Usage: cargo run --example diff <before.xml> <after.xml>

use std::env;
use std::io;
use std::path::Path;

use xml_review::{parse_file, write_changes, DiffEngine};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() != 3 {
        eprintln!("Usage: {} <before.xml> <after.xml>", args[0]);
        std::process::exit(1);
    }

    let before_file = &args[1];
    let after_file = &args[2];

    eprintln!("Parsing before: {}", before_file);
    let before = parse_file(before_file)?;

    eprintln!("Parsing after: {}", after_file);
    let after = parse_file(after_file)?;

    let file_id = Path::new(before_file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");

    let changes = DiffEngine::default().diff_trees(file_id, &before, &after);
    write_changes(io::stdout(), &changes)?;
    eprintln!("\n{} changes found", changes.len());

    Ok(())
}
