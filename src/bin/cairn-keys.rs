//! cairn-keys - List the keys of an existing store.
//!
//! Spot-check tool: opens a store read-only and walks the cursor in key
//! order. Safe to run while an ingestion is in progress; only committed
//! records are visible.

use std::path::PathBuf;

use clap::Parser;
use lloggs::LoggingArgs;

use cairn::Store;

#[derive(Parser, Debug)]
#[command(name = "cairn-keys")]
#[command(about = "List keys of a store in lexicographic order")]
struct Args {
    /// Store directory to inspect
    store: PathBuf,

    /// Maximum number of keys to print (0 = all)
    #[arg(long, short = 'n', default_value_t = 200)]
    count: usize,

    /// Also print each value's size in bytes
    #[arg(long)]
    sizes: bool,

    #[command(flatten)]
    logging: LoggingArgs,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    let _guard = args.logging.setup(|v| match v {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    })?;

    let store = Store::open_read_only(&args.store)?;
    let rtxn = store.read_txn()?;

    let mut printed = 0usize;
    let mut total = 0usize;
    for item in store.iter(&rtxn)? {
        let (key, value) = item?;
        total += 1;
        if args.count == 0 || printed < args.count {
            if args.sizes {
                println!("{}\t{}", String::from_utf8_lossy(key), value.len());
            } else {
                println!("{}", String::from_utf8_lossy(key));
            }
            printed += 1;
        }
    }

    eprintln!("{} records ({} shown)", total, printed);

    Ok(())
}
