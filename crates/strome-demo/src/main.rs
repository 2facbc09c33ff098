//! Strome Demo - walks the sample user through save, fetch and delete.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strome_core::{Context, MemoryStore, SledStore};
use strome_demo::{run, schema_json, Args, Report, User};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strome=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let user = User::sample();

    let report = if args.memory {
        tracing::info!("using in-memory store");
        let ctx = Context::new(MemoryStore::with_options(args.encode_options()));
        if args.schema {
            println!("{}", schema_json(&ctx)?);
            return Ok(());
        }
        run(&ctx, &user, args.min_age, args.encode_options())?
    } else {
        let config = args.store_config();
        tracing::info!(data_path = %config.path.display(), "opening sled store");
        let ctx = Context::new(SledStore::open(config)?);
        if args.schema {
            println!("{}", schema_json(&ctx)?);
            return Ok(());
        }
        let report = run(&ctx, &user, args.min_age, args.encode_options())?;
        ctx.store().flush()?;
        report
    };

    print_report(&report);
    Ok(())
}

fn print_report(report: &Report) {
    println!("dictionary:\n{}", report.dictionary);
    println!("saved as {}", report.key);
    for summary in &report.matches {
        println!("fetched {} ({})", summary.full_name, summary.age);
    }
    for (entity, id) in &report.outcome.deleted {
        println!("deleted {entity} {id}");
    }
    for (entity, id, relationship) in &report.outcome.nullified {
        println!("nullified {entity}.{relationship} on {id}");
    }
    println!("{} users left", report.remaining);
}
