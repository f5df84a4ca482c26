mod apple;
mod fetch;
mod flatten;
mod google;
mod persist;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "review_scraper", about = "App-store review collector and flattener")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch App Store reviews page by page and flatten to CSV
    Apple {
        /// Numeric App Store app id (the number after "id" in the store URL)
        #[arg(long)]
        app_id: u64,
        /// Max pages to fetch
        #[arg(short = 'n', long, default_value = "10")]
        pages: u32,
        /// App Store country code
        #[arg(short, long, default_value = "gb")]
        country: String,
        /// Output directory for raw pages and the CSV
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// Flatten a pre-fetched Play Store reviews JSON file to CSV
    Google {
        /// Path to the materialized {"reviews": [...]} JSON
        #[arg(short, long)]
        input: PathBuf,
        /// Output directory for the CSV
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Apple {
            app_id,
            pages,
            country,
            out,
        } => {
            let source = fetch::AppleApi::new(app_id, &country);
            let (batch, stats) = apple::collect_pages(&source, pages, &out).await?;
            if batch.is_empty() {
                println!("No reviews collected.");
                return Ok(());
            }
            let path = out.join(persist::csv_file_name(apple::SOURCE, Local::now()));
            persist::write_csv(&batch, &path, Utc::now())?;
            println!(
                "Done: {} pages, {} records ({} skipped). Saved to {}",
                stats.pages,
                stats.records,
                stats.errors,
                path.display()
            );
            Ok(())
        }
        Commands::Google { input, out } => {
            let body = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let root: serde_json::Value = serde_json::from_str(&body)
                .with_context(|| format!("{} is not valid JSON", input.display()))?;

            let (mut batch, skipped) = google::process_reviews(&root);
            if batch.is_empty() {
                println!("No reviews found in {}.", input.display());
                return Ok(());
            }
            persist::add_datetime_column(
                &mut batch,
                "user_comment_last_modified_seconds",
                "user_comment_ts",
            );
            persist::add_datetime_column(
                &mut batch,
                "dev_comment_last_modified_seconds",
                "dev_comment_ts",
            );

            std::fs::create_dir_all(&out)
                .with_context(|| format!("Failed to create output dir {}", out.display()))?;
            let path = out.join(persist::csv_file_name(google::SOURCE, Local::now()));
            persist::write_csv(&batch, &path, Utc::now())?;
            println!(
                "Done: {} records ({} reviews without comments skipped). Saved to {}",
                batch.len(),
                skipped,
                path.display()
            );
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}
