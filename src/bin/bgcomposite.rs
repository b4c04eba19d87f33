//! Background compositor CLI tool
//!
//! Command-line interface for placing background-removed product photos on a
//! fixed-size canvas while keeping tags and labels the segmenter dropped.

#[cfg(feature = "cli")]
use bgcomposite::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
