//! image-download worker
//!
//! Binary entry point for the image-download KEDA job.

#[tokio::main]
async fn main() {
    if let Err(e) = image_download::run().await {
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}
