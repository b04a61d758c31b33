//! image-resize worker
//!
//! Binary entry point for the image-resize KEDA job.

#[tokio::main]
async fn main() {
    if let Err(e) = image_resize::run().await {
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}
