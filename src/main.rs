#[tokio::main]
async fn main() {
    if let Err(e) = carepulse_lib::run().await {
        eprintln!("carepulse: {e}");
        std::process::exit(1);
    }
}
