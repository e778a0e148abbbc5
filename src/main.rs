#[tokio::main]
async fn main() {
    if let Err(e) = anytime_stop_lib::run().await {
        eprintln!("anytime-stop failed: {e}");
        std::process::exit(1);
    }
}
