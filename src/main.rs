#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = autobuy_lib::run().await {
        eprintln!("autobuy: {e}");
        std::process::exit(1);
    }
}
