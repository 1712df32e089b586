#[tokio::main]
async fn main() {
    if let Err(err) = admute_lib::run().await {
        // stderr too: logs may be going to a file
        log::error!("{err:#}");
        eprintln!("admute: {err:#}");
        std::process::exit(1);
    }
}
