#[tokio::main]
async fn main() {
    if let Err(err) = specter::run().await {
        eprintln!("specter failed:\n  {err}");
        std::process::exit(1);
    }
}
