use std::env;
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let port = raw_args
            .get(2)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        let data_dir = raw_args
            .get(3)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("plans"));
        if let Err(e) = wealthpanel::api::run_http_server(port, data_dir).await {
            eprintln!("Server error: {e}");
            std::process::exit(1);
        }
        return;
    }

    eprintln!("Usage: cargo run -- serve [port] [data-dir]");
    std::process::exit(1);
}
