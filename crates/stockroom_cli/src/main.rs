// The CLI is intentionally minimal: no argument parsing, no options. Run
// `stockroom` in a directory; configuration is read from `stockroom.toml`
// when present and falls back to defaults otherwise.
//
// Exit codes:
// - 0: normal termination
// - 1: startup failed (bad config, store initialization, port in use)

use std::env;
use std::process;

use stockroom_base::pal::http::HttpServerConfig;
use stockroom_base::tracing::init_tracing;
use stockroom_base::{FilePath, PalHandle, RealPal};
use stockroom_engine::store::{JsonFileStore, StoreHandle};
use stockroom_engine::{ApiService, load_config};

fn main() {
    init_tracing().unwrap();

    let current_dir = env::current_dir().unwrap_or_else(|e| {
        eprintln!("Error: Failed to get current directory: {}", e);
        process::exit(1);
    });

    let pal = PalHandle::new(RealPal::new(current_dir));

    let config = match load_config(&pal, &FilePath::from("stockroom.toml")) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config from stockroom.toml: {}", e);
            process::exit(1);
        }
    };

    let store = StoreHandle::new(JsonFileStore::new(
        pal.clone(),
        FilePath::from(config.data_file.clone()),
    ));

    if let Err(e) = store.initialize() {
        eprintln!(
            "Error: Failed to initialize inventory file {}: {}",
            config.data_file, e
        );
        process::exit(1);
    }

    println!("Inventory initialized: {}", config.data_file);

    let service = ApiService::new(store);
    let server_config = HttpServerConfig::new(config.host.clone()).with_port(config.port);

    let handle = match pal.start_http_server(Box::new(service), server_config) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error: Failed to start HTTP server: {}", e);
            process::exit(1);
        }
    };

    println!(
        "Inventory API listening on http://{}",
        handle.address(&config.host)
    );

    // Serve until the process is terminated; dropping the handle would shut
    // the server down.
    loop {
        std::thread::park();
    }
}
