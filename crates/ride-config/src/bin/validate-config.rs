//! Configuration validation utility
//!
//! Usage: cargo run --bin validate-config config/local.toml

use std::env;
use std::process;

use ride_config::ConfigLoader;

#[tokio::main]
async fn main() {
	let args: Vec<String> = env::args().collect();

	if args.len() != 2 {
		eprintln!("Usage: {} <config-file>", args[0]);
		process::exit(1);
	}

	let config_path = &args[1];

	println!("Validating configuration file: {}", config_path);

	match ConfigLoader::new().with_file(config_path).load().await {
		Ok(config) => {
			println!("✅ Configuration is valid!");
			println!("Listen address: {}:{}", config.server.host, config.server.port);
			println!("Cache backend: {}", config.cache.backend);
			println!("Ride API: {}", config.ride_api.base_url);
			println!("Token service: {}", config.token_service.base_url);
			for service in &config.services {
				println!("Service: {} ({})", service.name, service.id);
			}
		}
		Err(e) => {
			eprintln!("❌ Configuration validation failed:");
			eprintln!("{}", e);
			process::exit(1);
		}
	}
}
