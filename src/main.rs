use clap::Parser;
use log::info;

use agon_web_serve::logger;
use agon_web_serve::server::HttpServer;
use agon_web_serve::server::config::{self, ServerConfig};
use agon_web_serve::server::shutdown;

fn main() {
    logger::init();

    let config = ServerConfig::parse();

    let root = match config::serving_root() {
        Ok(root) => root,
        Err(e) => {
            eprintln!("Cannot resolve serving root: {}", e);
            std::process::exit(1);
        }
    };
    info!("Serving root: {}", root.display());

    shutdown::install();

    let server = match HttpServer::bind(&config, root) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Cannot listen on port {}: {}", config.port, e);
            std::process::exit(1);
        }
    };

    println!("Serving Agon Web VDP at http://localhost:{}", config.port);
    println!("Press Ctrl+C to stop");

    server.run();

    println!("\nShutting down...");
}
