use clap::Parser;
use dotenvy::dotenv;
use log::info;
use loyalty_server::{cli::Arguments, config::ServerConfig, server::run_server};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let config = Arguments::parse().apply(ServerConfig::from_env_or_default());

    info!("🚀️ Starting server on {}", config.run_address);
    match run_server(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}
