use menuscan::{logger, models::ScanResponse, vision, Config, MenuScanner};
use std::env;
use std::process::ExitCode;

const USAGE: &str = "usage: menuscan scan <image> | menuscan serve";

#[tokio::main]
async fn main() -> ExitCode {
    let env_loaded = dotenv::dotenv().is_ok();

    if let Err(e) = logger::init_with_config(logger::LoggerConfig::from_env()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }
    if !env_loaded {
        log::debug!("No .env file found, using process environment");
    }

    match run(env::args().skip(1).collect()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    logger::log_startup_info(&config);

    match args.first().map(String::as_str) {
        Some("scan") => {
            let path = args.get(1).ok_or(USAGE)?;
            let scanner = MenuScanner::from_config(vision::connect(&config).await?, &config);
            let dishes = scanner.scan_file(path).await?;
            println!("{}", serde_json::to_string_pretty(&ScanResponse { dishes })?);
            Ok(())
        }
        Some("serve") => serve(config).await,
        _ => Err(USAGE.into()),
    }
}

#[cfg(feature = "server")]
async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let scanner = MenuScanner::from_config(vision::connect(&config).await?, &config);
    menuscan::server::run(scanner, config.port).await?;
    Ok(())
}

#[cfg(not(feature = "server"))]
async fn serve(_config: Config) -> Result<(), Box<dyn std::error::Error>> {
    Err("menuscan was built without the `server` feature".into())
}
