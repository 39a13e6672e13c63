use actix_web::{middleware, web, App, HttpServer};
use clap::{Parser, Subcommand};

use recipe_server::config::Config;
use recipe_server::{check, configure, AppState};

#[derive(Parser)]
#[command(name = "recipe-server", version, about = "Recipe management web service")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve HTTP requests (the default).
    Serve,
    /// Create the schema and sample data, then exit.
    InitDb,
    /// Run the deployment smoke checks; exits non-zero when any fails.
    Check {
        /// Delete an existing database file first.
        #[arg(long)]
        fresh: bool,
    },
}

fn to_io(err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let config = cli.config;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Check { fresh } => {
            let report = check::run_checks(&config, fresh).await;
            println!("{}", report);
            std::process::exit(report.exit_code());
        }
        Command::InitDb => {
            let state = AppState::from_config(&config).map_err(to_io)?;
            let seeded = web::block(move || state.init_db(config.seed))
                .await
                .map_err(to_io)?
                .map_err(to_io)?;
            log::info!("database ready (sample data inserted: {})", seeded);
            Ok(())
        }
        Command::Serve => serve(config).await,
    }
}

async fn serve(config: Config) -> std::io::Result<()> {
    // set up database connection pool, schema and circuit breaker
    let state = AppState::from_config(&config).map_err(to_io)?;
    let init_state = state.clone();
    let seed = config.seed;
    web::block(move || init_state.init_db(seed))
        .await
        .map_err(to_io)?
        .map_err(to_io)?;
    let state = web::Data::new(state);

    log::info!("starting HTTP server at http://{}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(config.bind_address.as_str())?
    .run()
    .await
}
