use clap::{Parser, Subcommand};

use crate::config;
use crate::routes::{table::application_routes, RouteAction};
use crate::server::{app, AppState};

#[derive(Parser)]
#[command(name = "backlot-gateway")]
#[command(about = "Route access-control gateway for the Backlot platform")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the gateway server")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides GATEWAY_PORT/PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Inspect the application route table")]
    Routes {
        #[command(subcommand)]
        cmd: RoutesCommands,
    },
}

#[derive(Subcommand)]
pub enum RoutesCommands {
    #[command(about = "List every route with its gates")]
    List,

    #[command(about = "Check table integrity (redirect targets, policies, catch-all)")]
    Check,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { port } => serve(port).await,
        Commands::Routes { cmd } => routes(cmd),
    }
}

async fn serve(port_flag: Option<u16>) -> anyhow::Result<()> {
    let config = config::config();
    tracing::info!("Starting Backlot Gateway in {:?} mode", config.environment);

    let state = AppState::from_config();
    state.spawn_platform_poller();
    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = port_flag
        .or_else(|| {
            std::env::var("GATEWAY_PORT")
                .ok()
                .or_else(|| std::env::var("PORT").ok())
                .and_then(|s| s.parse::<u16>().ok())
        })
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    println!("Backlot Gateway listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn routes(cmd: RoutesCommands) -> anyhow::Result<()> {
    let table = application_routes();

    match cmd {
        RoutesCommands::List => {
            for entry in table.entries() {
                match &entry.action {
                    RouteAction::Redirect { to } => {
                        println!("{:<45} -> {}", entry.pattern.raw(), to);
                    }
                    RouteAction::Page { layout, page } => {
                        let gates = if entry.policies.is_empty() {
                            if entry.requires_auth {
                                "auth".to_string()
                            } else {
                                "public".to_string()
                            }
                        } else {
                            entry
                                .policies
                                .iter()
                                .map(|p| {
                                    p.required_roles
                                        .iter()
                                        .map(|r| r.as_str())
                                        .collect::<Vec<_>>()
                                        .join("|")
                                })
                                .collect::<Vec<_>>()
                                .join(" > ")
                        };
                        println!(
                            "{:<45} {:?}/{} [{}]",
                            entry.pattern.raw(),
                            layout,
                            page,
                            gates
                        );
                    }
                }
            }
            Ok(())
        }
        RoutesCommands::Check => match table.check() {
            Ok(()) => {
                println!("route table OK ({} entries)", table.entries().len());
                Ok(())
            }
            Err(problems) => {
                for p in &problems {
                    eprintln!("error: {}", p);
                }
                anyhow::bail!("{} route table problem(s)", problems.len())
            }
        },
    }
}
