use clap::Parser;
use log::{error, info};
use server::network::{Server, ServerSettings};
use server::BoxError;
use shared::{GameConfig, FREEZE_DURATION_MS, PLAYER_MARGIN, TAG_RADIUS, WORLD_HEIGHT, WORLD_WIDTH};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Maximum number of concurrent connections
    #[arg(short, long, default_value = "32")]
    max_clients: usize,

    /// Seconds of silence before a client counts as disconnected
    #[arg(long, default_value = "5")]
    client_timeout_secs: u64,

    /// World width in world units
    #[arg(long, default_value_t = WORLD_WIDTH)]
    width: f32,

    /// World height in world units
    #[arg(long, default_value_t = WORLD_HEIGHT)]
    height: f32,

    /// Distance players keep from the world edge
    #[arg(long, default_value_t = PLAYER_MARGIN)]
    margin: f32,

    /// Tagger reach; anyone strictly closer is tagged
    #[arg(long, default_value_t = TAG_RADIUS)]
    tag_radius: f32,

    /// How long a newly tagged player is frozen, in milliseconds
    #[arg(long, default_value_t = FREEZE_DURATION_MS)]
    freeze_ms: u64,
}

impl Args {
    fn game_config(&self) -> GameConfig {
        GameConfig {
            world_width: self.width,
            world_height: self.height,
            player_margin: self.margin,
            tag_radius: self.tag_radius,
            freeze_duration_ms: self.freeze_ms,
        }
    }

    fn settings(&self) -> ServerSettings {
        ServerSettings {
            max_clients: self.max_clients,
            client_timeout: Duration::from_secs(self.client_timeout_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    info!("Starting tag server on {}", address);
    info!("Game config: {:?}", args.game_config());

    let mut server = Server::new(&address, args.game_config(), args.settings()).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = &result {
                error!("Server stopped with error: {}", e);
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
