//! Headless scripted client: joins the game and random-walks for a while

use bincode::{deserialize, serialize};
use clap::Parser;
use log::{info, warn};
use rand::Rng;
use server::BoxError;
use shared::{Packet, PlayerId, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, timeout};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3000")]
    server: String,

    /// Display name to join with
    #[arg(short = 'n', long, default_value = "Bot")]
    name: String,

    /// Number of moves to send before leaving
    #[arg(short = 'm', long, default_value = "200")]
    moves: u32,

    /// Milliseconds between moves
    #[arg(short = 'i', long, default_value = "50")]
    interval_ms: u64,

    /// Largest step along each axis per move
    #[arg(long, default_value = "12.0")]
    step: f32,
}

async fn send(socket: &UdpSocket, server: SocketAddr, packet: &Packet) -> Result<(), BoxError> {
    socket.send_to(&serialize(packet)?, server).await?;
    Ok(())
}

fn describe(packet: &Packet, me: PlayerId) {
    match packet {
        Packet::CurrentPlayers { players, tagger_id } => {
            info!("{} players in game, tagger {:?}", players.len(), tagger_id)
        }
        Packet::NewPlayer { player } => info!("{} joined as player {}", player.name, player.id),
        Packet::TaggerChanged { tagger_id } if *tagger_id == Some(me) => info!("I'm it!"),
        Packet::TaggerChanged { tagger_id } => info!("Tagger is now {:?}", tagger_id),
        Packet::PlayerDisconnected { id } => info!("Player {} left", id),
        Packet::Disconnected { reason } => warn!("Disconnected: {}", reason),
        Packet::PlayerMoved { .. } => {}
        other => warn!("Unexpected packet: {:?}", other),
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::init();

    let args = Args::parse();
    let server: SocketAddr = args.server.parse()?;

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Client socket bound to {}", socket.local_addr()?);

    send(
        &socket,
        server,
        &Packet::Connect {
            client_version: PROTOCOL_VERSION,
        },
    )
    .await?;

    let mut buf = vec![0u8; 65536];
    let (len, _) = timeout(Duration::from_secs(3), socket.recv_from(&mut buf)).await??;
    let me = match deserialize::<Packet>(&buf[..len])? {
        Packet::Connected { client_id } => client_id,
        other => return Err(format!("Expected Connected but got {:?}", other).into()),
    };
    info!("Connection accepted with client ID: {}", me);

    send(
        &socket,
        server,
        &Packet::SetName {
            name: Some(args.name.clone()),
        },
    )
    .await?;

    let mut rng = rand::thread_rng();
    let step = args.step.abs();
    let mut ticker = interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut sent = 0;

    while sent < args.moves {
        tokio::select! {
            _ = ticker.tick() => {
                let x = rng.gen_range(-step..=step);
                let y = rng.gen_range(-step..=step);
                send(&socket, server, &Packet::Move { x, y }).await?;
                sent += 1;
            }
            received = socket.recv_from(&mut buf) => {
                let (len, _) = received?;
                match deserialize::<Packet>(&buf[..len]) {
                    Ok(packet) => describe(&packet, me),
                    Err(e) => warn!("Failed to deserialize packet: {}", e),
                }
            }
        }
    }

    info!("Sending disconnect request");
    send(&socket, server, &Packet::Disconnect).await?;

    Ok(())
}
