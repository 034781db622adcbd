//! Session event router
//!
//! Turns one inbound session event into a world transition plus the packets that
//! describe it. Routing is pure with respect to I/O: the caller owns the clock,
//! the random source and the actual delivery of the returned [`Outgoing`] list,
//! in order.

use log::{debug, info};
use rand::Rng;
use shared::{Packet, PlayerId};

use crate::game::GameState;
use crate::player_registry::MoveOutcome;

/// Inbound intent from one connection
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Join { id: PlayerId, name: Option<String> },
    /// `dx`/`dy` are a delta, not an absolute position
    Move { id: PlayerId, dx: f32, dy: f32 },
    Disconnect { id: PlayerId },
}

/// Who an outgoing packet is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Only(PlayerId),
    All,
    AllExcept(PlayerId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub target: Target,
    pub packet: Packet,
}

impl Outgoing {
    fn new(target: Target, packet: Packet) -> Self {
        Self { target, packet }
    }
}

/// Applies `event` to `state` and returns the packets to deliver, in order
pub fn route<R: Rng + ?Sized>(
    state: &mut GameState,
    event: SessionEvent,
    rng: &mut R,
    now: u64,
) -> Vec<Outgoing> {
    match event {
        SessionEvent::Join { id, name } => {
            let Some(player) = state.join(id, name.as_deref(), rng) else {
                return Vec::new();
            };
            info!("Player {} joined as {}", id, player.name);

            vec![
                Outgoing::new(
                    Target::Only(id),
                    Packet::CurrentPlayers {
                        players: state.registry().snapshot(),
                        tagger_id: state.tagger_id(),
                    },
                ),
                Outgoing::new(Target::AllExcept(id), Packet::NewPlayer { player }),
            ]
        }

        SessionEvent::Move { id, dx, dy } => {
            let Some(report) = state.move_player(id, dx, dy, now) else {
                debug!("Move from unknown player {} dropped", id);
                return Vec::new();
            };

            let mut outgoing = Vec::new();
            if let MoveOutcome::Moved(position) = report.outcome {
                outgoing.push(Outgoing::new(
                    Target::All,
                    Packet::PlayerMoved {
                        id,
                        x: position.x,
                        y: position.y,
                    },
                ));
            }
            if let Some(tagged) = report.tagged {
                outgoing.push(Outgoing::new(
                    Target::All,
                    Packet::TaggerChanged {
                        tagger_id: Some(tagged),
                    },
                ));
            }
            outgoing
        }

        SessionEvent::Disconnect { id } => {
            let Some(handover) = state.disconnect(id, now) else {
                return Vec::new();
            };
            info!("Player {} left", id);

            let mut outgoing = vec![Outgoing::new(
                Target::All,
                Packet::PlayerDisconnected { id },
            )];
            if let Some(handover) = handover {
                outgoing.push(Outgoing::new(
                    Target::All,
                    Packet::TaggerChanged {
                        tagger_id: handover.to,
                    },
                ));
            }
            outgoing
        }
    }
}
