//! Player registry: the only mutation path into per-player world state
//!
//! The registry owns every live [`Player`] keyed by the connection identity that
//! created it. Lookups of unknown identities are normal outcomes (a late move
//! from a connection that already left), so nothing here returns an error.
//!
//! Players are kept in a `BTreeMap`, which makes iteration ascending by
//! [`PlayerId`]. The tagger coordinator relies on that order for its scans.

use log::{debug, info};
use rand::Rng;
use shared::geometry::{clamp, Bounds, Position};
use shared::{display_name, Player, PlayerId};
use std::collections::{BTreeMap, HashMap};

use crate::utils::random_color;

/// Result of applying a movement delta to a known player
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    /// The player is frozen; position was left untouched
    Frozen,
    /// The delta did not change the clamped position
    Unchanged,
    /// The player now stands at the given position
    Moved(Position),
}

#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: BTreeMap<PlayerId, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self {
            players: BTreeMap::new(),
        }
    }

    /// Creates a player for `id` at a random spot inside `bounds`
    ///
    /// A missing or blank name becomes the default display name. The colour and
    /// spawn point come from `rng` so callers decide how reproducible they are.
    /// Re-adding a present identity replaces the previous record.
    pub fn add<R: Rng + ?Sized>(
        &mut self,
        id: PlayerId,
        name: Option<&str>,
        rng: &mut R,
        bounds: &Bounds,
    ) -> &Player {
        let x = rng.gen_range(bounds.min_x..=bounds.max_x);
        let y = rng.gen_range(bounds.min_y..=bounds.max_y);
        let player = Player::new(id, display_name(name), x, y, random_color(rng));

        info!(
            "Added player {} ({}) at ({:.1}, {:.1})",
            id, player.name, player.x, player.y
        );
        if self.players.insert(id, player).is_some() {
            info!("Player {} was already registered and has been replaced", id);
        }

        &self.players[&id]
    }

    /// Removes a player, returning the record if it was present
    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        let removed = self.players.remove(&id);
        if removed.is_some() {
            info!("Removed player {}", id);
        }
        removed
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    /// Adds `(dx, dy)` to the player's position and clamps it into `bounds`
    ///
    /// Returns `None` for an unknown identity. A frozen player keeps its
    /// position. Non-finite deltas are treated as no movement.
    pub fn apply_move(
        &mut self,
        id: PlayerId,
        dx: f32,
        dy: f32,
        bounds: &Bounds,
        now: u64,
    ) -> Option<MoveOutcome> {
        let player = self.players.get_mut(&id)?;

        if player.is_frozen(now) {
            debug!(
                "Player {} is frozen for another {}ms",
                id,
                player.frozen_until - now
            );
            return Some(MoveOutcome::Frozen);
        }

        if !dx.is_finite() || !dy.is_finite() {
            return Some(MoveOutcome::Unchanged);
        }

        let current = player.position();
        let next = clamp(current.offset(dx, dy), bounds);
        if next == current {
            return Some(MoveOutcome::Unchanged);
        }

        player.set_position(next);
        Some(MoveOutcome::Moved(next))
    }

    /// Moves a player straight to `position`, clamped into `bounds`, ignoring any freeze
    ///
    /// Returns false if the identity is unknown.
    #[cfg(any(test, feature = "test-support"))]
    pub fn set_position(&mut self, id: PlayerId, position: Position, bounds: &Bounds) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.set_position(clamp(position, bounds));
                true
            }
            None => false,
        }
    }

    /// Sets the player's frozen-until timestamp. Returns false if the identity is unknown.
    pub fn freeze(&mut self, id: PlayerId, until: u64) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.frozen_until = until;
                true
            }
            None => false,
        }
    }

    /// All live identities, ascending
    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    /// Live players, ascending by identity
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Copy of every player record, as sent to a joining client
    pub fn snapshot(&self) -> HashMap<PlayerId, Player> {
        self.players
            .iter()
            .map(|(id, player)| (*id, player.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
