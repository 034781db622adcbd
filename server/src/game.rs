use log::debug;
use rand::Rng;
use shared::{GameConfig, Player, PlayerId};

use crate::player_registry::{MoveOutcome, PlayerRegistry};
use crate::tagger::{Handover, TaggerCoordinator};

/// What an accepted or rejected move did to the world
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveReport {
    pub outcome: MoveOutcome,
    /// Player that became the tagger because of this move
    pub tagged: Option<PlayerId>,
}

/// Authoritative world state: every live player plus the tagger
///
/// Each method is one complete transition; the tagger invariant is checked
/// before it returns.
#[derive(Debug)]
pub struct GameState {
    pub config: GameConfig,
    registry: PlayerRegistry,
    tagger: TaggerCoordinator,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            registry: PlayerRegistry::new(),
            tagger: TaggerCoordinator::new(),
        }
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.registry.get(id)
    }

    pub fn tagger_id(&self) -> Option<PlayerId> {
        self.tagger.tagger()
    }

    pub fn is_consistent(&self) -> bool {
        self.tagger.is_consistent(&self.registry)
    }

    /// Registers a new player and elects it tagger if nobody is
    ///
    /// Returns `None` without touching anything if `id` is already playing.
    pub fn join<R: Rng + ?Sized>(
        &mut self,
        id: PlayerId,
        name: Option<&str>,
        rng: &mut R,
    ) -> Option<Player> {
        if self.registry.contains(id) {
            debug!("Player {} is already in the game, ignoring join", id);
            return None;
        }

        let player = self.registry.add(id, name, rng, &self.config.bounds()).clone();
        self.tagger.on_join(id);
        self.tagger.check(&self.registry);

        Some(player)
    }

    /// Applies a movement delta and, if the tagger moved, runs the tag scan
    ///
    /// Returns `None` for unknown identities. Every accepted move scans, including
    /// one that left the tagger where it was (pinned against a wall); frozen moves
    /// never do.
    pub fn move_player(&mut self, id: PlayerId, dx: f32, dy: f32, now: u64) -> Option<MoveReport> {
        let outcome = self
            .registry
            .apply_move(id, dx, dy, &self.config.bounds(), now)?;

        let tagged = match outcome {
            MoveOutcome::Frozen => None,
            MoveOutcome::Moved(_) | MoveOutcome::Unchanged => {
                self.tagger
                    .on_tagger_moved(id, &mut self.registry, &self.config, now)
            }
        };
        self.tagger.check(&self.registry);

        Some(MoveReport { outcome, tagged })
    }

    /// Removes a player and reassigns the tagger if needed
    ///
    /// Returns `None` if `id` was not playing, so repeated disconnects are no-ops.
    /// The inner value is the handover, present only when the tagger left.
    pub fn disconnect(&mut self, id: PlayerId, now: u64) -> Option<Option<Handover>> {
        self.registry.remove(id)?;

        let handover = self
            .tagger
            .on_disconnect(id, &mut self.registry, &self.config, now);
        self.tagger.check(&self.registry);

        Some(handover)
    }

    /// Teleports a player, clamped to the world. Returns false for unknown identities.
    #[cfg(any(test, feature = "test-support"))]
    pub fn place_player(&mut self, id: PlayerId, position: shared::geometry::Position) -> bool {
        self.registry
            .set_position(id, position, &self.config.bounds())
    }
}
