//! Tagger coordinator
//!
//! Owns the single "who is it" value and the freeze-on-tag rule. Every transition
//! takes the registry by reference so the freeze penalty lands on the same record
//! the rest of the server reads.
//!
//! Scans walk the registry in ascending [`PlayerId`] order, so when several
//! players are in range of the tagger at once the lowest identity is tagged, and
//! a departing tagger is succeeded by the lowest remaining identity.

use log::{error, info};
use shared::geometry::colliding;
use shared::{GameConfig, PlayerId};

use crate::player_registry::PlayerRegistry;

/// Tagger transfer caused by the current tagger leaving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handover {
    pub from: PlayerId,
    /// `None` when nobody is left to take over
    pub to: Option<PlayerId>,
}

#[derive(Debug, Default)]
pub struct TaggerCoordinator {
    tagger: Option<PlayerId>,
}

impl TaggerCoordinator {
    pub fn new() -> Self {
        Self { tagger: None }
    }

    pub fn tagger(&self) -> Option<PlayerId> {
        self.tagger
    }

    pub fn is_tagger(&self, id: PlayerId) -> bool {
        self.tagger == Some(id)
    }

    /// First-join transition. Returns true if `id` became the tagger.
    ///
    /// The first tagger is not frozen.
    pub fn on_join(&mut self, id: PlayerId) -> bool {
        if self.tagger.is_some() {
            return false;
        }

        info!("Player {} is it", id);
        self.tagger = Some(id);
        true
    }

    /// Tag transition, run after an accepted move by `mover`
    ///
    /// Does nothing unless `mover` is the tagger. Otherwise the first other
    /// player within `tag_radius` becomes the tagger and is frozen for
    /// `freeze_duration_ms`. At most one transfer happens per call.
    pub fn on_tagger_moved(
        &mut self,
        mover: PlayerId,
        registry: &mut PlayerRegistry,
        config: &GameConfig,
        now: u64,
    ) -> Option<PlayerId> {
        if !self.is_tagger(mover) {
            return None;
        }

        let tagger_position = registry.get(mover)?.position();
        let tagged = registry
            .iter()
            .filter(|player| player.id != mover)
            .find(|player| colliding(&tagger_position, &player.position(), config.tag_radius))
            .map(|player| player.id)?;

        self.tagger = Some(tagged);
        registry.freeze(tagged, now.saturating_add(config.freeze_duration_ms));
        info!("Player {} tagged player {}", mover, tagged);

        Some(tagged)
    }

    /// Disconnect-reassignment transition, run after `leaver` was removed from `registry`
    ///
    /// Returns `None` if the leaver was not the tagger. Otherwise the lowest
    /// remaining identity (if any) takes over and is frozen like a tagged player.
    pub fn on_disconnect(
        &mut self,
        leaver: PlayerId,
        registry: &mut PlayerRegistry,
        config: &GameConfig,
        now: u64,
    ) -> Option<Handover> {
        if !self.is_tagger(leaver) {
            return None;
        }

        let successor = registry
            .iter()
            .map(|player| player.id)
            .find(|id| *id != leaver);
        self.tagger = successor;

        match successor {
            Some(next) => {
                registry.freeze(next, now.saturating_add(config.freeze_duration_ms));
                info!("Tagger {} left, player {} is it", leaver, next);
            }
            None => info!("Tagger {} left, nobody is it", leaver),
        }

        Some(Handover {
            from: leaver,
            to: successor,
        })
    }

    /// Tagger is unset exactly when the registry is empty, and always names a live player
    pub fn is_consistent(&self, registry: &PlayerRegistry) -> bool {
        match self.tagger {
            None => registry.is_empty(),
            Some(id) => registry.contains(id),
        }
    }

    /// Logs and debug-asserts [`Self::is_consistent`]
    pub fn check(&self, registry: &PlayerRegistry) {
        let consistent = self.is_consistent(registry);
        if !consistent {
            error!(
                "Tagger {:?} inconsistent with {} registered players",
                self.tagger,
                registry.len()
            );
        }
        debug_assert!(consistent, "tagger must be set iff players exist");
    }
}
