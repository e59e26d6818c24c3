//! Economy and combat rules.
//!
//! Every operation here is check-then-mutate on the entities it is handed;
//! the event worker processes one event at a time, so a sequence is never
//! interleaved with another mutation of the same entity. Persistence and
//! broadcasting stay with the caller.

use std::collections::HashMap;

use crate::world::errors::EconomyError;
use crate::world::geometry::Vec2;
use crate::world::types::{
    FurniturePlacement, ItemRecord, PlayerSession, PlotRecord, SessionId,
};

/// Battle mode under which matching team labels suppress damage. Solo
/// fighters hit each other regardless of any label they carry.
pub const BATTLE_MODE_TEAM: &str = "team";

/// Attack inputs captured from the attacker before the target is borrowed
/// mutably.
#[derive(Debug, Clone)]
pub struct AttackerProfile {
    pub id: SessionId,
    pub position: Vec2,
    pub damage: i32,
    pub range: f32,
    pub battle_mode: Option<String>,
    pub team: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    /// Team mode with the same non-null team; no damage applied.
    FriendlyFire,
    /// Target too far for the attacker's weapon.
    OutOfRange,
    /// Damage applied, target survives with `hp`.
    Hit { hp: i32 },
    /// Target died; health and position already reset to the respawn state.
    Killed,
}

/// Rule constants and the check-then-mutate operations built on them.
pub struct Arbiter {
    pub quiz_reward: i64,
    pub kill_reward: i64,
    pub default_damage: i32,
    pub default_range: f32,
}

impl Arbiter {
    /// Transfers plot ownership to `buyer`. Ownership is checked before
    /// funds so a sold-out plot reports `AlreadyOwned` even to a broke
    /// buyer.
    pub fn buy_plot(
        &self,
        buyer: &mut PlayerSession,
        plot: &mut PlotRecord,
    ) -> Result<(), EconomyError> {
        if plot.owner.is_some() {
            return Err(EconomyError::AlreadyOwned);
        }
        if !buyer.debit(plot.price) {
            return Err(EconomyError::InsufficientFunds);
        }
        plot.owner = Some(buyer.username.clone());
        plot.touch();
        Ok(())
    }

    /// Appends a furniture placement to a plot the actor owns.
    pub fn place_furniture(
        &self,
        actor: &PlayerSession,
        plot: &mut PlotRecord,
        placement: FurniturePlacement,
    ) -> Result<(), EconomyError> {
        if plot.owner.as_deref() != Some(actor.username.as_str()) {
            return Err(EconomyError::NotOwner);
        }
        plot.furniture.push(placement);
        plot.touch();
        Ok(())
    }

    /// Buys a catalog item into the buyer's single equipment slot,
    /// overwriting whatever was there.
    pub fn buy_item(
        &self,
        buyer: &mut PlayerSession,
        item: &ItemRecord,
    ) -> Result<(), EconomyError> {
        if !buyer.debit(item.price) {
            return Err(EconomyError::InsufficientFunds);
        }
        buyer.item = Some(item.id.clone());
        Ok(())
    }

    /// Recomputes the sum server-side and returns the reward only when the
    /// claimed answer matches. Client correctness claims are never trusted,
    /// and operand pairs whose sum overflows never grade as correct.
    pub fn grade_quiz(&self, num1: i64, num2: i64, answer: i64) -> Option<i64> {
        if num1.checked_add(num2) == Some(answer) {
            Some(self.quiz_reward)
        } else {
            None
        }
    }

    /// Damage and reach of the attacker's equipped item, with fallbacks for
    /// an empty slot or an id missing from the catalog.
    pub fn weapon_stats(
        &self,
        equipped: Option<&str>,
        catalog: &HashMap<String, ItemRecord>,
    ) -> (i32, f32) {
        equipped
            .and_then(|id| catalog.get(id))
            .map(|item| (item.damage, item.range))
            .unwrap_or((self.default_damage, self.default_range))
    }

    /// Applies one attack to `target`. On a kill the target is reset to
    /// full health at `respawn`; crediting the attacker with the kill
    /// reward is the caller's job (the attacker is not borrowed here).
    pub fn resolve_attack(
        &self,
        attacker: &AttackerProfile,
        target: &mut PlayerSession,
        respawn: Vec2,
    ) -> AttackOutcome {
        if attacker.battle_mode.as_deref() == Some(BATTLE_MODE_TEAM)
            && attacker.team.is_some()
            && attacker.team == target.team
        {
            return AttackOutcome::FriendlyFire;
        }
        if attacker.position.distance_to(target.position) > attacker.range {
            return AttackOutcome::OutOfRange;
        }

        target.health -= attacker.damage;
        if target.health <= 0 {
            target.health = target.max_health;
            target.position = respawn;
            AttackOutcome::Killed
        } else {
            AttackOutcome::Hit { hp: target.health }
        }
    }
}
