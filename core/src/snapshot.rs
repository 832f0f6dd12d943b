use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    BulletId, Direction, EnemyKind, EntityId, MazeLayout, PixelPoint, PlayerSlot, Shooter,
    TargetType,
};

/// Enemy as seen by an AI worker.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Identifier of the enemy.
    pub id: EntityId,
    /// Variant of the enemy.
    pub kind: EnemyKind,
    /// Sub-pixel position.
    pub position: PixelPoint,
    /// Direction the enemy travels.
    pub direction: Direction,
    /// Whether the enemy is currently visible.
    pub visible: bool,
}

/// Bullet as seen by an AI worker.
#[derive(Clone, Debug, PartialEq)]
pub struct BulletSnapshot {
    /// Sub-pixel position.
    pub position: PixelPoint,
    /// Displacement per second.
    pub velocity: PixelPoint,
    /// What the bullet may hit.
    pub target: TargetType,
    /// Entity that fired the bullet.
    pub shooter: Shooter,
}

/// The other player as seen by an AI worker.
#[derive(Clone, Debug, PartialEq)]
pub struct TeammateSnapshot {
    /// Sub-pixel position.
    pub position: PixelPoint,
    /// Facing direction.
    pub direction: Direction,
    /// Whether the teammate sits in its cage.
    pub in_cage: bool,
}

/// Immutable copy of the game state pushed to one AI worker every frame.
#[derive(Clone, Debug, PartialEq)]
pub struct GameStateSnapshot {
    /// Slot the AI controls.
    pub slot: PlayerSlot,
    /// Simulated time at which the snapshot was taken.
    pub elapsed: Duration,
    /// Sub-pixel position of the controlled player.
    pub position: PixelPoint,
    /// Facing direction of the controlled player.
    pub direction: Direction,
    /// Whether the controlled player sits in its cage.
    pub in_cage: bool,
    /// Whether the controlled player currently owns a live bullet.
    pub has_bullet: bool,
    /// Whether the two players cooperate.
    pub cooperative: bool,
    /// Enemies present in the maze.
    pub enemies: Vec<EnemySnapshot>,
    /// Live bullets.
    pub bullets: Vec<BulletSnapshot>,
    /// The other player, when one takes part.
    pub teammate: Option<TeammateSnapshot>,
    /// Shared maze topology.
    pub layout: Arc<MazeLayout>,
}

/// Bullet copied into a physics snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct BulletBody {
    /// Identifier of the bullet.
    pub bullet: BulletId,
    /// Entity that fired the bullet.
    pub shooter: Shooter,
    /// Sub-pixel position after this frame's movement.
    pub position: PixelPoint,
    /// What the bullet may hit.
    pub target: TargetType,
}

/// Player copied into a physics snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerBody {
    /// Slot of the player.
    pub slot: PlayerSlot,
    /// Sub-pixel position.
    pub position: PixelPoint,
    /// Whether the player can be hit.
    pub visible: bool,
}

/// Enemy copied into a physics snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemyBody {
    /// Identifier of the enemy.
    pub enemy: EntityId,
    /// Sub-pixel position.
    pub position: PixelPoint,
    /// Whether the enemy can be hit.
    pub visible: bool,
}

/// Immutable input of one collision pass.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsSnapshot {
    /// Live bullets.
    pub bullets: Vec<BulletBody>,
    /// Players in the maze.
    pub players: Vec<PlayerBody>,
    /// Enemies in the maze.
    pub enemies: Vec<EnemyBody>,
    /// Shared maze topology.
    pub layout: Arc<MazeLayout>,
    /// Simulated time at which the snapshot was taken.
    pub timestamp: Duration,
    /// Frame counter of the producing loop.
    pub frame: u64,
}

/// Collision record produced for a single bullet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collision {
    /// The bullet struck a wall.
    BulletWall {
        /// Bullet involved.
        bullet: BulletId,
    },
    /// The bullet struck a player.
    BulletPlayer {
        /// Bullet involved.
        bullet: BulletId,
        /// Player hit.
        slot: PlayerSlot,
    },
    /// The bullet struck an enemy.
    BulletEnemy {
        /// Bullet involved.
        bullet: BulletId,
        /// Enemy hit.
        enemy: EntityId,
    },
}

impl Collision {
    /// Bullet involved in the collision.
    #[must_use]
    pub const fn bullet(&self) -> BulletId {
        match self {
            Collision::BulletWall { bullet }
            | Collision::BulletPlayer { bullet, .. }
            | Collision::BulletEnemy { bullet, .. } => *bullet,
        }
    }
}

/// Aggregated output of one collision pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicsResult {
    /// Collision records in bullet order.
    pub collisions: Vec<Collision>,
    /// Timestamp copied from the snapshot.
    pub timestamp: Duration,
    /// Frame copied from the snapshot.
    pub frame: u64,
    /// Number of bullets examined.
    pub processed_bullets: usize,
}

impl PhysicsResult {
    /// Counts the wall hits in the result.
    #[must_use]
    pub fn wall_hits(&self) -> usize {
        self.collisions
            .iter()
            .filter(|collision| matches!(collision, Collision::BulletWall { .. }))
            .count()
    }

    /// Counts the enemy hits in the result.
    #[must_use]
    pub fn enemy_hits(&self) -> usize {
        self.collisions
            .iter()
            .filter(|collision| matches!(collision, Collision::BulletEnemy { .. }))
            .count()
    }
}

/// Volume channel adjusted by [`AudioCommand::SetVolume`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeChannel {
    /// Scales every sound.
    Master,
    /// Scales sound effects.
    Effects,
    /// Scales background music.
    Music,
}

/// Fire-and-forget instruction for the audio worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AudioCommand {
    /// Plays a sound effect, loading it on first use.
    PlaySound {
        /// Name of the sound asset.
        name: String,
        /// Requested volume before channel scaling.
        volume: f32,
    },
    /// Replaces the current background music.
    PlayMusic {
        /// Name of the music asset.
        name: String,
        /// Whether the track loops.
        looped: bool,
        /// Requested volume before channel scaling.
        volume: f32,
    },
    /// Stops the current background music.
    StopMusic {
        /// Optional fade-out duration.
        fade: Option<Duration>,
    },
    /// Changes one volume channel.
    SetVolume {
        /// Channel to adjust.
        channel: VolumeChannel,
        /// New level, clamped to `0.0..=1.0`.
        level: f32,
    },
    /// Loads sounds into the cache ahead of use.
    Preload {
        /// Names of the sound assets.
        names: Vec<String>,
    },
}

impl AudioCommand {
    /// Convenience constructor for a sound effect at full volume.
    #[must_use]
    pub fn sound(name: &str) -> Self {
        AudioCommand::PlaySound {
            name: name.to_owned(),
            volume: 1.0,
        }
    }
}
