//! Mission types and the capability flags derived from them.
//!
//! Every body in a sector response lists the missions the local player may
//! launch against it. The scanner folds that list into a fixed set of boolean
//! capability flags, and the store keeps a static mission catalogue.

use serde::{Deserialize, Serialize};

/// Mission types understood by the remote server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionType {
    /// Move the home base to another position
    Relocate,
    /// Attack
    Attack,
    /// Alliance combined attack
    AcsAttack,
    /// Transport resources
    Transport,
    /// Deploy a fleet
    Deploy,
    /// Hold position at an ally
    Hold,
    /// Espionage
    Espionage,
    /// Colonise an empty slot
    Colonise,
    /// Harvest a debris field
    Recycle,
    /// Destroy a moon
    Destroy,
    /// Interplanetary missile attack
    MissileAttack,
    /// Expedition into deep space
    Expedition,
    /// Lifeform discovery
    Discovery,
}

impl MissionType {
    /// Every known mission, ordered by wire id.
    pub const ALL: [Self; 13] = [
        Self::Relocate,
        Self::Attack,
        Self::AcsAttack,
        Self::Transport,
        Self::Deploy,
        Self::Hold,
        Self::Espionage,
        Self::Colonise,
        Self::Recycle,
        Self::Destroy,
        Self::MissileAttack,
        Self::Expedition,
        Self::Discovery,
    ];

    /// Resolve a wire id (`missionType`) to a mission.
    #[must_use]
    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }

    /// Numeric id used on the wire and as the store key.
    #[must_use]
    pub fn id(self) -> i64 {
        match self {
            Self::Relocate => 0,
            Self::Attack => 1,
            Self::AcsAttack => 2,
            Self::Transport => 3,
            Self::Deploy => 4,
            Self::Hold => 5,
            Self::Espionage => 6,
            Self::Colonise => 7,
            Self::Recycle => 8,
            Self::Destroy => 9,
            Self::MissileAttack => 10,
            Self::Expedition => 15,
            Self::Discovery => 18,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Relocate => "Relocate",
            Self::Attack => "Attack",
            Self::AcsAttack => "ACS Attack",
            Self::Transport => "Transport",
            Self::Deploy => "Deploy",
            Self::Hold => "Hold",
            Self::Espionage => "Espionage",
            Self::Colonise => "Colonise",
            Self::Recycle => "Recycle",
            Self::Destroy => "Destroy",
            Self::MissileAttack => "Missile Attack",
            Self::Expedition => "Expedition",
            Self::Discovery => "Discovery",
        }
    }

    /// Link fragment the game client uses for this mission.
    #[must_use]
    pub fn link(self) -> &'static str {
        match self {
            Self::Relocate => "prepareMove",
            Self::Attack => "attack",
            Self::AcsAttack => "unionAttack",
            Self::Transport => "transport",
            Self::Deploy => "deploy",
            Self::Hold => "hold",
            Self::Espionage => "espionage",
            Self::Colonise => "colonize",
            Self::Recycle => "recycle",
            Self::Destroy => "destroy",
            Self::MissileAttack => "missileAttack",
            Self::Expedition => "expedition",
            Self::Discovery => "discovery",
        }
    }
}

/// Capability flags of a body, derived from its available missions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// An attack may be launched
    pub can_attack: bool,
    /// Resources may be transported
    pub can_transport: bool,
    /// A fleet may be deployed
    pub can_deploy: bool,
    /// A fleet may hold position
    pub can_hold: bool,
    /// Espionage probes may be sent
    pub can_espionage: bool,
    /// The body may be destroyed (moons only)
    pub can_destroy: bool,
}

impl Capabilities {
    /// Fold a list of wire mission ids into capability flags.
    ///
    /// Unknown ids and missions without a flag are ignored.
    #[must_use]
    pub fn from_mission_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        let mut caps = Self::default();
        for mission in ids.into_iter().filter_map(MissionType::from_id) {
            match mission {
                MissionType::Attack => caps.can_attack = true,
                MissionType::Transport => caps.can_transport = true,
                MissionType::Deploy => caps.can_deploy = true,
                MissionType::Hold => caps.can_hold = true,
                MissionType::Espionage => caps.can_espionage = true,
                MissionType::Destroy => caps.can_destroy = true,
                _ => {}
            }
        }
        caps
    }
}
