//! Sector response parser.
//!
//! The sector endpoint returns `{"system": {"galaxyContent": [row, ...]}}`.
//! Each row describes one slot: a `position` (1-16, 16 being deep space),
//! an optional `player` and `planets`, which is a single object or a list.
//! Bodies are told apart by `planetType`:
//!
//! | `planetType` | body        |
//! |--------------|-------------|
//! | 1            | planet      |
//! | 2            | debris field|
//! | 3            | moon        |
//!
//! The server is loose about numbers (`12`, `"12"`, `"1.234"` and `false`
//! all occur), so numeric fields go through lenient decoders. Anything that
//! cannot be decoded lands in [`ParsedSector::unknown`] instead of failing
//! the whole sector.

use crate::error::MalformedResponse;
use orbit_core::{Capabilities, NO_PLAYER_ID};
use orbit_db::debris::DebrisRecord;
use orbit_db::images::ImageRecord;
use orbit_db::moons::MoonRecord;
use orbit_db::planets::PlanetRecord;
use orbit_db::players::PlayerRecord;
use orbit_db::{PlacedMoon, SectorWrite};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Slot number of the deep-space slot, which holds at most one body.
pub const DEEP_SPACE_POSITION: i64 = 16;

const PLANET_TYPE_PLANET: i64 = 1;
const PLANET_TYPE_DEBRIS: i64 = 2;
const PLANET_TYPE_MOON: i64 = 3;

/// One decoded piece of a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEntry {
    /// Owner of the slot
    Player(PlayerRecord),
    /// Planet body
    Planet(PlanetRecord),
    /// Moon body with its slot
    Moon(PlacedMoon),
    /// Debris field
    DebrisField(DebrisRecord),
    /// Slot present in the response with nothing in it
    Empty(i64),
}

/// Something in the response that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEntry {
    /// Slot, when it could be read
    pub position: Option<i64>,
    /// Why it was set aside
    pub reason: String,
}

/// Everything decoded from one sector response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSector {
    /// Decoded entries in response order
    pub entries: Vec<SlotEntry>,
    /// Image references seen on planets and moons
    pub images: Vec<ImageRecord>,
    /// Rows and bodies that were skipped
    pub unknown: Vec<UnknownEntry>,
}

impl ParsedSector {
    /// Number of planets.
    #[must_use]
    pub fn planet_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, SlotEntry::Planet(_)))
            .count()
    }

    /// Number of moons.
    #[must_use]
    pub fn moon_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, SlotEntry::Moon(_)))
            .count()
    }

    /// Debris fields in the sector.
    pub fn debris(&self) -> impl Iterator<Item = &DebrisRecord> {
        self.entries.iter().filter_map(|e| match e {
            SlotEntry::DebrisField(d) => Some(d),
            _ => None,
        })
    }

    /// Rows for the store, one vector per table.
    #[must_use]
    pub fn to_write(&self) -> SectorWrite {
        let mut write = SectorWrite {
            images: self.images.clone(),
            ..SectorWrite::default()
        };
        for entry in &self.entries {
            match entry {
                SlotEntry::Player(p) => write.players.push(p.clone()),
                SlotEntry::Planet(p) => write.planets.push(p.clone()),
                SlotEntry::Moon(m) => write.moons.push(m.clone()),
                SlotEntry::DebrisField(d) => write.debris.push(d.clone()),
                SlotEntry::Empty(_) => {}
            }
        }
        write
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    system: SystemBlock,
}

#[derive(Debug, Deserialize)]
struct SystemBlock {
    #[serde(rename = "galaxyContent")]
    galaxy_content: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default, deserialize_with = "lenient_i64")]
    position: Option<i64>,
    #[serde(default)]
    player: Option<Value>,
    #[serde(default)]
    planets: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlayer {
    #[serde(default, deserialize_with = "lenient_i64")]
    player_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    player_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    alliance_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    alliance_tag: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    highscore_position_player: Option<i64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    is_active: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    is_inactive: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    is_on_vacation: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    is_banned: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActivity {
    #[serde(default, deserialize_with = "lenient_i64")]
    show_activity: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMission {
    #[serde(default, deserialize_with = "lenient_i64")]
    mission_type: Option<i64>,
}

/// Fields shared by planets and moons.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOwnedBody {
    #[serde(default, deserialize_with = "lenient_i64")]
    planet_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    planet_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    player_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    image_information: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    image_src: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    is_destroyed: bool,
    #[serde(default, deserialize_with = "lenient_activity")]
    activity: RawActivity,
    #[serde(default, deserialize_with = "lenient_missions")]
    available_missions: Vec<RawMission>,
    #[serde(default, deserialize_with = "lenient_i64")]
    size: Option<i64>,
}

impl RawOwnedBody {
    fn capabilities(&self) -> Capabilities {
        Capabilities::from_mission_ids(self.available_missions.iter().filter_map(|m| m.mission_type))
    }

    fn image(&self) -> Option<ImageRecord> {
        match (&self.image_information, &self.image_src) {
            (Some(name), Some(src)) if !name.is_empty() && !src.is_empty() => Some(ImageRecord {
                image_name: name.clone(),
                image_src: src.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawAmount {
    #[serde(default, deserialize_with = "lenient_i64")]
    amount: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawResources {
    #[serde(default)]
    metal: RawAmount,
    #[serde(default)]
    crystal: RawAmount,
    #[serde(default)]
    deuterium: RawAmount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDebris {
    #[serde(default)]
    resources: Option<RawResources>,
    #[serde(default, deserialize_with = "lenient_i64")]
    required_ships: Option<i64>,
}

/// Parse one sector response body.
///
/// # Errors
/// Returns [`MalformedResponse`] when the body is not JSON or lacks
/// `system.galaxyContent`. Problems inside individual slots never fail the
/// parse; they are collected in [`ParsedSector::unknown`].
pub fn parse(raw: &str) -> Result<ParsedSector, MalformedResponse> {
    let text = raw.trim_start();
    if !text.starts_with('{') {
        let preview: String = text.chars().take(40).collect();
        return Err(MalformedResponse::new(format!(
            "expected a JSON object, got {preview:?}"
        )));
    }

    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| MalformedResponse::new(format!("unexpected sector shape: {e}")))?;

    let mut sector = ParsedSector::default();
    for row in envelope.system.galaxy_content {
        parse_row(row, &mut sector);
    }

    for unknown in &sector.unknown {
        tracing::debug!(
            "Skipped slot entry at position {:?}: {}",
            unknown.position,
            unknown.reason
        );
    }

    Ok(sector)
}

fn parse_row(row: Value, sector: &mut ParsedSector) {
    let row: RawRow = match serde_json::from_value(row) {
        Ok(row) => row,
        Err(e) => {
            sector.unknown.push(UnknownEntry {
                position: None,
                reason: format!("undecodable row: {e}"),
            });
            return;
        }
    };

    let position = match row.position {
        Some(p) if (1..=DEEP_SPACE_POSITION).contains(&p) => p,
        other => {
            sector.unknown.push(UnknownEntry {
                position: other,
                reason: "row without a valid position".to_string(),
            });
            return;
        }
    };

    let entries_before = sector.entries.len();

    if let Some(player) = row
        .player
        .filter(|p| !matches!(p, Value::Null | Value::Bool(false)))
    {
        parse_player(player, position, sector);
    }

    let bodies = match row.planets {
        Some(Value::Array(list)) => list,
        Some(Value::Object(map)) => vec![Value::Object(map)],
        Some(Value::Null | Value::Bool(false)) | None => Vec::new(),
        Some(other) => {
            sector.unknown.push(UnknownEntry {
                position: Some(position),
                reason: format!("planets is neither object nor list: {other}"),
            });
            Vec::new()
        }
    };

    let mut bodies_in_slot = 0usize;
    for body in bodies {
        if position == DEEP_SPACE_POSITION && bodies_in_slot == 1 {
            sector.unknown.push(UnknownEntry {
                position: Some(position),
                reason: "more than one body in deep space".to_string(),
            });
            continue;
        }
        if parse_body(body, position, sector) {
            bodies_in_slot += 1;
        }
    }

    if sector.entries.len() == entries_before {
        sector.entries.push(SlotEntry::Empty(position));
    }
}

fn parse_player(value: Value, position: i64, sector: &mut ParsedSector) {
    let raw: RawPlayer = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            sector.unknown.push(UnknownEntry {
                position: Some(position),
                reason: format!("undecodable player: {e}"),
            });
            return;
        }
    };

    let Some(player_id) = raw.player_id else {
        sector.unknown.push(UnknownEntry {
            position: Some(position),
            reason: "player without playerId".to_string(),
        });
        return;
    };
    if player_id == NO_PLAYER_ID {
        return;
    }

    sector.entries.push(SlotEntry::Player(PlayerRecord {
        player_id,
        name: raw.player_name,
        alliance_id: raw.alliance_id,
        alliance_tag: raw.alliance_tag,
        rank_position: raw.highscore_position_player,
        is_active: raw.is_active,
        is_inactive: raw.is_inactive,
        is_vacation: raw.is_on_vacation,
        is_banned: raw.is_banned,
    }));
}

/// Decode one body; returns `true` if it produced an entry.
fn parse_body(value: Value, position: i64, sector: &mut ParsedSector) -> bool {
    let planet_type = value.get("planetType").and_then(value_to_i64);
    match planet_type {
        Some(PLANET_TYPE_PLANET) => parse_planet(value, position, sector),
        Some(PLANET_TYPE_MOON) => parse_moon(value, position, sector),
        Some(PLANET_TYPE_DEBRIS) => parse_debris(value, position, sector),
        Some(other) => {
            sector.unknown.push(UnknownEntry {
                position: Some(position),
                reason: format!("unknown planetType {other}"),
            });
            false
        }
        None => {
            sector.unknown.push(UnknownEntry {
                position: Some(position),
                reason: "body without planetType".to_string(),
            });
            false
        }
    }
}

fn decode_owned(
    value: Value,
    kind: &str,
    position: i64,
    sector: &mut ParsedSector,
) -> Option<(i64, RawOwnedBody)> {
    let raw: RawOwnedBody = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            sector.unknown.push(UnknownEntry {
                position: Some(position),
                reason: format!("undecodable {kind}: {e}"),
            });
            return None;
        }
    };

    let Some(id) = raw.planet_id else {
        sector.unknown.push(UnknownEntry {
            position: Some(position),
            reason: format!("{kind} without planetId"),
        });
        return None;
    };

    if raw.player_id == Some(NO_PLAYER_ID) {
        tracing::trace!("Skipping {} {} owned by the sentinel player", kind, id);
        return None;
    }

    if let Some(image) = raw.image() {
        if !sector.images.iter().any(|i| i.image_name == image.image_name) {
            sector.images.push(image);
        }
    }

    Some((id, raw))
}

fn parse_planet(value: Value, position: i64, sector: &mut ParsedSector) -> bool {
    let Some((planet_id, raw)) = decode_owned(value, "planet", position, sector) else {
        return false;
    };

    let capabilities = raw.capabilities();
    sector.entries.push(SlotEntry::Planet(PlanetRecord {
        planet_id,
        name: raw.planet_name,
        player_id: raw.player_id,
        image: raw.image_information,
        is_destroyed: raw.is_destroyed,
        activity: raw.activity.show_activity,
        position,
        capabilities,
    }));
    true
}

fn parse_moon(value: Value, position: i64, sector: &mut ParsedSector) -> bool {
    let Some((moon_id, raw)) = decode_owned(value, "moon", position, sector) else {
        return false;
    };

    let capabilities = raw.capabilities();
    sector.entries.push(SlotEntry::Moon(PlacedMoon {
        position,
        moon: MoonRecord {
            moon_id,
            name: raw.planet_name,
            size: raw.size,
            image: raw.image_information,
            is_destroyed: raw.is_destroyed,
            activity: raw.activity.show_activity,
            capabilities,
        },
    }));
    true
}

fn parse_debris(value: Value, position: i64, sector: &mut ParsedSector) -> bool {
    let raw: RawDebris = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            sector.unknown.push(UnknownEntry {
                position: Some(position),
                reason: format!("undecodable debris field: {e}"),
            });
            return false;
        }
    };

    let resources = raw.resources.unwrap_or_default();
    let field = DebrisRecord {
        position,
        metal: resources.metal.amount.unwrap_or(0),
        crystal: resources.crystal.amount.unwrap_or(0),
        deuterium: resources.deuterium.amount.unwrap_or(0),
        required_ships: raw.required_ships,
    };

    if field.metal < 0 || field.crystal < 0 || field.deuterium < 0 {
        sector.unknown.push(UnknownEntry {
            position: Some(position),
            reason: "debris field with negative amount".to_string(),
        });
        return false;
    }

    sector.entries.push(SlotEntry::DebrisField(field));
    true
}

#[allow(clippy::cast_possible_truncation)]
fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                let digits: String = s.chars().filter(|c| !matches!(c, '.' | ',' | ' ')).collect();
                if digits.is_empty() {
                    None
                } else {
                    digits.parse::<i64>().ok()
                }
            })
        }
        _ => None,
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_i64(&value))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim(), "1" | "true" | "yes"),
        _ => false,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_activity<'de, D>(deserializer: D) -> Result<RawActivity, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
        _ => RawActivity::default(),
    })
}

fn lenient_missions<'de, D>(deserializer: D) -> Result<Vec<RawMission>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}
