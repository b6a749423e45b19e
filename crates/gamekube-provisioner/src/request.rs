//! Server creation requests and their validation
//!
//! The transport hands over an untyped attribute map; [`ServerCreationRequest::from_attributes`]
//! is the only way to get a typed request out of it.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ProvisionError;

/// Raw key/value attributes as received from the transport
pub type RawAttributes = HashMap<String, String>;

/// Attribute names accepted by the validator
pub mod fields {
    /// Server display name
    pub const NAME: &str = "name";
    /// Size tier
    pub const SERVER_TYPE: &str = "serverType";
    /// Size tier, legacy plural spelling
    pub const SERVER_TYPES: &str = "serverTypes";
    /// Game code
    pub const GAME: &str = "game";
    /// Free-form description
    pub const DESCRIPTION: &str = "description";
}

/// Supported games
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Game {
    /// Project Zomboid
    #[serde(rename = "PZ")]
    Pz,
    /// ARK: Survival Evolved
    #[serde(rename = "ARK")]
    Ark,
}

impl Game {
    /// Every supported game
    pub const ALL: [Game; 2] = [Game::Pz, Game::Ark];

    /// Canonical code, e.g. "PZ"
    pub fn as_str(&self) -> &'static str {
        match self {
            Game::Pz => "PZ",
            Game::Ark => "ARK",
        }
    }

    /// Name under which the game's template is registered
    pub fn template_name(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Game {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Game::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| {
                ProvisionError::validation(
                    fields::GAME,
                    format!("unsupported game '{}' (expected one of: {})", s, join(&Game::ALL)),
                )
            })
    }
}

/// Server size tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ServerType {
    /// Small
    #[serde(rename = "PZ_SM")]
    PzSm,
    /// Medium
    #[serde(rename = "PZ_MD")]
    PzMd,
    /// Large
    #[serde(rename = "PZ_LG")]
    PzLg,
}

impl ServerType {
    /// Every supported tier
    pub const ALL: [ServerType; 3] = [ServerType::PzSm, ServerType::PzMd, ServerType::PzLg];

    /// Canonical spelling, bound into templates as `Size`
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerType::PzSm => "PZ_SM",
            ServerType::PzMd => "PZ_MD",
            ServerType::PzLg => "PZ_LG",
        }
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerType {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServerType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                ProvisionError::validation(
                    fields::SERVER_TYPE,
                    format!(
                        "unsupported serverType '{}' (expected one of: {})",
                        s,
                        join(&ServerType::ALL)
                    ),
                )
            })
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A validated request to create one game server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCreationRequest {
    /// Display name, never empty
    pub name: String,
    /// Size tier
    pub server_type: ServerType,
    /// Game to run
    pub game: Game,
    /// Optional description, never an empty string
    pub description: Option<String>,
}

impl ServerCreationRequest {
    /// Validate raw attributes into a typed request
    ///
    /// Values are trimmed and blank values count as missing. Fields are
    /// checked in the order name, serverType, game; the first failure wins.
    pub fn from_attributes(raw: &RawAttributes) -> Result<Self, ProvisionError> {
        let name = required(raw, fields::NAME, &[])?;
        let server_type = required(raw, fields::SERVER_TYPE, &[fields::SERVER_TYPES])?.parse()?;
        let game = required(raw, fields::GAME, &[])?.parse()?;
        let description = lookup(raw, fields::DESCRIPTION, &[]).map(str::to_string);

        Ok(Self {
            name: name.to_string(),
            server_type,
            game,
            description,
        })
    }
}

fn lookup<'a>(raw: &'a RawAttributes, field: &str, aliases: &[&str]) -> Option<&'a str> {
    std::iter::once(field)
        .chain(aliases.iter().copied())
        .filter_map(|key| raw.get(key))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
}

fn required<'a>(
    raw: &'a RawAttributes,
    field: &'static str,
    aliases: &[&str],
) -> Result<&'a str, ProvisionError> {
    lookup(raw, field, aliases)
        .ok_or_else(|| ProvisionError::validation(field, format!("{} is required", field)))
}
