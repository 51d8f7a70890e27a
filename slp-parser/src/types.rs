use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Melee supports at most four ports.
pub const MAX_PLAYERS: usize = 4;

/// The one-byte tag that prefixes every record in the raw event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    MessageSplitter,
    EventPayloads,
    GameStart,
    PreFrameUpdate,
    PostFrameUpdate,
    GameEnd,
    FrameStart,
    ItemUpdate,
    FrameBookend,
    GeckoList,
    Unknown(u8),
}

impl From<u8> for Command {
    fn from(byte: u8) -> Self {
        match byte {
            0x10 => Self::MessageSplitter,
            0x35 => Self::EventPayloads,
            0x36 => Self::GameStart,
            0x37 => Self::PreFrameUpdate,
            0x38 => Self::PostFrameUpdate,
            0x39 => Self::GameEnd,
            0x3A => Self::FrameStart,
            0x3B => Self::ItemUpdate,
            0x3C => Self::FrameBookend,
            0x3D => Self::GeckoList,
            other => Self::Unknown(other),
        }
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        match command {
            Command::MessageSplitter => 0x10,
            Command::EventPayloads => 0x35,
            Command::GameStart => 0x36,
            Command::PreFrameUpdate => 0x37,
            Command::PostFrameUpdate => 0x38,
            Command::GameEnd => 0x39,
            Command::FrameStart => 0x3A,
            Command::ItemUpdate => 0x3B,
            Command::FrameBookend => 0x3C,
            Command::GeckoList => 0x3D,
            Command::Unknown(byte) => byte,
        }
    }
}

/// A decoded record. Each variant carries the payload shape for its command.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    GameStart(GameStart),
    PreFrameUpdate(PreFrameUpdate),
    PostFrameUpdate(PostFrameUpdate),
    GameEnd(GameEnd),
}

/// Replay format version, as written by the recording client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlpVersion {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
}

impl SlpVersion {
    pub const fn new(major: u8, minor: u8, build: u8) -> Self {
        Self { major, minor, build }
    }
}

impl fmt::Display for SlpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

impl Serialize for SlpVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Port occupancy as recorded in the game start block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerKind {
    Human,
    Cpu,
    Demo,
    Empty,
    Unknown(u8),
}

impl From<u8> for PlayerKind {
    fn from(byte: u8) -> Self {
        match byte {
            0 => Self::Human,
            1 => Self::Cpu,
            2 => Self::Demo,
            3 => Self::Empty,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub player_index: u8,
    pub port: u8,
    pub character_id: u8,
    pub character_color: u8,
    pub start_stocks: u8,
    #[serde(rename = "type")]
    pub kind: PlayerKind,
    pub team_id: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStart {
    pub slp_version: SlpVersion,
    pub is_teams: bool,
    /// Only recorded from 1.5.0 on.
    pub is_pal: Option<bool>,
    pub stage_id: u16,
    pub random_seed: u32,
    pub players: Vec<PlayerInfo>,
}

/// Game settings are the game start block with empty ports removed.
pub type GameSettings = GameStart;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreFrameUpdate {
    pub frame: i32,
    pub player_index: u8,
    pub is_follower: bool,
    pub seed: u32,
    pub action_state_id: u16,
    pub position_x: f32,
    pub position_y: f32,
    pub facing_direction: f32,
    pub joystick_x: f32,
    pub joystick_y: f32,
    pub c_stick_x: f32,
    pub c_stick_y: f32,
    pub trigger: f32,
    pub buttons: u32,
    pub physical_buttons: u16,
    pub physical_l_trigger: f32,
    pub physical_r_trigger: f32,
    /// Only recorded from 1.4.0 on.
    pub percent: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFrameUpdate {
    pub frame: i32,
    pub player_index: u8,
    pub is_follower: bool,
    pub internal_character_id: u8,
    pub action_state_id: u16,
    pub position_x: f32,
    pub position_y: f32,
    pub facing_direction: f32,
    pub percent: f32,
    pub shield_size: f32,
    pub last_attack_landed: u8,
    pub current_combo_count: u8,
    pub last_hit_by: u8,
    pub stocks_remaining: u8,
    /// Frames since the current action state started. Missing on replays older than 0.2.0.
    pub action_state_counter: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEnd {
    pub game_end_method: u8,
    /// Only recorded from 2.0.0 on; -1 when nobody quit out.
    pub lras_initiator_index: Option<i8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerFrame {
    pub pre: Option<PreFrameUpdate>,
    pub post: Option<PostFrameUpdate>,
}

impl PlayerFrame {
    pub fn is_complete(&self) -> bool {
        self.pre.is_some() && self.post.is_some()
    }
}

/// Every snapshot recorded for a single frame, indexed by port.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameEntry {
    pub frame: i32,
    pub players: [Option<PlayerFrame>; MAX_PLAYERS],
}

impl FrameEntry {
    pub fn new(frame: i32) -> Self {
        Self {
            frame,
            players: Default::default(),
        }
    }

    pub fn player(&self, player_index: u8) -> Option<&PlayerFrame> {
        self.players.get(player_index as usize).and_then(Option::as_ref)
    }

    pub fn pre(&self, player_index: u8) -> Option<&PreFrameUpdate> {
        self.player(player_index).and_then(|player| player.pre.as_ref())
    }

    pub fn post(&self, player_index: u8) -> Option<&PostFrameUpdate> {
        self.player(player_index).and_then(|player| player.post.as_ref())
    }
}

/// The frame timeline, keyed (and therefore ordered) by frame index.
pub type Frames = BTreeMap<i32, FrameEntry>;

/// An ordered (player, opponent) pair of active ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPermutation {
    pub player_index: u8,
    pub opponent_index: u8,
}

/// Builds every ordered pair of distinct active ports, in port order.
pub fn player_permutations(settings: &GameSettings) -> Vec<PlayerPermutation> {
    let indices: Vec<u8> = settings.players.iter().map(|player| player.player_index).collect();

    indices
        .iter()
        .flat_map(|&player_index| {
            indices
                .iter()
                .filter(move |&&opponent_index| opponent_index != player_index)
                .map(move |&opponent_index| PlayerPermutation {
                    player_index,
                    opponent_index,
                })
        })
        .collect()
}
