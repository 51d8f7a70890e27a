use std::collections::BTreeSet;

use serde::Serialize;

use crate::types::{Frames, PlayerPermutation, PostFrameUpdate, PreFrameUpdate};

/// `last_hit_by` value for a player nobody has hit yet (or who last hurt themselves).
pub const SELF_DESTRUCT: u8 = 6;

/// Action state ids and ranges that the computers care about.
pub mod state {
    pub const DAMAGE_START: u16 = 0x4B;
    pub const DAMAGE_END: u16 = 0x5B;
    pub const CAPTURE_START: u16 = 0xDF;
    pub const CAPTURE_END: u16 = 0xE8;
    pub const GROUNDED_CONTROL_START: u16 = 0x0E;
    pub const GROUNDED_CONTROL_END: u16 = 0x18;
    pub const SQUAT_START: u16 = 0x27;
    pub const SQUAT_END: u16 = 0x29;
    pub const DOWN_START: u16 = 0xB7;
    pub const DOWN_END: u16 = 0xC6;
    pub const TECH_START: u16 = 0xC7;
    pub const TECH_END: u16 = 0xCC;
    pub const DYING_START: u16 = 0x00;
    pub const DYING_END: u16 = 0x0A;
    pub const CONTROLLED_JUMP_START: u16 = 0x18;
    pub const CONTROLLED_JUMP_END: u16 = 0x22;
    pub const GROUND_ATTACK_START: u16 = 0x2C;
    pub const GROUND_ATTACK_END: u16 = 0x40;

    pub const ROLL_FORWARD: u16 = 0xE9;
    pub const ROLL_BACKWARD: u16 = 0xEA;
    pub const SPOT_DODGE: u16 = 0xEB;
    pub const AIR_DODGE: u16 = 0xEC;
    pub const ACTION_WAIT: u16 = 0x0E;
    pub const ACTION_KNEE_BEND: u16 = 0x18;
    pub const DASH: u16 = 0x14;
    pub const TURN: u16 = 0x12;
    pub const LANDING_FALL_SPECIAL: u16 = 0x2B;
    pub const GRAB: u16 = 0xD4;
    pub const CLIFF_CATCH: u16 = 0xFC;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveLandedType {
    pub frame: i32,
    pub move_id: u8,
    pub hit_count: u32,
    pub damage: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboType {
    pub player_index: u8,
    pub opponent_index: u8,
    pub start_frame: i32,
    pub end_frame: Option<i32>,
    pub start_percent: f32,
    pub current_percent: f32,
    pub end_percent: Option<f32>,
    pub moves: Vec<MoveLandedType>,
    pub did_kill: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpeningType {
    Unknown,
    NeutralWin,
    CounterAttack,
    Trade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionType {
    pub player_index: u8,
    pub opponent_index: u8,
    pub start_frame: i32,
    pub end_frame: Option<i32>,
    pub start_percent: f32,
    pub current_percent: f32,
    pub end_percent: Option<f32>,
    pub moves: Vec<MoveLandedType>,
    pub did_kill: bool,
    pub opening_type: OpeningType,
}

impl ConversionType {
    /// How many different moves were used over the conversion.
    pub fn distinct_move_count(&self) -> usize {
        self.moves.iter().map(|m| m.move_id).collect::<BTreeSet<_>>().len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockType {
    pub player_index: u8,
    pub opponent_index: u8,
    pub start_frame: i32,
    pub end_frame: Option<i32>,
    pub start_percent: f32,
    pub current_percent: f32,
    pub end_percent: Option<f32>,
    pub count: u8,
    pub death_animation: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCountsType {
    pub player_index: u8,
    pub opponent_index: u8,
    pub wavedash_count: u32,
    pub waveland_count: u32,
    pub air_dodge_count: u32,
    pub dash_dance_count: u32,
    pub spot_dodge_count: u32,
    pub ledgegrab_count: u32,
    pub roll_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputCountsType {
    pub player_index: u8,
    pub opponent_index: u8,
    pub input_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioType {
    pub count: f64,
    pub total: f64,
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallType {
    pub player_index: u8,
    pub opponent_index: u8,
    pub input_count: u32,
    pub conversion_count: u32,
    pub total_damage: f32,
    pub kill_count: u32,
    pub successful_conversions: RatioType,
    pub inputs_per_minute: RatioType,
    pub openings_per_kill: RatioType,
    pub damage_per_opening: RatioType,
    pub neutral_win_ratio: RatioType,
    pub counter_hit_ratio: RatioType,
    pub beneficial_trade_ratio: RatioType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsType {
    pub last_frame: Option<i32>,
    pub playable_frame_count: i32,
    pub stocks: Vec<StockType>,
    pub conversions: Vec<ConversionType>,
    pub combos: Vec<ComboType>,
    pub action_counts: Vec<ActionCountsType>,
    pub overall: Vec<OverallType>,
    pub game_complete: bool,
}

/// Ports that take part in at least one permutation.
pub(crate) fn active_ports(permutations: &[PlayerPermutation]) -> BTreeSet<u8> {
    permutations.iter().map(|indices| indices.player_index).collect()
}

/// The post-frame snapshot of `player_index` on the frame before `frame`.
pub(crate) fn prev_post(frames: &Frames, frame: i32, player_index: u8) -> Option<&PostFrameUpdate> {
    frame.checked_sub(1).and_then(|prev| frames.get(&prev)).and_then(|entry| entry.post(player_index))
}

pub(crate) fn prev_pre(frames: &Frames, frame: i32, player_index: u8) -> Option<&PreFrameUpdate> {
    frame.checked_sub(1).and_then(|prev| frames.get(&prev)).and_then(|entry| entry.pre(player_index))
}

/// Percent on the previous frame; zero when there is no previous frame (the very first one).
pub(crate) fn prev_percent(prev_frame: Option<&PostFrameUpdate>) -> f32 {
    prev_frame.map_or(0.0, |frame| frame.percent)
}

/// For each permutation, whether it is the first one against its defender. Only that one
/// claims hits nobody in the game is credited with.
pub(crate) fn unattributed_owners(permutations: &[PlayerPermutation]) -> Vec<bool> {
    permutations
        .iter()
        .enumerate()
        .map(|(index, indices)| {
            permutations.iter().position(|other| other.opponent_index == indices.opponent_index) == Some(index)
        })
        .collect()
}

/// Which hits on its defender a single permutation may claim.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Attribution<'a> {
    pub active: &'a BTreeSet<u8>,
    pub owns_unattributed: bool,
}

impl Attribution<'_> {
    /// Whether damage the defender took this frame belongs to `attacker`. With more than two
    /// players, hits from a third port belong to that port's own permutation.
    pub(crate) fn allows(&self, last_hit_by: u8, attacker: u8) -> bool {
        last_hit_by == attacker || (self.owns_unattributed && !self.active.contains(&last_hit_by))
    }
}

pub fn is_in_control(state: u16) -> bool {
    let ground = (state::GROUNDED_CONTROL_START..=state::GROUNDED_CONTROL_END).contains(&state);
    let squat = (state::SQUAT_START..=state::SQUAT_END).contains(&state);
    let ground_attack = state > state::GROUND_ATTACK_START && state <= state::GROUND_ATTACK_END;
    let is_grab = state == state::GRAB;

    ground || squat || ground_attack || is_grab
}

pub fn is_teching(state: u16) -> bool {
    (state::TECH_START..=state::TECH_END).contains(&state)
}

pub fn is_down(state: u16) -> bool {
    (state::DOWN_START..=state::DOWN_END).contains(&state)
}

pub fn is_damaged(state: u16) -> bool {
    (state::DAMAGE_START..=state::DAMAGE_END).contains(&state)
}

pub fn is_grabbed(state: u16) -> bool {
    (state::CAPTURE_START..=state::CAPTURE_END).contains(&state)
}

pub fn is_dead(state: u16) -> bool {
    (state::DYING_START..=state::DYING_END).contains(&state)
}

pub fn calc_damage_taken(frame: &PostFrameUpdate, prev_frame: Option<&PostFrameUpdate>) -> f32 {
    frame.percent - prev_percent(prev_frame)
}

pub fn did_lose_stock(frame: &PostFrameUpdate, prev_frame: Option<&PostFrameUpdate>) -> bool {
    prev_frame.is_some_and(|prev| prev.stocks_remaining > frame.stocks_remaining)
}

/// The action state restarted (same move used again) if its frame counter went backwards.
/// Replays without counters never report a restart.
pub(crate) fn did_action_counter_reset(frame: &PostFrameUpdate, prev_frame: Option<&PostFrameUpdate>) -> bool {
    match (frame.action_state_counter, prev_frame.and_then(|prev| prev.action_state_counter)) {
        (Some(counter), Some(prev_counter)) => counter < prev_counter,
        _ => false,
    }
}
