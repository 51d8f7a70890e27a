use std::collections::VecDeque;

use super::StatComputer;
use super::common::*;
use crate::types::{FrameEntry, Frames, PlayerPermutation};

/// How far back a wavedash is looked for once a special landing happens. Enough frames to
/// jump, air dodge and land.
const WAVEDASH_WINDOW: usize = 8;

const DASH_DANCE_ANIMATIONS: [u16; 3] = [state::DASH, state::TURN, state::DASH];

#[derive(Debug, Default)]
struct PlayerActionState {
    player_counts: ActionCountsType,
    animations: VecDeque<u16>,
}

/// Counts techniques recognizable from a player's own action states.
#[derive(Debug, Default)]
pub struct ActionsComputer {
    permutations: Vec<PlayerPermutation>,
    state: Vec<PlayerActionState>,
}

impl ActionsComputer {
    pub fn fetch(&self) -> Vec<ActionCountsType> {
        self.state.iter().map(|state| state.player_counts.clone()).collect()
    }
}

impl StatComputer for ActionsComputer {
    fn set_player_permutations(&mut self, permutations: &[PlayerPermutation]) {
        self.permutations = permutations.to_vec();
        self.state = permutations
            .iter()
            .map(|indices| PlayerActionState {
                player_counts: ActionCountsType {
                    player_index: indices.player_index,
                    opponent_index: indices.opponent_index,
                    ..Default::default()
                },
                animations: VecDeque::with_capacity(WAVEDASH_WINDOW),
            })
            .collect();
    }

    fn process_frame(&mut self, frame: &FrameEntry, _all_frames: &Frames) {
        for (indices, state) in self.permutations.iter().zip(self.state.iter_mut()) {
            if let Some(player_frame) = frame.post(indices.player_index) {
                handle_action_compute(state, player_frame.action_state_id);
            }
        }
    }
}

fn is_rolling(animation: u16) -> bool {
    animation == state::ROLL_BACKWARD || animation == state::ROLL_FORWARD
}

/// True when `check` holds now but did not on the previous frame.
fn did_start(check: fn(u16) -> bool, current: u16, prev: Option<u16>) -> bool {
    check(current) && !prev.is_some_and(check)
}

fn is_wavedash_initiation_animation(animation: u16) -> bool {
    animation == state::AIR_DODGE
        || (state::CONTROLLED_JUMP_START..=state::CONTROLLED_JUMP_END).contains(&animation)
}

fn handle_action_compute(state: &mut PlayerActionState, current: u16) {
    if state.animations.len() == WAVEDASH_WINDOW {
        state.animations.pop_front();
    }
    state.animations.push_back(current);

    let len = state.animations.len();
    let prev = len.checked_sub(2).and_then(|i| state.animations.get(i)).copied();
    let counts = &mut state.player_counts;

    if len >= 3 && state.animations.range(len - 3..).copied().eq(DASH_DANCE_ANIMATIONS) {
        counts.dash_dance_count += 1;
    }

    if did_start(is_rolling, current, prev) {
        counts.roll_count += 1;
    }

    if did_start(|a| a == state::SPOT_DODGE, current, prev) {
        counts.spot_dodge_count += 1;
    }

    if did_start(|a| a == state::AIR_DODGE, current, prev) {
        counts.air_dodge_count += 1;
    }

    if did_start(|a| a == state::CLIFF_CATCH, current, prev) {
        counts.ledgegrab_count += 1;
    }

    handle_action_wavedash(counts, &state.animations, current, prev);
}

fn handle_action_wavedash(counts: &mut ActionCountsType, animations: &VecDeque<u16>, current: u16, prev: Option<u16>) {
    let is_special_landing = current == state::LANDING_FALL_SPECIAL;
    let is_acceptable_previous = prev.is_some_and(is_wavedash_initiation_animation);

    if !is_special_landing || !is_acceptable_previous {
        return;
    }

    let mut recent: Vec<u16> = animations.iter().copied().collect();
    recent.sort_unstable();
    recent.dedup();

    let had_air_dodge = recent.contains(&state::AIR_DODGE);

    // Air dodge is a long animation. If it is the only thing before landing, this was a
    // really late one and not a wavedash.
    if recent.len() == 2 && had_air_dodge {
        return;
    }

    // The air dodge is part of the wavedash, not one of its own.
    if had_air_dodge {
        counts.air_dodge_count = counts.air_dodge_count.saturating_sub(1);
    }

    match recent.contains(&state::ACTION_KNEE_BEND) {
        true => counts.wavedash_count += 1,
        false => counts.waveland_count += 1,
    }
}
