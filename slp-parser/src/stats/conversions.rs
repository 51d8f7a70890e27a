use std::collections::{BTreeSet, HashMap};

use super::StatComputer;
use super::common::*;
use crate::types::{FrameEntry, Frames, PlayerPermutation};

#[derive(Debug, Default)]
struct PlayerConversionState {
    conversion: Option<ConversionType>,
    open_move: Option<usize>,
    reset_counter: u32,
    last_hit_animation: Option<u16>,
}

/// Tracks conversions: every opening a player gets on an opponent, and how much they made
/// of it before the opponent was back in control for long enough.
#[derive(Debug)]
pub struct ConversionComputer {
    reset_frames: u32,
    permutations: Vec<PlayerPermutation>,
    active: BTreeSet<u8>,
    unattributed_owners: Vec<bool>,
    state: Vec<PlayerConversionState>,
    finished: Vec<ConversionType>,
}

impl Default for ConversionComputer {
    fn default() -> Self {
        Self::new(crate::config::PUNISH_RESET_FRAMES)
    }
}

impl ConversionComputer {
    pub fn new(reset_frames: u32) -> Self {
        Self {
            reset_frames,
            permutations: Vec::new(),
            active: BTreeSet::new(),
            unattributed_owners: Vec::new(),
            state: Vec::new(),
            finished: Vec::new(),
        }
    }

    /// Every conversion so far (open ones included), ordered by start frame, with opening
    /// types filled in.
    pub fn fetch(&self) -> Vec<ConversionType> {
        let mut conversions: Vec<ConversionType> = self
            .finished
            .iter()
            .chain(self.state.iter().filter_map(|state| state.conversion.as_ref()))
            .cloned()
            .collect();

        conversions.sort_by_key(|c| (c.start_frame, c.player_index, c.opponent_index));
        populate_opening_types(&mut conversions);

        conversions
    }
}

/// Classifies how each conversion started. Conversions that start on the same frame are
/// trades. Otherwise, a conversion that starts while the opponent was still converting on
/// the player is a counter attack, and anything else is a neutral win.
fn populate_opening_types(conversions: &mut [ConversionType]) {
    let mut last_end_frame_by_player: HashMap<u8, Option<i32>> = HashMap::new();

    for group in conversions.chunk_by_mut(|a, b| a.start_frame == b.start_frame) {
        let is_trade = group.len() >= 2;

        for conversion in group.iter_mut() {
            last_end_frame_by_player.insert(conversion.player_index, conversion.end_frame);

            if is_trade {
                conversion.opening_type = OpeningType::Trade;
                continue;
            }

            let opponent_end_frame = last_end_frame_by_player.get(&conversion.opponent_index).copied().flatten();
            let is_counter_attack = opponent_end_frame.is_some_and(|end| end > conversion.start_frame);

            conversion.opening_type = match is_counter_attack {
                true => OpeningType::CounterAttack,
                false => OpeningType::NeutralWin,
            };
        }
    }
}

impl StatComputer for ConversionComputer {
    fn set_player_permutations(&mut self, permutations: &[PlayerPermutation]) {
        self.permutations = permutations.to_vec();
        self.active = active_ports(permutations);
        self.unattributed_owners = unattributed_owners(permutations);
        self.state = permutations.iter().map(|_| PlayerConversionState::default()).collect();
    }

    fn process_frame(&mut self, frame: &FrameEntry, all_frames: &Frames) {
        let permutations = self.permutations.iter().zip(&self.unattributed_owners);

        for ((indices, &owns_unattributed), state) in permutations.zip(self.state.iter_mut()) {
            let attribution = Attribution {
                active: &self.active,
                owns_unattributed,
            };

            if let Some(conversion) =
                handle_conversion_compute(all_frames, state, *indices, frame, attribution, self.reset_frames)
            {
                self.finished.push(conversion);
            }
        }
    }
}

fn handle_conversion_compute(
    frames: &Frames,
    state: &mut PlayerConversionState,
    indices: PlayerPermutation,
    frame: &FrameEntry,
    attribution: Attribution<'_>,
    reset_frames: u32,
) -> Option<ConversionType> {
    let player_frame = frame.post(indices.player_index)?;
    let prev_player_frame = prev_post(frames, frame.frame, indices.player_index);
    let opponent_frame = frame.post(indices.opponent_index)?;
    let prev_opponent_frame = prev_post(frames, frame.frame, indices.opponent_index);

    let opnt_is_damaged = is_damaged(opponent_frame.action_state_id);
    let opnt_is_grabbed = is_grabbed(opponent_frame.action_state_id);
    let opnt_damage_taken = calc_damage_taken(opponent_frame, prev_opponent_frame);
    let attributable = attribution.allows(opponent_frame.last_hit_by, indices.player_index);

    // Forget the animation of the last hit once the player moved on, or restarted it.
    let action_changed_since_hit = Some(player_frame.action_state_id) != state.last_hit_animation;
    if action_changed_since_hit || did_action_counter_reset(player_frame, prev_player_frame) {
        state.last_hit_animation = None;
    }

    if (opnt_is_damaged || opnt_is_grabbed) && attributable {
        let conversion = state.conversion.get_or_insert_with(|| ConversionType {
            player_index: indices.player_index,
            opponent_index: indices.opponent_index,
            start_frame: frame.frame,
            end_frame: None,
            start_percent: prev_percent(prev_opponent_frame),
            current_percent: opponent_frame.percent,
            end_percent: None,
            moves: Vec::new(),
            did_kill: false,
            opening_type: OpeningType::Unknown,
        });

        if opnt_damage_taken != 0.0 {
            if state.last_hit_animation.is_none() {
                conversion.moves.push(MoveLandedType {
                    frame: frame.frame,
                    move_id: player_frame.last_attack_landed,
                    hit_count: 0,
                    damage: 0.0,
                });
                state.open_move = Some(conversion.moves.len() - 1);
            }

            if let Some(open_move) = state.open_move.and_then(|index| conversion.moves.get_mut(index)) {
                open_move.hit_count += 1;
                open_move.damage += opnt_damage_taken;
            }

            // On trades, the previous frame holds the move that connected.
            state.last_hit_animation = prev_player_frame.map(|prev| prev.action_state_id);
        }
    }

    let conversion = state.conversion.as_mut()?;

    let opnt_in_control = is_in_control(opponent_frame.action_state_id);
    let opnt_did_lose_stock = did_lose_stock(opponent_frame, prev_opponent_frame);

    if !opnt_did_lose_stock {
        conversion.current_percent = opponent_frame.percent;
    }

    if opnt_is_damaged || opnt_is_grabbed {
        state.reset_counter = 0;
    }

    // The clock only starts once the opponent is actionable again, and then keeps running.
    if state.reset_counter > 0 || opnt_in_control {
        state.reset_counter += 1;
    }

    if opnt_did_lose_stock {
        conversion.did_kill = true;
    }

    if !opnt_did_lose_stock && state.reset_counter <= reset_frames {
        return None;
    }

    let mut conversion = state.conversion.take()?;
    conversion.end_frame = Some(frame.frame);
    conversion.end_percent = Some(prev_percent(prev_opponent_frame));

    state.open_move = None;
    state.reset_counter = 0;

    Some(conversion)
}
