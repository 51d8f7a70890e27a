use std::collections::BTreeSet;

use super::StatComputer;
use super::common::*;
use crate::types::{FrameEntry, Frames, PlayerPermutation};

#[derive(Debug, Default)]
struct ComboState {
    /// The combo currently in progress, with the order in which it was opened.
    combo: Option<(usize, ComboType)>,
    /// Index into `combo.moves` of the move whose hits are being counted.
    open_move: Option<usize>,
    reset_counter: u32,
    last_attacker: Option<u8>,
    last_hit_animation: Option<u16>,
}

/// Detects combos: strings of hits where the defender never gets more than a short window
/// outside of hitstun, grabs, techs or knockdowns.
#[derive(Debug)]
pub struct ComboComputer {
    reset_frames: u32,
    permutations: Vec<PlayerPermutation>,
    active: BTreeSet<u8>,
    unattributed_owners: Vec<bool>,
    state: Vec<ComboState>,
    finished: Vec<(usize, ComboType)>,
    opened: usize,
}

impl Default for ComboComputer {
    fn default() -> Self {
        Self::new(crate::config::COMBO_STRING_RESET_FRAMES)
    }
}

impl ComboComputer {
    pub fn new(reset_frames: u32) -> Self {
        Self {
            reset_frames,
            permutations: Vec::new(),
            active: BTreeSet::new(),
            unattributed_owners: Vec::new(),
            state: Vec::new(),
            finished: Vec::new(),
            opened: 0,
        }
    }

    /// Every combo seen so far, including ones that are still open, in the order they began.
    pub fn fetch(&self) -> Vec<ComboType> {
        let mut combos: Vec<&(usize, ComboType)> = self
            .finished
            .iter()
            .chain(self.state.iter().filter_map(|state| state.combo.as_ref()))
            .collect();

        combos.sort_by_key(|(order, _)| *order);
        combos.into_iter().map(|(_, combo)| combo.clone()).collect()
    }
}

impl StatComputer for ComboComputer {
    fn set_player_permutations(&mut self, permutations: &[PlayerPermutation]) {
        self.permutations = permutations.to_vec();
        self.active = active_ports(permutations);
        self.unattributed_owners = unattributed_owners(permutations);
        self.state = permutations.iter().map(|_| ComboState::default()).collect();
    }

    fn process_frame(&mut self, frame: &FrameEntry, all_frames: &Frames) {
        let permutations = self.permutations.iter().zip(&self.unattributed_owners);

        for ((indices, &owns_unattributed), state) in permutations.zip(self.state.iter_mut()) {
            let attribution = Attribution {
                active: &self.active,
                owns_unattributed,
            };

            let ended = handle_combo_compute(
                all_frames,
                state,
                *indices,
                frame,
                attribution,
                self.reset_frames,
                &mut self.opened,
            );

            if let Some(combo) = ended {
                self.finished.push(combo);
            }
        }
    }
}

/// Advances one permutation by one frame. Returns the combo if it ended on this frame.
fn handle_combo_compute(
    frames: &Frames,
    state: &mut ComboState,
    indices: PlayerPermutation,
    frame: &FrameEntry,
    attribution: Attribution<'_>,
    reset_frames: u32,
    opened: &mut usize,
) -> Option<(usize, ComboType)> {
    let defender_frame = frame.post(indices.opponent_index)?;
    let prev_defender_frame = prev_post(frames, frame.frame, indices.opponent_index);

    let opnt_is_damaged = is_damaged(defender_frame.action_state_id);
    let opnt_is_grabbed = is_grabbed(defender_frame.action_state_id);
    let opnt_damage_taken = calc_damage_taken(defender_frame, prev_defender_frame);

    let last_hit_by = defender_frame.last_hit_by;

    // Stop tracking the animation of the last hit once the attacker moved on to something
    // else, or started the same action over (e.g. jab, jab).
    if let Some(last_attacker) = state.last_attacker {
        let still_tracked = match frame.post(last_attacker) {
            Some(attacker_frame) if last_hit_by == last_attacker => {
                let prev_attacker_frame = prev_post(frames, frame.frame, last_attacker);
                let action_changed_since_hit = Some(attacker_frame.action_state_id) != state.last_hit_animation;

                !action_changed_since_hit && !did_action_counter_reset(attacker_frame, prev_attacker_frame)
            },
            _ => false,
        };

        if !still_tracked {
            state.last_attacker = None;
            state.last_hit_animation = None;
        }
    }

    let opnt_in_stun = opnt_is_damaged || opnt_is_grabbed;
    let attributable = attribution.allows(last_hit_by, indices.player_index);

    // A third player landed the first hit of a combo nobody had claimed yet: their own
    // permutation owns it.
    if opnt_in_stun && !attributable {
        let unclaimed = state
            .combo
            .as_ref()
            .is_some_and(|(_, combo)| combo.player_index == SELF_DESTRUCT && combo.moves.is_empty());

        if unclaimed {
            state.combo = None;
            state.open_move = None;
            state.reset_counter = 0;
        }
    }

    if opnt_in_stun && attributable {
        let (_, combo) = state.combo.get_or_insert_with(|| {
            let order = *opened;
            *opened += 1;

            let combo = ComboType {
                player_index: last_hit_by,
                opponent_index: indices.opponent_index,
                start_frame: frame.frame,
                end_frame: None,
                start_percent: prev_percent(prev_defender_frame),
                current_percent: defender_frame.percent,
                end_percent: None,
                moves: Vec::new(),
                did_kill: false,
            };

            (order, combo)
        });

        if opnt_damage_taken != 0.0 {
            // If the attacker is gone, the damage still counts towards the last move.
            if let Some(attacker_frame) = frame.post(last_hit_by) {
                let prev_attacker_frame = prev_post(frames, frame.frame, last_hit_by);

                // Respawned players grabbed before being hit have not been hit by anyone yet.
                if combo.player_index == SELF_DESTRUCT {
                    combo.player_index = last_hit_by;
                }

                // A cleared animation means a new move. Multi-hit moves (drill, needles, ...)
                // stay a single move.
                if state.last_hit_animation.is_none() {
                    combo.moves.push(MoveLandedType {
                        frame: attacker_frame.frame,
                        move_id: attacker_frame.last_attack_landed,
                        hit_count: 0,
                        damage: 0.0,
                    });
                    state.open_move = Some(combo.moves.len() - 1);
                }

                // On trades the attacker may have already left the animation that connected,
                // so track the previous frame's action.
                state.last_attacker = Some(attacker_frame.player_index);
                state.last_hit_animation = prev_attacker_frame.map(|prev| prev.action_state_id);
            }

            if let Some(open_move) = state.open_move.and_then(|index| combo.moves.get_mut(index)) {
                open_move.hit_count += 1;
                open_move.damage += opnt_damage_taken;
            }
        }
    }

    let (_, combo) = state.combo.as_mut()?;

    let opnt_is_teching = is_teching(defender_frame.action_state_id);
    let opnt_is_downed = is_down(defender_frame.action_state_id);
    let opnt_did_lose_stock = did_lose_stock(defender_frame, prev_defender_frame);
    let opnt_is_dying = is_dead(defender_frame.action_state_id);

    // Percent resets on death, so the live value would be wrong for the combo.
    if !opnt_did_lose_stock {
        combo.current_percent = defender_frame.percent;
    }

    if opnt_is_damaged || opnt_is_grabbed || opnt_is_teching || opnt_is_downed || opnt_is_dying {
        state.reset_counter = 0;
    } else {
        state.reset_counter += 1;
    }

    if opnt_did_lose_stock {
        combo.did_kill = true;
    }

    if !opnt_did_lose_stock && state.reset_counter <= reset_frames {
        return None;
    }

    let (order, mut combo) = state.combo.take()?;
    combo.end_frame = Some(frame.frame);
    combo.end_percent = Some(prev_percent(prev_defender_frame));

    state.open_move = None;
    state.reset_counter = 0;

    Some((order, combo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PlayerFrame, PostFrameUpdate};

    const ATTACKER: u8 = 0;
    const DEFENDER: u8 = 1;
    const FTILT: u16 = 0x33;
    const FSMASH: u16 = 0x3C;
    const DAMAGE_FLY: u16 = 0x58;

    fn post(frame: i32, player_index: u8, action_state_id: u16, percent: f32) -> PostFrameUpdate {
        PostFrameUpdate {
            frame,
            player_index,
            is_follower: false,
            internal_character_id: 0,
            action_state_id,
            position_x: 0.0,
            position_y: 0.0,
            facing_direction: 1.0,
            percent,
            shield_size: 60.0,
            last_attack_landed: 0,
            current_combo_count: 0,
            last_hit_by: SELF_DESTRUCT,
            stocks_remaining: 4,
            action_state_counter: Some(0.0),
        }
    }

    /// Builds frames from (attacker, defender) post snapshots and feeds them to a computer.
    struct Timeline {
        frames: Frames,
        computer: ComboComputer,
    }

    impl Timeline {
        fn new() -> Self {
            let mut computer = ComboComputer::default();
            computer.set_player_permutations(&[
                PlayerPermutation { player_index: ATTACKER, opponent_index: DEFENDER },
                PlayerPermutation { player_index: DEFENDER, opponent_index: ATTACKER },
            ]);

            Self { frames: Frames::new(), computer }
        }

        fn push(&mut self, attacker: PostFrameUpdate, defender: PostFrameUpdate) {
            let index = attacker.frame;
            let mut entry = FrameEntry::new(index);
            entry.players[ATTACKER as usize] = Some(PlayerFrame { pre: None, post: Some(attacker) });
            entry.players[DEFENDER as usize] = Some(PlayerFrame { pre: None, post: Some(defender) });

            self.frames.insert(index, entry);
            self.computer.process_frame(&self.frames[&index], &self.frames);
        }

        fn idle(&mut self, frame: i32, percent: f32) {
            self.push(post(frame, ATTACKER, 0x0E, 0.0), post(frame, DEFENDER, 0x0E, percent));
        }

        fn hit(&mut self, frame: i32, counter: f32, percent: f32) {
            let mut attacker = post(frame, ATTACKER, FTILT, 0.0);
            attacker.last_attack_landed = 0x0F;
            attacker.action_state_counter = Some(counter);

            let mut defender = post(frame, DEFENDER, DAMAGE_FLY, percent);
            defender.last_hit_by = ATTACKER;

            self.push(attacker, defender);
        }
    }

    #[test]
    fn test_multi_hit_move_counts_once() {
        let mut timeline = Timeline::new();
        timeline.idle(0, 0.0);

        let mut attacker = post(1, ATTACKER, FTILT, 0.0);
        attacker.action_state_counter = Some(0.0);
        timeline.push(attacker, post(1, DEFENDER, 0x0E, 0.0));

        for (i, frame) in (2..7).enumerate() {
            timeline.hit(frame, (i + 1) as f32, 5.0 * (i + 1) as f32);
        }

        let combos = timeline.computer.fetch();
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].moves.len(), 1);
        assert_eq!(combos[0].moves[0].hit_count, 5);
        assert_eq!(combos[0].moves[0].damage, 25.0);
        assert_eq!(combos[0].end_frame, None);
    }

    #[test]
    fn test_restarted_animation_is_a_new_move() {
        let mut timeline = Timeline::new();
        let mut windup = post(0, ATTACKER, FTILT, 0.0);
        windup.action_state_counter = Some(3.0);
        timeline.push(windup, post(0, DEFENDER, 0x0E, 0.0));

        timeline.hit(1, 4.0, 3.0);
        timeline.hit(2, 5.0, 6.0);
        // The counter went backwards: the same move was used again.
        timeline.hit(3, 1.0, 9.0);
        timeline.hit(4, 2.0, 12.0);

        let combos = timeline.computer.fetch();
        assert_eq!(combos.len(), 1);

        let hits: Vec<u32> = combos[0].moves.iter().map(|m| m.hit_count).collect();
        assert_eq!(hits, vec![2, 2]);
    }

    #[test]
    fn test_new_action_after_hit_is_a_new_move() {
        let mut timeline = Timeline::new();
        let mut windup = post(0, ATTACKER, FTILT, 0.0);
        windup.action_state_counter = Some(0.0);
        timeline.push(windup, post(0, DEFENDER, 0x0E, 0.0));

        timeline.hit(1, 1.0, 3.0);

        // Straight into a different attack while the defender is still in hitstun.
        let mut attacker = post(2, ATTACKER, FSMASH, 0.0);
        attacker.last_attack_landed = 0x0A;
        attacker.action_state_counter = Some(1.0);
        let mut defender = post(2, DEFENDER, DAMAGE_FLY, 8.0);
        defender.last_hit_by = ATTACKER;
        timeline.push(attacker, defender);

        let combos = timeline.computer.fetch();
        assert_eq!(combos.len(), 1);

        let moves: Vec<(u8, u32, f32)> = combos[0].moves.iter().map(|m| (m.move_id, m.hit_count, m.damage)).collect();
        assert_eq!(moves, vec![(0x0F, 1, 3.0), (0x0A, 1, 5.0)]);
    }

    #[test]
    fn test_combo_ends_after_reset_window() {
        let mut timeline = Timeline::new();
        timeline.idle(0, 0.0);
        timeline.hit(1, 1.0, 10.0);

        for frame in 2..=47 {
            timeline.idle(frame, 10.0);
        }

        let combos = timeline.computer.fetch();
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].end_frame, Some(47));
        assert_eq!(combos[0].end_percent, Some(10.0));
        assert!(!combos[0].did_kill);
    }

    #[test]
    fn test_stock_loss_ends_combo_with_kill() {
        let mut timeline = Timeline::new();
        timeline.idle(0, 50.0);
        timeline.hit(1, 1.0, 80.0);

        let mut dead = post(2, DEFENDER, 0x03, 0.0);
        dead.stocks_remaining = 3;
        timeline.push(post(2, ATTACKER, 0x0E, 0.0), dead);

        let combos = timeline.computer.fetch();
        assert_eq!(combos.len(), 1);
        assert!(combos[0].did_kill);
        assert_eq!(combos[0].end_frame, Some(2));
        assert_eq!(combos[0].end_percent, Some(80.0));
        assert_eq!(combos[0].current_percent, 80.0);
    }

    #[test]
    fn test_third_player_hits_belong_to_their_permutation() {
        let mut computer = ComboComputer::default();
        computer.set_player_permutations(&[
            PlayerPermutation { player_index: 0, opponent_index: 1 },
            PlayerPermutation { player_index: 2, opponent_index: 1 },
        ]);

        let mut frames = Frames::new();
        for (frame, percent) in [(0, 0.0), (1, 7.0)] {
            let mut entry = FrameEntry::new(frame);
            let mut defender = post(frame, 1, if frame == 0 { 0x0E } else { DAMAGE_FLY }, percent);
            defender.last_hit_by = if frame == 0 { SELF_DESTRUCT } else { 2 };

            entry.players[0] = Some(PlayerFrame { pre: None, post: Some(post(frame, 0, 0x0E, 0.0)) });
            entry.players[1] = Some(PlayerFrame { pre: None, post: Some(defender) });
            entry.players[2] = Some(PlayerFrame { pre: None, post: Some(post(frame, 2, FTILT, 0.0)) });

            frames.insert(frame, entry);
            computer.process_frame(&frames[&frame], &frames);
        }

        let combos = computer.fetch();
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].player_index, 2);
        assert_eq!(combos[0].opponent_index, 1);
    }

    #[test]
    fn test_grab_after_respawn_corrects_attacker() {
        let mut timeline = Timeline::new();
        timeline.idle(0, 0.0);

        // Grabbed while nobody has hit the defender yet.
        let grabbed = post(1, DEFENDER, 0xDF, 0.0);
        timeline.push(post(1, ATTACKER, 0xD4, 0.0), grabbed);
        assert_eq!(timeline.computer.fetch()[0].player_index, SELF_DESTRUCT);

        // Pummel.
        let mut attacker = post(2, ATTACKER, 0xD9, 0.0);
        attacker.last_attack_landed = 0x34;
        let mut pummeled = post(2, DEFENDER, 0xE0, 3.0);
        pummeled.last_hit_by = ATTACKER;
        timeline.push(attacker, pummeled);

        let combos = timeline.computer.fetch();
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].player_index, ATTACKER);
        assert_eq!(combos[0].moves.len(), 1);
        assert_eq!(combos[0].moves[0].move_id, 0x34);
    }
}
