use super::StatComputer;
use super::common::*;
use crate::parser::FIRST_PLAYABLE_FRAME;
use crate::types::{FrameEntry, Frames, PlayerPermutation, PreFrameUpdate};

/// Stick deflection needed to leave the deadzone on either axis.
const JOYSTICK_THRESHOLD: f32 = 0.2875;

/// Analog trigger depression that counts as a press.
const TRIGGER_THRESHOLD: f32 = 0.3;

/// The physical buttons: D-pad, Z, R, L, A, B, X, Y and Start.
const BUTTON_MASK: u16 = 0xFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoystickRegion {
    Deadzone,
    NorthEast,
    SouthEast,
    SouthWest,
    NorthWest,
    North,
    East,
    South,
    West,
}

impl JoystickRegion {
    fn of(x: f32, y: f32) -> Self {
        let t = JOYSTICK_THRESHOLD;

        match (x, y) {
            (x, y) if x >= t && y >= t => Self::NorthEast,
            (x, y) if x >= t && y <= -t => Self::SouthEast,
            (x, y) if x <= -t && y <= -t => Self::SouthWest,
            (x, y) if x <= -t && y >= t => Self::NorthWest,
            (_, y) if y >= t => Self::North,
            (x, _) if x >= t => Self::East,
            (_, y) if y <= -t => Self::South,
            (x, _) if x <= -t => Self::West,
            _ => Self::Deadzone,
        }
    }
}

/// Counts controller inputs: button presses, stick movements into a new region, and
/// trigger presses. Holding anything only counts once.
#[derive(Debug, Default)]
pub struct InputComputer {
    permutations: Vec<PlayerPermutation>,
    state: Vec<InputCountsType>,
}

impl InputComputer {
    pub fn fetch(&self) -> Vec<InputCountsType> {
        self.state.clone()
    }
}

impl StatComputer for InputComputer {
    fn set_player_permutations(&mut self, permutations: &[PlayerPermutation]) {
        self.permutations = permutations.to_vec();
        self.state = permutations
            .iter()
            .map(|indices| InputCountsType {
                player_index: indices.player_index,
                opponent_index: indices.opponent_index,
                input_count: 0,
            })
            .collect();
    }

    fn process_frame(&mut self, frame: &FrameEntry, all_frames: &Frames) {
        // Inputs during the countdown don't do anything.
        if frame.frame < FIRST_PLAYABLE_FRAME {
            return;
        }

        for (indices, state) in self.permutations.iter().zip(self.state.iter_mut()) {
            let Some(player_frame) = frame.pre(indices.player_index) else {
                continue;
            };
            let prev_player_frame = prev_pre(all_frames, frame.frame, indices.player_index);

            state.input_count += count_inputs(player_frame, prev_player_frame);
        }
    }
}

fn count_inputs(frame: &PreFrameUpdate, prev_frame: Option<&PreFrameUpdate>) -> u32 {
    // Without a previous frame every held button is a new press.
    let prev_buttons = prev_frame.map_or(0, |prev| prev.physical_buttons);
    let pressed = !prev_buttons & frame.physical_buttons & BUTTON_MASK;
    let mut count = pressed.count_ones();

    let prev_joystick = prev_frame.map_or(JoystickRegion::Deadzone, |prev| JoystickRegion::of(prev.joystick_x, prev.joystick_y));
    let joystick = JoystickRegion::of(frame.joystick_x, frame.joystick_y);
    if joystick != prev_joystick && joystick != JoystickRegion::Deadzone {
        count += 1;
    }

    let prev_c_stick = prev_frame.map_or(JoystickRegion::Deadzone, |prev| JoystickRegion::of(prev.c_stick_x, prev.c_stick_y));
    let c_stick = JoystickRegion::of(frame.c_stick_x, frame.c_stick_y);
    if c_stick != prev_c_stick && c_stick != JoystickRegion::Deadzone {
        count += 1;
    }

    // TODO: count hard shield to light shield transitions, which are inputs too.
    if let Some(prev) = prev_frame {
        if prev.physical_l_trigger < TRIGGER_THRESHOLD && frame.physical_l_trigger >= TRIGGER_THRESHOLD {
            count += 1;
        }

        if prev.physical_r_trigger < TRIGGER_THRESHOLD && frame.physical_r_trigger >= TRIGGER_THRESHOLD {
            count += 1;
        }
    }

    count
}
