//! Field extraction for the records we know how to decode. Offsets are relative to the
//! command byte, and every multi-byte value is big-endian.
//!
//! Fields that were appended in later replay versions are read as `Option`s; a record
//! that is too short to carry its essential fields decodes to `None`.

use crate::types::{Command, Event, GameEnd, GameStart, PlayerInfo, PostFrameUpdate, PreFrameUpdate, SlpVersion};
use crate::types::{MAX_PLAYERS, PlayerKind};

/// Decodes a full record (command byte included) into an `Event`.
pub(crate) fn parse_event(command: Command, record: &[u8]) -> Option<Event> {
    match command {
        Command::GameStart => parse_game_start(record).map(Event::GameStart),
        Command::PreFrameUpdate => parse_pre_frame_update(record).map(Event::PreFrameUpdate),
        Command::PostFrameUpdate => parse_post_frame_update(record).map(Event::PostFrameUpdate),
        Command::GameEnd => parse_game_end(record).map(Event::GameEnd),
        _ => None,
    }
}

fn parse_game_start(record: &[u8]) -> Option<GameStart> {
    let slp_version = SlpVersion::new(read_u8(record, 0x1)?, read_u8(record, 0x2)?, read_u8(record, 0x3)?);

    let mut players = Vec::with_capacity(MAX_PLAYERS);
    for player_index in 0..MAX_PLAYERS as u8 {
        let offset = player_index as usize * 0x24;

        players.push(PlayerInfo {
            player_index,
            port: player_index + 1,
            character_id: read_u8(record, 0x65 + offset)?,
            kind: PlayerKind::from(read_u8(record, 0x66 + offset)?),
            start_stocks: read_u8(record, 0x67 + offset)?,
            character_color: read_u8(record, 0x68 + offset)?,
            team_id: read_u8(record, 0x6E + offset)?,
        });
    }

    Some(GameStart {
        slp_version,
        is_teams: read_bool(record, 0xD)?,
        is_pal: read_bool(record, 0x1A1),
        stage_id: read_u16(record, 0x13)?,
        random_seed: read_u32(record, 0x13D).unwrap_or_default(),
        players,
    })
}

fn parse_pre_frame_update(record: &[u8]) -> Option<PreFrameUpdate> {
    Some(PreFrameUpdate {
        frame: read_i32(record, 0x1)?,
        player_index: read_u8(record, 0x5)?,
        is_follower: read_bool(record, 0x6)?,
        seed: read_u32(record, 0x7)?,
        action_state_id: read_u16(record, 0xB)?,
        position_x: read_f32(record, 0xD)?,
        position_y: read_f32(record, 0x11)?,
        facing_direction: read_f32(record, 0x15)?,
        joystick_x: read_f32(record, 0x19)?,
        joystick_y: read_f32(record, 0x1D)?,
        c_stick_x: read_f32(record, 0x21)?,
        c_stick_y: read_f32(record, 0x25)?,
        trigger: read_f32(record, 0x29)?,
        buttons: read_u32(record, 0x2D)?,
        physical_buttons: read_u16(record, 0x31)?,
        physical_l_trigger: read_f32(record, 0x33)?,
        physical_r_trigger: read_f32(record, 0x37)?,
        percent: read_f32(record, 0x3C),
    })
}

fn parse_post_frame_update(record: &[u8]) -> Option<PostFrameUpdate> {
    Some(PostFrameUpdate {
        frame: read_i32(record, 0x1)?,
        player_index: read_u8(record, 0x5)?,
        is_follower: read_bool(record, 0x6)?,
        internal_character_id: read_u8(record, 0x7)?,
        action_state_id: read_u16(record, 0x8)?,
        position_x: read_f32(record, 0xA)?,
        position_y: read_f32(record, 0xE)?,
        facing_direction: read_f32(record, 0x12)?,
        percent: read_f32(record, 0x16)?,
        shield_size: read_f32(record, 0x1A)?,
        last_attack_landed: read_u8(record, 0x1E)?,
        current_combo_count: read_u8(record, 0x1F)?,
        last_hit_by: read_u8(record, 0x20)?,
        stocks_remaining: read_u8(record, 0x21)?,
        action_state_counter: read_f32(record, 0x22),
    })
}

fn parse_game_end(record: &[u8]) -> Option<GameEnd> {
    Some(GameEnd {
        game_end_method: read_u8(record, 0x1)?,
        lras_initiator_index: read_u8(record, 0x2).map(|byte| byte as i8),
    })
}

fn read_bytes<const N: usize>(record: &[u8], offset: usize) -> Option<[u8; N]> {
    record.get(offset..offset + N)?.try_into().ok()
}

fn read_u8(record: &[u8], offset: usize) -> Option<u8> {
    record.get(offset).copied()
}

fn read_bool(record: &[u8], offset: usize) -> Option<bool> {
    read_u8(record, offset).map(|byte| byte != 0)
}

fn read_u16(record: &[u8], offset: usize) -> Option<u16> {
    read_bytes(record, offset).map(u16::from_be_bytes)
}

fn read_u32(record: &[u8], offset: usize) -> Option<u32> {
    read_bytes(record, offset).map(u32::from_be_bytes)
}

fn read_i32(record: &[u8], offset: usize) -> Option<i32> {
    read_bytes(record, offset).map(i32::from_be_bytes)
}

fn read_f32(record: &[u8], offset: usize) -> Option<f32> {
    read_bytes(record, offset).map(f32::from_be_bytes)
}
