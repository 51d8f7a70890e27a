//! Builds replay byte streams for the integration tests.

#![allow(dead_code)]

pub const GAME_START_SIZE: u16 = 0x1A1;
pub const PRE_FRAME_SIZE: u16 = 0x3F;
pub const POST_FRAME_SIZE: u16 = 0x25;
pub const GAME_END_SIZE: u16 = 0x2;
pub const FRAME_BOOKEND_SIZE: u16 = 0x8;

pub const WAIT: u16 = 0x0E;
pub const FTILT: u16 = 0x33;
pub const DAMAGE_FLY_N: u16 = 0x58;
pub const DEAD_DOWN: u16 = 0x00;
pub const SELF_DESTRUCT: u8 = 6;

/// One player's post-frame snapshot, with everything the tests don't care about zeroed.
#[derive(Debug, Clone, Copy)]
pub struct Post {
    pub player_index: u8,
    pub action_state_id: u16,
    pub percent: f32,
    pub last_attack_landed: u8,
    pub last_hit_by: u8,
    pub stocks_remaining: u8,
    pub action_state_counter: f32,
}

impl Post {
    pub fn idle(player_index: u8) -> Self {
        Self {
            player_index,
            action_state_id: WAIT,
            percent: 0.0,
            last_attack_landed: 0,
            last_hit_by: SELF_DESTRUCT,
            stocks_remaining: 4,
            action_state_counter: 0.0,
        }
    }

    pub fn action(mut self, action_state_id: u16, counter: f32) -> Self {
        self.action_state_id = action_state_id;
        self.action_state_counter = counter;
        self
    }

    pub fn percent(mut self, percent: f32) -> Self {
        self.percent = percent;
        self
    }

    pub fn hit_by(mut self, attacker: u8) -> Self {
        self.last_hit_by = attacker;
        self
    }

    pub fn landed(mut self, move_id: u8) -> Self {
        self.last_attack_landed = move_id;
        self
    }

    pub fn stocks(mut self, stocks_remaining: u8) -> Self {
        self.stocks_remaining = stocks_remaining;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ReplayBuilder {
    raw: Vec<u8>,
}

impl ReplayBuilder {
    /// Starts a stream with the payload sizes record. Frame bookends are declared so that
    /// tests can exercise records without a decoder.
    pub fn new() -> Self {
        Self::with_extra_sizes(&[])
    }

    /// Like `new`, also declaring the payload sizes of `extra` commands.
    pub fn with_extra_sizes(extra: &[(u8, u16)]) -> Self {
        let mut sizes = vec![
            (0x36u8, GAME_START_SIZE),
            (0x37, PRE_FRAME_SIZE),
            (0x38, POST_FRAME_SIZE),
            (0x39, GAME_END_SIZE),
            (0x3C, FRAME_BOOKEND_SIZE),
        ];
        sizes.extend_from_slice(extra);

        let mut raw = vec![0x35, (1 + sizes.len() * 3) as u8];
        for (command, size) in sizes {
            raw.push(command);
            raw.extend_from_slice(&size.to_be_bytes());
        }

        Self { raw }
    }

    /// Human players on the given ports (0-based), every other port empty.
    pub fn game_start(mut self, version: [u8; 3], ports: &[u8]) -> Self {
        let mut record = vec![0u8; GAME_START_SIZE as usize + 1];
        record[0] = 0x36;
        record[0x1..0x4].copy_from_slice(&version);
        record[0x13..0x15].copy_from_slice(&31u16.to_be_bytes());

        for player_index in 0..4usize {
            let offset = player_index * 0x24;
            let active = ports.contains(&(player_index as u8));

            record[0x65 + offset] = 0x02;
            record[0x66 + offset] = if active { 0 } else { 3 };
            record[0x67 + offset] = 4;
        }

        self.raw.extend_from_slice(&record);
        self
    }

    pub fn pre(mut self, frame: i32, player_index: u8, buttons: u16) -> Self {
        let mut record = vec![0u8; PRE_FRAME_SIZE as usize + 1];
        record[0] = 0x37;
        record[0x1..0x5].copy_from_slice(&frame.to_be_bytes());
        record[0x5] = player_index;
        record[0x31..0x33].copy_from_slice(&buttons.to_be_bytes());

        self.raw.extend_from_slice(&record);
        self
    }

    pub fn post(mut self, frame: i32, post: Post) -> Self {
        let mut record = vec![0u8; POST_FRAME_SIZE as usize + 1];
        record[0] = 0x38;
        record[0x1..0x5].copy_from_slice(&frame.to_be_bytes());
        record[0x5] = post.player_index;
        record[0x7] = 0x02;
        record[0x8..0xA].copy_from_slice(&post.action_state_id.to_be_bytes());
        record[0x16..0x1A].copy_from_slice(&post.percent.to_be_bytes());
        record[0x1E] = post.last_attack_landed;
        record[0x20] = post.last_hit_by;
        record[0x21] = post.stocks_remaining;
        record[0x22..0x26].copy_from_slice(&post.action_state_counter.to_be_bytes());

        self.raw.extend_from_slice(&record);
        self
    }

    /// A full frame: pre then post for each player, then a frame bookend.
    pub fn frame(mut self, frame: i32, posts: &[Post]) -> Self {
        for post in posts {
            self = self.pre(frame, post.player_index, 0).post(frame, *post);
        }

        self.record(0x3C, FRAME_BOOKEND_SIZE)
    }

    /// A record of `size` zero bytes after its command byte.
    pub fn record(mut self, command: u8, size: u16) -> Self {
        self.raw.push(command);
        self.raw.extend(std::iter::repeat_n(0u8, size as usize));
        self
    }

    pub fn game_end(mut self, method: u8) -> Self {
        self.raw.extend_from_slice(&[0x39, method, 0xFF]);
        self
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.raw.extend_from_slice(bytes);
        self
    }

    pub fn raw(&self) -> Vec<u8> {
        self.raw.clone()
    }

    /// The stream inside the UBJSON container, with a finished metadata block.
    pub fn wrapped(&self, metadata: &[u8]) -> Vec<u8> {
        let mut bytes = self.wrapped_in_progress();
        bytes[11..15].copy_from_slice(&(self.raw.len() as u32).to_be_bytes());

        bytes.extend_from_slice(b"U\x08metadata{");
        bytes.extend_from_slice(metadata);
        bytes.extend_from_slice(b"}}");
        bytes
    }

    /// The stream inside the UBJSON container, as written while the game is in progress.
    pub fn wrapped_in_progress(&self) -> Vec<u8> {
        let mut bytes = b"{U\x03raw[$U#l\x00\x00\x00\x00".to_vec();
        bytes.extend_from_slice(&self.raw);
        bytes
    }
}

/// UBJSON for `"key": "value"` inside an object.
pub fn ubjson_string(key: &str, value: &str) -> Vec<u8> {
    let mut bytes = vec![b'U', key.len() as u8];
    bytes.extend_from_slice(key.as_bytes());
    bytes.extend_from_slice(&[b'S', b'U', value.len() as u8]);
    bytes.extend_from_slice(value.as_bytes());
    bytes
}

/// UBJSON for `"key": <i32>` inside an object.
pub fn ubjson_int(key: &str, value: i32) -> Vec<u8> {
    let mut bytes = vec![b'U', key.len() as u8];
    bytes.extend_from_slice(key.as_bytes());
    bytes.push(b'l');
    bytes.extend_from_slice(&value.to_be_bytes());
    bytes
}

/// A two player game (ports 1 and 2) in which player 0 hits player 1 with forward tilt on
/// frames 10 through 12, for 12% each, and then both idle until `last_frame`.
pub fn scenario(last_frame: i32) -> ReplayBuilder {
    let mut replay = ReplayBuilder::new().game_start([3, 12, 0], &[0, 1]);

    for frame in -123..=last_frame {
        let attacker = match frame {
            9..=12 => Post::idle(0).action(FTILT, (frame - 8) as f32).landed(0x0F),
            _ => Post::idle(0),
        };

        let defender = match frame {
            10..=12 => Post::idle(1)
                .action(DAMAGE_FLY_N, 0.0)
                .percent(12.0 * (frame - 9) as f32)
                .hit_by(0),
            f if f > 12 => Post::idle(1).percent(36.0).hit_by(0),
            _ => Post::idle(1),
        };

        replay = replay.frame(frame, &[attacker, defender]);
    }

    replay
}
