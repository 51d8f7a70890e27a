use crate::Log;
use crate::types::{
    Event, FrameEntry, Frames, GameEnd, GameSettings, GameStart, PlayerFrame, PlayerKind, PlayerPermutation,
    PostFrameUpdate, PreFrameUpdate, SlpVersion, player_permutations,
};

/// The first frame of every game. The countdown runs from here until `FIRST_PLAYABLE_FRAME`.
pub const FIRST_FRAME: i32 = -123;

/// The first frame on which players can act.
pub const FIRST_PLAYABLE_FRAME: i32 = -39;

/// Replays from this version on record the correct Zelda/Sheik character in game start.
const SHEIK_FIX_VERSION: SlpVersion = SlpVersion::new(1, 6, 0);

const INTERNAL_SHEIK: u8 = 0x07;
const INTERNAL_ZELDA: u8 = 0x13;
const EXTERNAL_SHEIK: u8 = 0x13;
const EXTERNAL_ZELDA: u8 = 0x12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    AwaitingSettings,
    Accumulating,
    Finished,
}

/// Assembles decoded events into per-frame, per-player snapshots.
#[derive(Debug, Default)]
pub struct SlpParser {
    settings: Option<GameSettings>,
    settings_complete: bool,
    permutations: Vec<PlayerPermutation>,
    frames: Frames,
    follower_frames: Frames,
    latest_frame_index: Option<i32>,
    game_end: Option<GameEnd>,
}

impl SlpParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_event(&mut self, event: &Event) {
        match event {
            Event::GameStart(payload) => self.handle_game_start(payload),
            Event::PreFrameUpdate(payload) => self.handle_pre_frame_update(payload),
            Event::PostFrameUpdate(payload) => {
                self.handle_post_frame_update(payload);
                self.upsert(payload.frame, payload.player_index, payload.is_follower, |player| {
                    player.post = Some(payload.clone());
                });
            },
            Event::GameEnd(payload) => self.handle_game_end(payload),
        }
    }

    pub fn handle_game_start(&mut self, payload: &GameStart) {
        if self.settings.is_some() {
            tracing::warn!(target: Log::SlpParser, "Ignoring a second game start record");
            return;
        }

        let players = payload
            .players
            .iter()
            .filter(|player| player.kind != PlayerKind::Empty)
            .cloned()
            .collect();

        let settings = GameSettings {
            players,
            ..payload.clone()
        };

        tracing::info!(
            target: Log::SlpParser,
            slp_version = %settings.slp_version,
            stage_id = settings.stage_id,
            players = settings.players.len(),
            "Game start"
        );

        self.permutations = player_permutations(&settings);

        // Older replays only learn whether a port is Zelda or Sheik from the first frame.
        self.settings_complete = settings.slp_version >= SHEIK_FIX_VERSION;
        self.settings = Some(settings);
    }

    pub fn handle_pre_frame_update(&mut self, payload: &PreFrameUpdate) {
        self.upsert(payload.frame, payload.player_index, payload.is_follower, |player| {
            player.pre = Some(payload.clone());
        });
    }

    /// Finishes the settings of replays that predate the Zelda/Sheik fix.
    pub fn handle_post_frame_update(&mut self, payload: &PostFrameUpdate) {
        if self.settings_complete {
            return;
        }

        let Some(settings) = self.settings.as_mut() else {
            return;
        };

        if payload.frame <= FIRST_FRAME && !payload.is_follower {
            let character = settings
                .players
                .iter_mut()
                .find(|player| player.player_index == payload.player_index);

            if let Some(player) = character {
                match payload.internal_character_id {
                    INTERNAL_SHEIK => player.character_id = EXTERNAL_SHEIK,
                    INTERNAL_ZELDA => player.character_id = EXTERNAL_ZELDA,
                    _ => {},
                }
            }
        }

        self.settings_complete = payload.frame > FIRST_FRAME;
    }

    pub fn handle_game_end(&mut self, payload: &GameEnd) {
        tracing::info!(
            target: Log::SlpParser,
            game_end_method = payload.game_end_method,
            latest_frame = ?self.latest_frame_index,
            "Game end"
        );

        self.game_end = Some(payload.clone());
    }

    fn upsert<F>(&mut self, frame: i32, player_index: u8, is_follower: bool, update: F)
    where
        F: FnOnce(&mut PlayerFrame),
    {
        let frames = match is_follower {
            true => &mut self.follower_frames,
            false => &mut self.frames,
        };

        let entry = frames.entry(frame).or_insert_with(|| FrameEntry::new(frame));
        let Some(slot) = entry.players.get_mut(player_index as usize) else {
            tracing::warn!(target: Log::SlpParser, frame, player_index, "Frame update for an invalid port");
            return;
        };

        update(slot.get_or_insert_with(PlayerFrame::default));

        self.latest_frame_index = Some(self.latest_frame_index.map_or(frame, |latest| latest.max(frame)));
    }

    pub fn state(&self) -> ParserState {
        match (&self.settings, &self.game_end) {
            (_, Some(_)) => ParserState::Finished,
            (Some(_), None) => ParserState::Accumulating,
            (None, None) => ParserState::AwaitingSettings,
        }
    }

    /// Settings, once they are final.
    pub fn settings(&self) -> Option<&GameSettings> {
        match self.settings_complete {
            true => self.settings.as_ref(),
            false => None,
        }
    }

    pub fn player_permutations(&self) -> &[PlayerPermutation] {
        &self.permutations
    }

    pub fn latest_frame_index(&self) -> Option<i32> {
        self.latest_frame_index
    }

    /// The newest frame that will not change anymore. While the latest frame is still being
    /// written this is the one before it.
    pub fn latest_frame(&self) -> Option<&FrameEntry> {
        let latest = self.latest_frame_index?;

        match self.frames.get(&latest) {
            Some(frame) if self.is_frame_complete(frame) => Some(frame),
            _ => latest.checked_sub(1).and_then(|index| self.frames.get(&index)),
        }
    }

    pub fn frames(&self) -> &Frames {
        &self.frames
    }

    pub fn follower_frames(&self) -> &Frames {
        &self.follower_frames
    }

    pub fn game_end(&self) -> Option<&GameEnd> {
        self.game_end.as_ref()
    }

    /// Frames elapsed since players gained control.
    pub fn playable_frame_count(&self) -> i32 {
        match self.latest_frame_index {
            Some(latest) if latest >= FIRST_PLAYABLE_FRAME => latest.saturating_sub(FIRST_PLAYABLE_FRAME),
            _ => 0,
        }
    }

    /// A frame will not change anymore once a later frame has started, the game has ended,
    /// or every active port has both of its snapshots.
    pub fn is_frame_complete(&self, frame: &FrameEntry) -> bool {
        if self.game_end.is_some() || self.latest_frame_index.is_some_and(|latest| frame.frame < latest) {
            return true;
        }

        let Some(settings) = self.settings.as_ref() else {
            return false;
        };

        settings
            .players
            .iter()
            .all(|player| frame.player(player.player_index).is_some_and(PlayerFrame::is_complete))
    }
}
