pub mod config;
pub mod errors;
mod logger;
pub mod metadata;
pub mod parser;
pub mod reader;
pub mod stats;
pub mod types;

use std::path::PathBuf;

use crate::{
    config::{SourceConfig, StatsConfig},
    errors::{Result, SlpError},
    metadata::Metadata,
    parser::SlpParser,
    reader::SlpSource,
    stats::{Stats, StatsType, generate_overall_stats},
    types::{Event, FrameEntry, Frames, GameEnd, GameSettings},
};

pub use logger::Log;

/// A single replay, read lazily.
///
/// Every accessor decodes only as much of the source as it needs, and picks up where the
/// previous call left off. A source that is still being written (a live game, or a buffer
/// fed through `push_replay_data`) can be polled by calling the accessors again.
///
/// Once the game end has been read, nothing more is decoded and the stats are frozen.
#[derive(Debug)]
pub struct SlippiGame {
    source: SlpSource,
    parser: SlpParser,
    stats: Stats,
    read_position: Option<usize>,
    metadata: Option<Metadata>,
    final_stats: Option<StatsType>,
}

impl SlippiGame {
    pub fn new(source: SlpSource) -> Self {
        Self::builder(source).build()
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(SlpSource::File(path.into()))
    }

    pub fn from_buffer(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(SlpSource::Buffer(bytes.into()))
    }

    pub fn from_config(config: SourceConfig) -> Self {
        Self::new(config.into())
    }

    /// Builds a game from the tagged JSON form of a source. Anything that is neither a file
    /// path nor a byte buffer is rejected.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        SlpSource::try_from(value).map(Self::new)
    }

    pub fn builder(source: SlpSource) -> SlippiGameBuilder {
        SlippiGameBuilder {
            source,
            stats_config: None,
        }
    }

    /// Decodes what the source currently holds, resuming from the last position.
    fn process(&mut self, settings_only: bool) -> Result<()> {
        if self.parser.game_end().is_some() {
            return Ok(());
        }

        let mut file = reader::open_slp(&self.source)?;
        let parser = &mut self.parser;
        let stats = &mut self.stats;

        let position = reader::iterate_events(&mut file, self.read_position, |_, event| {
            let Some(event) = event else {
                return false;
            };

            parser.handle_event(event);

            if let Event::GameStart(_) = event {
                stats.set_player_permutations(parser.player_permutations());
            }

            settings_only && parser.settings().is_some()
        })?;

        tracing::debug!(
            target: Log::SlpReader,
            from = ?self.read_position,
            to = position,
            settings_only,
            "Decoded replay data"
        );

        self.read_position = Some(position);
        Ok(())
    }

    /// Game settings, once they are known. Stops decoding as soon as they are.
    pub fn get_settings(&mut self) -> Result<Option<&GameSettings>> {
        if self.parser.settings().is_none() {
            self.process(true)?;
        }

        Ok(self.parser.settings())
    }

    pub fn get_latest_frame(&mut self) -> Result<Option<&FrameEntry>> {
        self.process(false)?;
        Ok(self.parser.latest_frame())
    }

    pub fn get_game_end(&mut self) -> Result<Option<&GameEnd>> {
        self.process(false)?;
        Ok(self.parser.game_end())
    }

    pub fn get_frames(&mut self) -> Result<&Frames> {
        self.process(false)?;
        Ok(self.parser.frames())
    }

    pub fn get_follower_frames(&mut self) -> Result<&Frames> {
        self.process(false)?;
        Ok(self.parser.follower_frames())
    }

    /// Stats over every frame received so far. After the game end they never change again,
    /// and are returned from cache.
    pub fn get_stats(&mut self) -> Result<StatsType> {
        if let Some(stats) = &self.final_stats {
            return Ok(stats.clone());
        }

        self.process(false)?;
        self.stats.process(&self.parser);

        let stocks = self.stats.stocks().fetch();
        let conversions = self.stats.conversions().fetch();
        let inputs = self.stats.inputs().fetch();
        let playable_frame_count = self.parser.playable_frame_count();

        let overall = generate_overall_stats(
            self.stats.player_permutations(),
            &inputs,
            &stocks,
            &conversions,
            playable_frame_count,
        );

        let stats = StatsType {
            last_frame: self.parser.latest_frame_index(),
            playable_frame_count,
            stocks,
            conversions,
            combos: self.stats.combos().fetch(),
            action_counts: self.stats.actions().fetch(),
            overall,
            game_complete: self.parser.game_end().is_some(),
        };

        if stats.game_complete {
            tracing::info!(
                target: Log::SlpStats,
                last_frame = ?stats.last_frame,
                combos = stats.combos.len(),
                conversions = stats.conversions.len(),
                "Game complete, stats are final"
            );

            self.final_stats = Some(stats.clone());
        }

        Ok(stats)
    }

    /// The metadata block. `None` until the recording has been finalized.
    pub fn get_metadata(&mut self) -> Result<Option<&Metadata>> {
        if self.metadata.is_none() {
            let mut file = reader::open_slp(&self.source)?;
            self.metadata = reader::get_metadata(&mut file)?.map(Metadata::new);
        }

        Ok(self.metadata.as_ref())
    }

    /// Appends bytes to a buffer-backed game, as they arrive from a live stream.
    pub fn push_replay_data(&mut self, data: &[u8]) -> Result<()> {
        match &mut self.source {
            SlpSource::Buffer(bytes) => {
                bytes.extend_from_slice(data);
                Ok(())
            },

            SlpSource::File(_) => Err(SlpError::NotBuffered),
        }
    }

    /// Where the next decode pass starts. `None` before anything has been decoded.
    pub fn read_position(&self) -> Option<usize> {
        self.read_position
    }
}

#[derive(Debug)]
pub struct SlippiGameBuilder {
    source: SlpSource,
    stats_config: Option<StatsConfig>,
}

impl SlippiGameBuilder {
    pub fn with_stats_config(mut self, config: StatsConfig) -> Self {
        self.stats_config = Some(config);
        self
    }

    pub fn build(self) -> SlippiGame {
        SlippiGame {
            source: self.source,
            parser: SlpParser::new(),
            stats: Stats::new(self.stats_config.unwrap_or_default()),
            read_position: None,
            metadata: None,
            final_stats: None,
        }
    }
}
