//! Incremental, single-pass statistics over the frame timeline.
//!
//! Every computer implements `StatComputer`: it is told the player permutations once, then
//! fed each completed frame exactly once, in order. `Stats` owns the computers and does the
//! feeding.

use std::ops::Bound;

use crate::Log;
use crate::config::StatsConfig;
use crate::parser::SlpParser;
use crate::types::{FrameEntry, Frames, PlayerPermutation};

mod actions;
mod combos;
pub mod common;
mod conversions;
mod inputs;
mod overall;
mod stocks;

pub use actions::ActionsComputer;
pub use combos::ComboComputer;
pub use common::*;
pub use conversions::ConversionComputer;
pub use inputs::InputComputer;
pub use overall::generate_overall_stats;
pub use stocks::StockComputer;

pub trait StatComputer: std::fmt::Debug {
    /// Called once, before any frame is processed.
    fn set_player_permutations(&mut self, permutations: &[PlayerPermutation]);

    /// Called once per completed frame, in increasing frame order. `all_frames` gives access
    /// to earlier frames.
    fn process_frame(&mut self, frame: &FrameEntry, all_frames: &Frames);
}

/// Dispatches completed frames to every computer, in registration order.
#[derive(Debug)]
pub struct Stats {
    permutations: Vec<PlayerPermutation>,
    last_processed_frame: Option<i32>,
    actions: ActionsComputer,
    combos: ComboComputer,
    conversions: ConversionComputer,
    inputs: InputComputer,
    stocks: StockComputer,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(StatsConfig::default())
    }
}

impl Stats {
    pub fn new(config: StatsConfig) -> Self {
        Self {
            permutations: Vec::new(),
            last_processed_frame: None,
            actions: ActionsComputer::default(),
            combos: ComboComputer::new(config.combo_reset_frames),
            conversions: ConversionComputer::new(config.punish_reset_frames),
            inputs: InputComputer::default(),
            stocks: StockComputer::default(),
        }
    }

    fn registered(&mut self) -> [&mut dyn StatComputer; 5] {
        [
            &mut self.actions,
            &mut self.combos,
            &mut self.conversions,
            &mut self.inputs,
            &mut self.stocks,
        ]
    }

    pub fn set_player_permutations(&mut self, permutations: &[PlayerPermutation]) {
        if !self.permutations.is_empty() {
            tracing::warn!(target: Log::SlpStats, "Player permutations were already set, ignoring");
            return;
        }

        self.permutations = permutations.to_vec();
        for computer in self.registered() {
            computer.set_player_permutations(permutations);
        }
    }

    pub fn player_permutations(&self) -> &[PlayerPermutation] {
        &self.permutations
    }

    /// Feeds every frame that completed since the last call.
    pub fn process(&mut self, parser: &SlpParser) {
        if self.permutations.is_empty() {
            return;
        }

        let frames = parser.frames();
        let pending = match self.last_processed_frame {
            Some(last) => frames.range((Bound::Excluded(last), Bound::Unbounded)),
            None => frames.range(..),
        };

        let mut processed = 0usize;
        for (&index, frame) in pending {
            // Don't compute anything on frames that have not been fully received.
            if !parser.is_frame_complete(frame) {
                break;
            }

            debug_assert!(self.last_processed_frame.is_none_or(|last| index > last));

            for computer in self.registered() {
                computer.process_frame(frame, frames);
            }

            self.last_processed_frame = Some(index);
            processed += 1;
        }

        if processed > 0 {
            tracing::debug!(
                target: Log::SlpStats,
                processed,
                last_processed_frame = ?self.last_processed_frame,
                "Processed frames"
            );
        }
    }

    pub fn actions(&self) -> &ActionsComputer {
        &self.actions
    }

    pub fn combos(&self) -> &ComboComputer {
        &self.combos
    }

    pub fn conversions(&self) -> &ConversionComputer {
        &self.conversions
    }

    pub fn inputs(&self) -> &InputComputer {
        &self.inputs
    }

    pub fn stocks(&self) -> &StockComputer {
        &self.stocks
    }
}
