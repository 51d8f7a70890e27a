use super::StatComputer;
use super::common::*;
use crate::types::{FrameEntry, Frames, PlayerPermutation};

/// Records every stock a player goes through, from respawn to death.
#[derive(Debug, Default)]
pub struct StockComputer {
    permutations: Vec<PlayerPermutation>,
    open: Vec<Option<StockType>>,
    finished: Vec<StockType>,
}

impl StockComputer {
    /// Every stock so far, in the order they started.
    pub fn fetch(&self) -> Vec<StockType> {
        let mut stocks: Vec<StockType> = self.finished.iter().chain(self.open.iter().flatten()).cloned().collect();
        stocks.sort_by_key(|stock| (stock.start_frame, stock.player_index, stock.opponent_index));
        stocks
    }
}

impl StatComputer for StockComputer {
    fn set_player_permutations(&mut self, permutations: &[PlayerPermutation]) {
        self.permutations = permutations.to_vec();
        self.open = vec![None; permutations.len()];
    }

    fn process_frame(&mut self, frame: &FrameEntry, all_frames: &Frames) {
        for (indices, open) in self.permutations.iter().zip(self.open.iter_mut()) {
            let Some(player_frame) = frame.post(indices.player_index) else {
                continue;
            };
            let prev_player_frame = prev_post(all_frames, frame.frame, indices.player_index);

            if open.is_none() {
                // Wait until the player is done spawning before starting the stock.
                if !is_dead(player_frame.action_state_id) {
                    *open = Some(StockType {
                        player_index: indices.player_index,
                        opponent_index: indices.opponent_index,
                        start_frame: frame.frame,
                        end_frame: None,
                        start_percent: 0.0,
                        current_percent: player_frame.percent,
                        end_percent: None,
                        count: player_frame.stocks_remaining,
                        death_animation: None,
                    });
                }
                continue;
            }

            let Some(stock) = open.as_mut() else {
                continue;
            };

            if did_lose_stock(player_frame, prev_player_frame) {
                stock.end_frame = Some(frame.frame);
                stock.end_percent = Some(prev_percent(prev_player_frame));
                stock.death_animation = Some(player_frame.action_state_id);

                self.finished.extend(open.take());
                continue;
            }

            stock.current_percent = player_frame.percent;
        }
    }
}
