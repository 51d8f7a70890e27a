use super::common::*;
use crate::types::PlayerPermutation;

/// Frames per minute of game time.
const FRAMES_PER_MINUTE: f64 = 3600.0;

fn get_ratio(count: f64, total: f64) -> RatioType {
    RatioType {
        count,
        total,
        ratio: match total != 0.0 {
            true => Some(count / total),
            false => None,
        },
    }
}

fn conversions_of<'a>(
    conversions: &'a [ConversionType],
    player_index: u8,
    opponent_index: u8,
) -> impl Iterator<Item = &'a ConversionType> {
    conversions
        .iter()
        .filter(move |c| c.player_index == player_index && c.opponent_index == opponent_index)
}

fn get_opening_ratio(conversions: &[ConversionType], indices: PlayerPermutation, opening_type: OpeningType) -> RatioType {
    let openings = conversions_of(conversions, indices.player_index, indices.opponent_index)
        .filter(|c| c.opening_type == opening_type)
        .count();
    let opponent_openings = conversions_of(conversions, indices.opponent_index, indices.player_index)
        .filter(|c| c.opening_type == opening_type)
        .count();

    get_ratio(openings as f64, (openings + opponent_openings) as f64)
}

/// Of the trades, how many went in the player's favor: a kill the opponent didn't get, or
/// more damage.
fn get_beneficial_trade_ratio(conversions: &[ConversionType], indices: PlayerPermutation) -> RatioType {
    let player_trades: Vec<_> = conversions_of(conversions, indices.player_index, indices.opponent_index)
        .filter(|c| c.opening_type == OpeningType::Trade)
        .collect();
    let opponent_trades = conversions_of(conversions, indices.opponent_index, indices.player_index)
        .filter(|c| c.opening_type == OpeningType::Trade);

    let benefits_player = player_trades
        .iter()
        .zip(opponent_trades)
        .filter(|(player, opponent)| {
            let player_damage = player.current_percent - player.start_percent;
            let opponent_damage = opponent.current_percent - opponent.start_percent;

            (player.did_kill && !opponent.did_kill) || player_damage > opponent_damage
        })
        .count();

    get_ratio(benefits_player as f64, player_trades.len() as f64)
}

/// Summarizes the per-permutation results of the other computers.
pub fn generate_overall_stats(
    permutations: &[PlayerPermutation],
    inputs: &[InputCountsType],
    stocks: &[StockType],
    conversions: &[ConversionType],
    playable_frame_count: i32,
) -> Vec<OverallType> {
    let game_minutes = f64::from(playable_frame_count) / FRAMES_PER_MINUTE;

    permutations
        .iter()
        .map(|&indices| {
            let PlayerPermutation {
                player_index,
                opponent_index,
            } = indices;

            let input_count = inputs
                .iter()
                .find(|i| i.player_index == player_index && i.opponent_index == opponent_index)
                .map_or(0, |i| i.input_count);

            let player_conversions: Vec<_> = conversions_of(conversions, player_index, opponent_index).collect();
            let successful_conversion_count = player_conversions.iter().filter(|c| c.moves.len() > 1).count();
            let conversion_count = player_conversions.len();

            let opponent_stocks: Vec<_> = stocks
                .iter()
                .filter(|s| s.player_index == opponent_index && s.opponent_index == player_index)
                .collect();
            let total_damage: f32 = opponent_stocks.iter().map(|s| s.current_percent).sum();
            let kill_count = opponent_stocks.iter().filter(|s| s.end_frame.is_some()).count();

            OverallType {
                player_index,
                opponent_index,
                input_count,
                conversion_count: conversion_count as u32,
                total_damage,
                kill_count: kill_count as u32,
                successful_conversions: get_ratio(successful_conversion_count as f64, conversion_count as f64),
                inputs_per_minute: get_ratio(f64::from(input_count), game_minutes),
                openings_per_kill: get_ratio(conversion_count as f64, kill_count as f64),
                damage_per_opening: get_ratio(f64::from(total_damage), conversion_count as f64),
                neutral_win_ratio: get_opening_ratio(conversions, indices, OpeningType::NeutralWin),
                counter_hit_ratio: get_opening_ratio(conversions, indices, OpeningType::CounterAttack),
                beneficial_trade_ratio: get_beneficial_trade_ratio(conversions, indices),
            }
        })
        .collect()
}
