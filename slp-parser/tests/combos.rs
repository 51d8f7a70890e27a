mod common;

use common::*;
use slp_parser::SlippiGame;
use slp_parser::config::StatsConfig;
use slp_parser::reader::SlpSource;
use slp_parser::stats::{OpeningType, StatsType};

fn stats_of(replay: &ReplayBuilder) -> StatsType {
    SlippiGame::from_buffer(replay.raw()).get_stats().unwrap()
}

#[test]
fn test_single_string_of_hits() {
    let stats = stats_of(&scenario(120).game_end(2));

    assert_eq!(stats.combos.len(), 1);
    let combo = &stats.combos[0];

    assert_eq!(combo.player_index, 0);
    assert_eq!(combo.opponent_index, 1);
    assert_eq!(combo.start_frame, 10);
    assert_eq!(combo.start_percent, 0.0);
    assert_eq!(combo.current_percent, 36.0);
    assert_eq!(combo.end_frame, Some(58));
    assert_eq!(combo.end_percent, Some(36.0));
    assert!(!combo.did_kill);

    assert_eq!(combo.moves.len(), 1);
    assert_eq!(combo.moves[0].move_id, 0x0F);
    assert_eq!(combo.moves[0].hit_count, 3);
    assert_eq!(combo.moves[0].damage, 36.0);

    assert_eq!(stats.conversions.len(), 1);
    assert_eq!(stats.conversions[0].opening_type, OpeningType::NeutralWin);
    assert!(stats.game_complete);
    assert_eq!(stats.last_frame, Some(120));
    assert_eq!(stats.playable_frame_count, 159);
}

#[test]
fn test_combo_stays_open_inside_reset_window() {
    let stats = stats_of(&scenario(57));

    assert_eq!(stats.combos.len(), 1);
    assert_eq!(stats.combos[0].end_frame, None);
    assert!(!stats.game_complete);
}

#[test]
fn test_reset_window_is_configurable() {
    let replay = scenario(40);
    let config = StatsConfig {
        combo_reset_frames: 10,
        punish_reset_frames: 10,
    };

    let mut game = SlippiGame::builder(SlpSource::Buffer(replay.raw()))
        .with_stats_config(config)
        .build();
    let stats = game.get_stats().unwrap();

    assert_eq!(stats.combos[0].end_frame, Some(23));
    assert_eq!(stats.conversions[0].end_frame, Some(23));
}

#[test]
fn test_five_hits_of_one_move() {
    let mut replay = ReplayBuilder::new().game_start([3, 12, 0], &[0, 1]);

    for frame in 0..=10 {
        let attacker = Post::idle(0).action(FTILT, frame as f32 + 1.0).landed(0x0F);
        let defender = match frame {
            1..=5 => Post::idle(1)
                .action(DAMAGE_FLY_N, 0.0)
                .percent(3.0 * frame as f32)
                .hit_by(0),
            f if f > 5 => Post::idle(1).action(DAMAGE_FLY_N, 0.0).percent(15.0).hit_by(0),
            _ => Post::idle(1),
        };

        replay = replay.frame(frame, &[attacker, defender]);
    }

    let stats = stats_of(&replay);
    let combo = &stats.combos[0];

    assert_eq!(combo.moves.len(), 1);
    assert_eq!(combo.moves[0].hit_count, 5);
    assert_eq!(combo.moves[0].damage, 15.0);
}

#[test]
fn test_self_destruct_attacker_is_corrected_once() {
    let mut replay = ReplayBuilder::new().game_start([3, 12, 0], &[0, 1]);

    // Grabbed straight out of respawn: nobody has hit the defender yet.
    replay = replay
        .frame(0, &[Post::idle(0), Post::idle(1)])
        .frame(1, &[Post::idle(0).action(0xD4, 0.0), Post::idle(1).action(0xDF, 0.0)])
        .frame(2, &[Post::idle(0).action(0xD9, 0.0).landed(0x34), Post::idle(1).action(0xE0, 0.0)]);

    let mut game = SlippiGame::from_buffer(replay.raw());
    assert_eq!(game.get_stats().unwrap().combos[0].player_index, SELF_DESTRUCT);

    // Pummel.
    replay = replay.frame(
        3,
        &[
            Post::idle(0).action(0xD9, 1.0).landed(0x34),
            Post::idle(1).action(0xE0, 0.0).percent(3.0).hit_by(0),
        ],
    );
    replay = replay.frame(4, &[Post::idle(0).action(0xD9, 2.0), Post::idle(1).action(0xE0, 0.0).percent(3.0).hit_by(0)]);

    let mut game = SlippiGame::from_buffer(replay.raw());
    let stats = game.get_stats().unwrap();

    assert_eq!(stats.combos.len(), 1);
    assert_eq!(stats.combos[0].player_index, 0);
    assert_eq!(stats.combos[0].start_frame, 1);
    assert_eq!(stats.combos[0].moves.len(), 1);
    assert_eq!(stats.combos[0].moves[0].move_id, 0x34);
}

#[test]
fn test_kill_closes_combo_on_the_same_frame() {
    let mut replay = ReplayBuilder::new().game_start([3, 12, 0], &[0, 1]);

    replay = replay
        .frame(0, &[Post::idle(0).action(FTILT, 1.0), Post::idle(1).percent(100.0)])
        .frame(
            1,
            &[
                Post::idle(0).action(FTILT, 2.0).landed(0x0F),
                Post::idle(1).action(DAMAGE_FLY_N, 0.0).percent(112.0).hit_by(0),
            ],
        )
        .frame(
            2,
            &[
                Post::idle(0),
                Post::idle(1).action(DEAD_DOWN, 0.0).percent(0.0).stocks(3).hit_by(0),
            ],
        )
        .frame(3, &[Post::idle(0), Post::idle(1).action(DEAD_DOWN, 0.0).stocks(3).hit_by(0)])
        .game_end(2);

    let stats = stats_of(&replay);
    let combo = &stats.combos[0];

    assert!(combo.did_kill);
    assert_eq!(combo.end_frame, Some(2));
    assert_eq!(combo.end_percent, Some(112.0));
    assert_eq!(combo.current_percent, 112.0);

    let lost = stats.stocks.iter().find(|s| s.player_index == 1 && s.end_frame.is_some()).expect("lost stock");
    assert_eq!(lost.end_frame, Some(2));
    assert_eq!(lost.end_percent, Some(112.0));
    assert_eq!(lost.death_animation, Some(DEAD_DOWN));

    let overall = stats.overall.iter().find(|o| o.player_index == 0).expect("overall");
    assert_eq!(overall.kill_count, 1);
    assert_eq!(overall.conversion_count, 1);
}

#[test]
fn test_three_players_do_not_duplicate_combos() {
    let mut replay = ReplayBuilder::new().game_start([3, 12, 0], &[0, 1, 2]);

    for frame in 0..=4 {
        let defender = match frame {
            1..=2 => Post::idle(1)
                .action(DAMAGE_FLY_N, 0.0)
                .percent(10.0 * frame as f32)
                .hit_by(2),
            f if f > 2 => Post::idle(1).percent(20.0).hit_by(2),
            _ => Post::idle(1),
        };

        let attacker = Post::idle(2).action(FTILT, frame as f32 + 1.0).landed(0x0F);
        replay = replay.frame(frame, &[Post::idle(0), defender, attacker]);
    }

    let stats = stats_of(&replay);

    assert_eq!(stats.combos.len(), 1);
    assert_eq!(stats.combos[0].player_index, 2);
    assert_eq!(stats.conversions.len(), 1);
    assert_eq!(stats.overall.len(), 6);
}

#[test]
fn test_unattributed_grab_is_counted_once_with_three_players() {
    let mut replay = ReplayBuilder::new().game_start([3, 12, 0], &[0, 1, 2]);

    // Player 2 grabs player 1 out of respawn and lets go without dealing damage.
    for frame in 0..=6 {
        let (grabber, grabbed) = match frame {
            1..=3 => (Post::idle(2).action(0xD4, frame as f32), Post::idle(1).action(0xDF, 0.0)),
            _ => (Post::idle(2), Post::idle(1)),
        };

        replay = replay.frame(frame, &[Post::idle(0), grabbed, grabber]);
    }

    let stats = stats_of(&replay);

    let combos: Vec<(u8, u8, i32)> = stats
        .combos
        .iter()
        .map(|combo| (combo.player_index, combo.opponent_index, combo.start_frame))
        .collect();
    assert_eq!(combos, vec![(SELF_DESTRUCT, 1, 1)]);

    let conversions_on_grabbed = stats.conversions.iter().filter(|c| c.opponent_index == 1).count();
    assert_eq!(conversions_on_grabbed, 1);
}
