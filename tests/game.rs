#[allow(unused_imports)]
use pretty_assertions::{assert_eq, assert_ne};

use shogidb::*;

fn play(g: &mut Game, moves: &[&str]) {
    for usi in moves {
        g.do_usi_move(usi).unwrap();
    }
}

#[test]
fn test_fourfold_repetition_is_a_draw() {
    let mut g = Game::new(None).unwrap();
    // 飛を振って戻すだけの手順で同一局面を 4 回作る。
    for _ in 0..3 {
        play(&mut g, &["2h3h", "8b7b", "3h2h", "7b8b"]);
    }
    assert_eq!(g.result(), Some(GameResult::Repetition));
    assert_eq!(g.sente_points(), Some(0));
    assert_eq!(g.text_result(), Some("1/2"));
}

#[test]
fn test_perpetual_check_loses() {
    // 先手の飛打ちからの連続王手で同一局面を 4 回作る。
    let mut g = Game::new(Some("4k4/9/9/9/9/9/9/9/4K4 b Rr2b4g4s4n4l18p 1")).unwrap();
    play(&mut g, &["R*5e", "5a4a"]);
    for _ in 0..2 {
        play(&mut g, &["5e4e", "4a5a", "4e5e", "5a4a"]);
    }
    play(&mut g, &["5e4e", "4a5a", "4e5e"]);
    assert_eq!(g.result(), Some(GameResult::IllegalPrecedingMove));
    // 手番(後手)の勝ち。王手をかけ続けた先手の反則負け。
    assert_eq!(g.sente_points(), Some(-1));
}

#[test]
fn test_nifu_in_game_records_illegal_move() {
    let mut g = Game::new(Some("4k4/9/9/9/9/9/4P4/9/4K4 b P2r2b4g4s4n4l16p 1")).unwrap();
    g.do_usi_move("P*5e").unwrap();
    assert_eq!(g.result(), Some(GameResult::IllegalMove));
    assert!(g.moves.is_empty());
    assert_eq!(g.sente_points(), Some(-1));
}

#[test]
fn test_entering_king_is_detected() {
    let g = Game::new(Some(
        "2+B+BK+R+R2/1+P+P+P+P+P+P+P+P/9/9/9/9/9/9/8k b 4g4s4n4l10p 1",
    ))
    .unwrap();
    assert_eq!(g.result(), Some(GameResult::EnteringKing));
    assert_eq!(g.sente_points(), Some(1));
}

#[test]
fn test_adjourn_detects_checkmate() {
    // 頭金の詰み。後手番で合法手がない。
    let mut g = Game::new(Some(
        "4k4/4G4/4R4/9/9/9/9/9/4K4 w B3GS2N2L9Pbr3s2n2l9p 1",
    ))
    .unwrap();
    assert_eq!(g.result(), None);
    g.adjourn();
    assert_eq!(g.result(), Some(GameResult::Checkmate));
    assert_eq!(g.sente_points(), Some(1));
}

#[test]
fn test_adjourn_keeps_unfinished_game_open() {
    let mut g = Game::new(None).unwrap();
    play(&mut g, &["7g7f", "3c3d"]);
    g.adjourn();
    assert_eq!(g.result(), None);
}

#[test]
fn test_positions_map() {
    let mut g = Game::new(None).unwrap();
    play(&mut g, &["7g7f", "3c3d"]);
    let d = g.positions();
    assert_eq!(d.len(), 3);
    assert_eq!(d[&1], SFEN_INITIAL);
    assert_eq!(
        d[&2],
        "lnsgkgsnl/1r5b1/ppppppppp/9/9/2P6/PP1PPPPPP/1B5R1/LNSGKGSNL w - 2"
    );
    assert!(d[&3].ends_with(" b - 3"));
}

#[test]
fn test_total_time() {
    let mut g = Game::new(None).unwrap();
    let mut m = g.pos.parse_usi_move("7g7f").unwrap();
    m.time = Some(std::time::Duration::from_secs(2));
    m.cum_time = Some(std::time::Duration::from_secs(2));
    g.do_move(m);
    let mut m = g.pos.parse_usi_move("3c3d").unwrap();
    m.time = Some(std::time::Duration::from_secs(5));
    m.cum_time = Some(std::time::Duration::from_secs(5));
    g.do_move(m);
    assert_eq!(g.total_time(), Some(7));

    let mut g2 = Game::new(None).unwrap();
    play(&mut g2, &["7g7f"]);
    assert_eq!(g2.total_time(), None);
}
