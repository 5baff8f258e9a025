use itertools::Itertools;
#[allow(unused_imports)]
use pretty_assertions::{assert_eq, assert_ne};

use shogidb::*;

fn game_of(moves: &[&str]) -> Game {
    let mut g = Game::new(None).unwrap();
    for usi in moves {
        g.do_usi_move(usi).unwrap();
    }
    g
}

#[test]
fn test_silver_crown_from_sfen() {
    let castle = sfen_find_castle(
        "ln1g3rl/1ks2bg2/2pp1snp1/pp2ppp1p/7P1/PPP1PPP1P/1SBP2N2/1KG1GS1R1/LN6L w - 38",
    )
    .unwrap();
    assert_eq!(castle, Some(Castle::SilverCrown));
}

#[test]
fn test_snow_roof_from_sfen() {
    let castle = sfen_find_castle(
        "ln1g1k1nl/1r1s2gb1/p1pp1pspp/1p2p1p2/9/2PP3P1/PP1SPPP1P/1BG1GS1R1/LN1K3NL w - 18",
    )
    .unwrap();
    assert_eq!(castle, Some(Castle::SnowRoofCastle));
}

// 美濃囲いを組む 12 手。後手は当たりのつかない歩突きだけ。
const MINO_GAME: [&str; 12] = [
    "2h6h", "9c9d", "5i4h", "1c1d", "4h3h", "5c5d", "3h2h", "8c8d", "3i3h", "4c4d", "6i5h",
    "6c6d",
];

#[test]
fn test_mino_castle_sweep() {
    let g = game_of(&MINO_GAME);
    let castles = game_find_castles(&g);

    // 銀が３八に上がった時点で片美濃、金が５八に寄って本美濃。
    assert_eq!(
        castles.sente.iter().collect_vec(),
        [Castle::HalfMinoCastle, Castle::MinoCastle]
    );
    assert_eq!(castles.sente.first_move_no(Castle::HalfMinoCastle), Some(9));
    assert_eq!(castles.sente.first_move_no(Castle::MinoCastle), Some(11));
    assert!(castles.gote.is_empty());
}

#[test]
fn test_mino_game_opening_is_forth_file_rook() {
    let g = game_of(&MINO_GAME);
    let openings = game_find_openings(&g);
    assert!(openings.sente.contains(Opening::ForthFileRook));
    assert_eq!(openings.sente.first_move_no(Opening::ForthFileRook), Some(1));
    assert!(!openings.sente.contains(Opening::SwingingRook));
}

#[test]
fn test_bishop_exchange_recognized() {
    let g = game_of(&[
        "7g7f", "3c3d", "8h2b+", "3a2b", "6i7h", "8c8d", "7i8h", "8d8e", "8h7g",
    ]);
    let openings = game_find_openings(&g);
    assert!(openings.sente.contains(Opening::BishopExchange));
    assert_eq!(
        openings.sente.first_move_no(Opening::BishopExchange),
        Some(9)
    );
}

#[test]
fn test_quick_ishida_dominates_third_file_rook() {
    let g = game_of(&["7g7f", "3c3d", "7f7e", "8c8d", "2h7h", "8d8e"]);
    let openings = game_find_openings(&g);
    assert!(openings.sente.contains(Opening::QuickIshida));
    // 早石田が付いたら三間飛車は冗長タグとして落とす。
    assert!(!openings.sente.contains(Opening::ThirdFileRook));
    assert!(!openings.sente.contains(Opening::SwingingRook));
}

#[test]
fn test_recognizers_are_deterministic_across_games() {
    let g = game_of(&MINO_GAME);
    let a = game_find_castles(&g);
    let b = game_find_castles(&g);
    assert_eq!(a, b);
}

#[test]
fn test_capture_of_major_piece_ends_the_opening() {
    let mut pos = PositionForPatternRecognition::new();
    for usi in ["7g7f", "3c3d", "8h2b+", "3a2b", "B*5e", "9c9d"] {
        let m = pos.pos().parse_usi_move(usi).unwrap();
        pos.do_move(m).unwrap();
    }
    // 角と馬の取り合いでは序盤認識は続く。
    assert!(pos.is_opening(0));

    // ５五の角が２二の銀を取ると、後手は主要駒を失い序盤認識の対象外になる。
    let m = pos.pos().parse_usi_move("5e2b+").unwrap();
    pos.do_move(m).unwrap();
    assert!(pos.is_opening(1));
    assert!(!pos.is_opening(-1));
    assert!(!pos.is_opening(0));
}
