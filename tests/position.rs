#[allow(unused_imports)]
use pretty_assertions::{assert_eq, assert_ne};

use shogidb::*;

#[test]
fn test_first_move_from_initial_position() {
    let mut pos = Position::initial();
    let mut m = pos.parse_usi_move("7g7f").unwrap();
    pos.do_move(&mut m).unwrap();
    assert_eq!(
        pos.sfen(true),
        "lnsgkgsnl/1r5b1/ppppppppp/9/9/2P6/PP1PPPPPP/1B5R1/LNSGKGSNL w - 2"
    );
    assert_eq!(m.legality(), Legality::Legal);
}

#[test]
fn test_accepts_legal_midgame_sfen() {
    let sfen = "l4+N+R1l/2ksg4/p2p1s3/2p1pp1N1/6S1p/2r2P3/PP1P1g2P/1G1S2+b2/LN1K4L b BGN3P4p 85";
    let pos = Position::new(sfen).unwrap();
    assert_eq!(pos.sfen(true), sfen);
}

#[test]
fn test_rejects_position_with_unresolved_check() {
    // 直前に指した側(先手)の玉が桂に王手されたまま。
    let sfen = "lnsg1gsnl/1r5b1/ppppkpppp/4p4/5N3/6P2/PPPPPP1PP/1B5R1/LNSGKGS1L b - 1";
    match Position::new(sfen) {
        Err(ShogiError::InvalidSfen { .. }) => {}
        other => panic!("expected InvalidSfen, got {:?}", other),
    }
}

#[test]
fn test_rejects_piece_count_violation() {
    // 歩が 19 枚。
    assert!(
        Position::new("lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b P 1").is_err()
    );
}

#[test]
fn test_do_undo_restores_sfen_along_a_line() {
    let mut pos = Position::initial();
    let mut trail: Vec<(Move, Option<UndoMove>, String)> = Vec::new();

    for usi in ["7g7f", "3c3d", "8h2b+", "3a2b", "B*4e"] {
        let mut m = pos.parse_usi_move(usi).unwrap();
        let before = pos.sfen(true);
        let undo = pos.do_move(&mut m).unwrap();
        trail.push((m, undo, before));
    }

    for (m, undo, before) in trail.into_iter().rev() {
        pos.undo_move(&m, undo);
        assert_eq!(pos.sfen(true), before);
    }
    assert_eq!(pos.sfen(true), SFEN_INITIAL);
}

#[test]
fn test_nifu_is_rejected() {
    // ５筋に先手の歩がある状態で歩を打つ。
    let mut pos =
        Position::new("4k4/9/9/9/9/9/4P4/9/4K4 b P2r2b4g4s4n4l16p 1").unwrap();
    let mut m = pos.parse_usi_move("P*5e").unwrap();
    assert_eq!(pos.do_move(&mut m), Err(ShogiError::Nifu));
    // 局面は変わっていない。
    assert_eq!(pos.sfen(true), "4k4/9/9/9/9/9/4P4/9/4K4 b P2r2b4g4s4n4l16p 1");
    // 他の筋には打てる。
    let mut m = pos.parse_usi_move("P*4e").unwrap();
    pos.do_move(&mut m).unwrap();
}

#[test]
fn test_drop_on_deadend_ranks_is_rejected() {
    let mut pos =
        Position::new("4k4/9/9/9/9/9/9/9/4K4 b NLP2r2b4g4s3n3l17p 1").unwrap();

    for usi in ["P*5a", "L*5a", "N*5a", "N*5b"] {
        let mut m = pos.parse_usi_move(usi).unwrap();
        match pos.do_move(&mut m) {
            Err(ShogiError::IllegalMove { .. }) => {}
            other => panic!("{}: expected IllegalMove, got {:?}", usi, other),
        }
    }

    let mut m = pos.parse_usi_move("N*5c").unwrap();
    pos.do_move(&mut m).unwrap();
}

#[test]
fn test_drop_on_occupied_cell_fails_at_parse() {
    let pos = Position::new("4k4/9/9/9/9/9/4P4/9/4K4 b P2r2b4g4s4n4l16p 1").unwrap();
    match pos.parse_usi_move("P*5g") {
        Err(ShogiError::IllegalMove { .. }) => {}
        other => panic!("expected IllegalMove, got {:?}", other),
    }
    match pos.parse_usi_move("x*5e") {
        Err(ShogiError::InvalidMoveSyntax { .. }) => {}
        other => panic!("expected InvalidMoveSyntax, got {:?}", other),
    }
}

#[test]
fn test_unresolved_check_rolls_back() {
    // 後手の飛に串刺しにされた先手玉。玉以外を動かすと王手放置になる。
    let mut pos =
        Position::new("4k4/9/4r4/9/9/9/9/4G4/4K4 b R2B3G4S4N4L18P 1").unwrap();
    let before = pos.sfen(true);
    // 5h の金を横に逃がすと玉が素通しになる。
    let mut m = pos.parse_usi_move("5h4h").unwrap();
    assert_eq!(pos.do_move(&mut m), Err(ShogiError::UnresolvedCheck));
    assert_eq!(pos.sfen(true), before);
    assert_eq!(m.legality(), Legality::Illegal);

    // キャッシュ済みの違法手は再検証せずに弾かれる。
    match pos.do_move(&mut m) {
        Err(ShogiError::IllegalMove { .. }) => {}
        other => panic!("expected IllegalMove, got {:?}", other),
    }
}

#[test]
fn test_fesa_impasse_points() {
    // 先手: 敵陣に玉 + 龍 2、馬 2、と金 8 (= 12 枚、28 点)。
    let sfen = "2+B+BK+R+R2/1+P+P+P+P+P+P+P+P/9/9/9/9/9/9/8k b 4g4s4n4l10p 1";
    let pos = Position::new(sfen).unwrap_or_else(|e| panic!("{}", e));
    assert!(pos.fesa_impasse_points());

    // と金を 1 枚減らすと 27 点になり、先手の基準(28 点)に届かない。
    let sfen = "2+B+BK+R+R2/1+P+P+P+P+P+P+P1/9/9/9/9/9/9/8k b 4g4s4n4l11p 1";
    let pos = Position::new(sfen).unwrap_or_else(|e| panic!("{}", e));
    assert!(!pos.fesa_impasse_points());
}

#[test]
fn test_western_move_str() {
    let pos = Position::initial();
    let m = pos.parse_usi_move("7g7f").unwrap();
    assert_eq!(pos.western_move_str(&m), "P-76");

    // ４九と６九の金はどちらも５八に利いているので移動元が付く。
    let m = pos.parse_usi_move("4i5h").unwrap();
    assert_eq!(pos.western_move_str(&m), "G49-58");

    let m = pos.parse_usi_move("6i5h").unwrap();
    assert_eq!(pos.western_move_str(&m), "G69-58");
}

#[test]
fn test_western_move_str_capture_and_promotion() {
    let mut pos = Position::initial();
    for usi in ["7g7f", "3c3d"] {
        let mut m = pos.parse_usi_move(usi).unwrap();
        pos.do_move(&mut m).unwrap();
    }
    // 角交換: 8h の角が 2b の角を取って成る。
    let m = pos.parse_usi_move("8h2b+").unwrap();
    assert_eq!(pos.western_move_str(&m), "Bx22+");

    // 成れるのに成らない場合は '=' が付く。
    let m = pos.parse_usi_move("8h2b").unwrap();
    assert_eq!(pos.western_move_str(&m), "Bx22=");
}

#[test]
fn test_kifu_diagram_contains_hands_and_side_marker() {
    let pos =
        Position::new("ln1g5/1ks3r2/1ppppsn2/pl3pp1p/9/P1+R5P/1PBPP1N2/1LK1GS1p1/LN1G5 w BGSP3p 72")
            .unwrap();
    let s = pos.kifu_str();
    assert!(s.starts_with("後手の持駒：歩三"));
    assert!(s.contains("先手の持駒：角　金　銀　歩"));
    assert!(s.ends_with("後手番\n"));
    assert!(s.contains("|v香"));
}
