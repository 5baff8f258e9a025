use std::time::Duration;

#[allow(unused_imports)]
use pretty_assertions::{assert_eq, assert_ne};

use shogidb::*;

fn assert_games_equal(a: &Game, b: &Game) {
    assert_eq!(a.tags(), b.tags());
    assert_eq!(a.moves, b.moves);
    assert_eq!(a.result(), b.result());
    assert_eq!(a.start_pos, b.start_pos);
}

#[test]
fn test_parse_simple_kif() {
    let text = "\
#KIF version=2.0 encoding=UTF-8
開始日時：2023/01/15 19:00
場所：81Dojo
手合割：平手
先手：sakura(1850)
後手：tsubaki(1912)
手数----指手---------消費時間--
   1 ７六歩(77)   ( 0:02/00:00:02)
   2 ３四歩(33)   ( 0:01/00:00:01)
*角交換を拒否しない方針。
   3 ２六歩(27)   ( 0:03/00:00:05)
   4 ８八角成(22)   ( 0:02/00:00:03)
   5 同　銀(79)   ( 0:01/00:00:06)
   6 投了
";
    let g = game_parse(text).unwrap();

    assert_eq!(g.get_tag("start_date"), Some("2023/01/15 19:00"));
    assert_eq!(g.get_tag("location"), Some("81Dojo"));
    assert_eq!(g.get_tag("sente"), Some("sakura"));
    assert_eq!(g.get_tag("sente_rating"), Some("1850"));
    assert_eq!(g.get_tag("gote"), Some("tsubaki"));
    assert_eq!(g.get_tag("gote_rating"), Some("1912"));

    assert_eq!(g.moves.len(), 5);
    assert_eq!(g.moves[0].usi_str(), "7g7f");
    assert_eq!(g.moves[3].usi_str(), "2b8h+");
    assert_eq!(g.moves[4].usi_str(), "7i8h");
    assert_eq!(g.moves[2].time, Some(Duration::from_secs(3)));
    assert_eq!(g.moves[2].cum_time, Some(Duration::from_secs(5)));

    assert_eq!(g.comments_before_move(3), ["角交換を拒否しない方針。"]);

    assert_eq!(g.result(), Some(GameResult::Resignation));
    // 5 手指した後の手番は後手。投了したのは後手なので先手の勝ち。
    assert_eq!(g.sente_points(), Some(1));
    assert_eq!(g.text_result(), Some("1-0"));
}

#[test]
fn test_kif_roundtrip() {
    let mut g = Game::new(None).unwrap();
    g.set_tag("start_date", "2023/01/15 19:00");
    g.set_tag("event", "rated game");
    g.parse_player_name("sakura(1850)", "sente");
    g.parse_player_name("tsubaki", "gote");
    g.append_comment_before_move(1, "対局開始。");

    for (i, usi) in ["7g7f", "3c3d", "8h2b+", "3a2b", "B*4e"].iter().enumerate() {
        let mut m = g.pos.parse_usi_move(usi).unwrap();
        m.time = Some(Duration::from_secs(i as u64 + 1));
        m.cum_time = Some(Duration::from_secs(((i / 2) as u64 + 1) * 3));
        g.do_move(m);
    }
    g.set_result(GameResult::Time);

    let text = game_write(&g);
    let g2 = game_parse(&text).unwrap_or_else(|e| panic!("{}\n---\n{}", e, text));
    assert_games_equal(&g, &g2);
    for (a, b) in g.moves.iter().zip(&g2.moves) {
        assert_eq!(a.time, b.time);
        assert_eq!(a.cum_time, b.cum_time);
    }

    // ライターは決定的。
    assert_eq!(game_write(&g2), text);
}

#[test]
fn test_kif_roundtrip_with_diagram_start_position() {
    let start = "4k4/9/9/9/9/9/9/9/4K4 b Rr2b4g4s4n4l18p 1";
    let mut g = Game::new(Some(start)).unwrap();
    g.parse_player_name("sakura", "sente");
    for usi in ["R*5e", "5a4a"] {
        g.do_usi_move(usi).unwrap();
    }

    let text = game_write(&g);
    // 開始局面は盤面図として書き出される。
    assert!(text.contains("後手の持駒：飛　角二　金四　銀四　桂四　香四　歩十八"));
    assert!(text.contains("先手の持駒：飛"));

    let g2 = game_parse(&text).unwrap_or_else(|e| panic!("{}\n---\n{}", e, text));
    assert_games_equal(&g, &g2);
}

#[test]
fn test_kif_with_terminal_illegal_move() {
    // 二歩を含む棋譜は反則負けとして読み込まれ、違法手自体は残らない。
    let text = "\
手合割：平手
手数----指手---------消費時間--
   1 ７六歩(77)
   2 ３四歩(33)
   3 ７五歩(76)
   4 ８八角成(22)
   5 ７六歩打
";
    let g = game_parse(text).unwrap();
    assert_eq!(g.result(), Some(GameResult::IllegalMove));
    assert_eq!(g.moves.len(), 4);
    assert_eq!(g.sente_points(), Some(-1));
}

#[test]
fn test_kif_every_result_word_roundtrips() {
    for result in GameResult::ALL {
        let mut g = Game::new(None).unwrap();
        for usi in ["7g7f", "3c3d"] {
            g.do_usi_move(usi).unwrap();
        }
        g.set_result(result);
        let g2 = game_parse(&game_write(&g)).unwrap();
        assert_eq!(g2.result(), Some(result));
    }
}

#[test]
fn test_unparsable_kif_is_an_error() {
    assert!(game_parse("ただのテキスト").is_err());
    let text = "\
手合割：平手
手数----指手---------消費時間--
   1 ７六飛(77)
";
    // 駒の種類が盤面と食い違う手は違法手として記録される(構文としては正しい)。
    let g = game_parse(text).unwrap();
    assert_eq!(g.result(), Some(GameResult::IllegalMove));

    let text = "\
手合割：平手
手数----指手---------消費時間--
   1 ７六成金(77)
";
    // 「成金」という駒は存在しないので構文エラー。
    assert!(game_parse(text).is_err());
}
