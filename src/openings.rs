//! 戦型(序盤作戦)の認識。
//!
//! 3 段構えで判定する:
//!
//! 1. SFEN をキーとする索引(既知の局面の即答。NONE 番兵は
//!    「この局面は分類しない」の意味で、パターン照合の誤検出を抑える)。
//! 2. SFEN + 直前の指し手をキーとする索引。
//! 3. パターン認識器。
//!
//! 飛を振る戦型は最初の飛の移動先の筋から直接分類する。

use once_cell::sync::Lazy;

use crate::game::Game;
use crate::kifu::move_parse;
use crate::pattern::{
    adjacent_pawns, last_row_pieces, piece_cells as p, piece_count as n, PatternSource,
    PatternTag, PositionForPatternRecognition, Recognizer, RecognizerResult, SfenMap, TagSet,
};
use crate::shogi::{Side, GOTE};

/// 戦型。
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Opening {
    // 振り飛車
    OpposingRook,
    ThirdFileRook,
    ForthFileRook,
    GokigenCentralRook,
    DoubleSwingingRook,
    ForthThirdFileRookStrategy,
    QuickIshida,
    IshidaStyle,
    MasudasIshidaStyle,
    SakataOpposingRook,
    AmahikoOpposingRook,
    FujiiSystem,
    LeghornSpecial,
    // 居飛車
    SleeveRook,
    RightHandForthFileRook,
    RightHandKing,
    DoubleWingAttack,
    DoubleWingAttackClimbingSilver,
    UfoSilver,
    RecliningSilver,
    BishopExchange,
    OneTurnLossBishopExchange,
    BishopExchangeRecliningSilver,
    BishopExchangeClimbingSilver,
    SidePawnPicker,
    Bishop33Strategy,
    AonoStyle,
    YuukiStyle,
    Bishop45Strategy,
    MaruyamaVaccine,
    Silver37SuperRapid,
    SuperRapidAttack,
    UresinoStyle,
    PrimitiveClimbingSilver,
    IjimasBackBishopStrategy,
    SwingingRookSlowGameCountermeasure,
    SpearingTheBird,
    SilverHornedSnowRoof,
    ClimbingGold,
    // 内部でのみ使う
    None,
    SwingingRook,
}

/// 戦型の照合を打ち切る手数。
const OPENING_SWEEP_HORIZON: usize = 60;

/// 既知の局面の即答表。`Opening::None` は「分類しない」の番兵。
static OPENINGS_D: Lazy<SfenMap<Opening>> = Lazy::new(|| {
    SfenMap::new(&[
        (
            "lnsgkgsnl/1r5b1/pppppp1pp/6p2/2P6/9/PP1PPPPPP/1B5R1/LNSGKGSNL w - 4",
            Opening::QuickIshida,
        ),
        (
            "ln1g1gsnl/1r3k1b1/p1sppp1pp/2p3p2/1p2P4/2P6/PPBP1PPPP/3SRK3/LN1G1GSNL b - 15",
            Opening::Silver37SuperRapid,
        ),
        (
            "lnsgkgsnl/4r2+B1/pppp1p1pp/4p1p2/7P1/2P6/PP1PPPP1P/7R1/LNSGKGSNL w B 8",
            Opening::MaruyamaVaccine,
        ),
        (
            "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B1S3R1/LN1GKGSNL w - 2",
            Opening::UresinoStyle,
        ),
        (
            "lnsgk1snl/1r4gb1/p1ppppppp/9/1p5P1/9/PPPPPPP1P/1BG3SR1/LNS1KG1NL w - 8",
            Opening::DoubleWingAttack,
        ),
        (
            "ln1gk1snl/1rs3gb1/p1ppppppp/9/1p5P1/9/PPPPPPP1P/1BG3SR1/LNS1KG1NL b - 9",
            Opening::DoubleWingAttack,
        ),
        (
            "lnsgk1snl/1r4gb1/p1ppppppp/9/7P1/1p7/PPPPPPP1P/1BG3SR1/LNS1KG1NL b - 9",
            Opening::DoubleWingAttack,
        ),
        (
            "lnsgk1snl/6gb1/p1pppp2p/6R2/9/1rP6/P2PPPP1P/1BG6/LNS1KGSNL w 3P2p 16",
            Opening::SidePawnPicker,
        ),
        (
            "lnsgk1snl/6g2/p1ppppb1p/6R2/9/1rP6/P2PPPP1P/1BG6/LNS1KGSNL b 3P2p 17",
            Opening::Bishop33Strategy,
        ),
        (
            "ln1gk1snl/3s2g2/p1ppppb1p/6R2/9/1rP3P2/P2PPP2P/1BG1K4/LNS2GSNL w 3P2p 20",
            Opening::AonoStyle,
        ),
        (
            "lnsgk2nl/6gs1/p1ppppb1p/6R2/9/1rP3P2/P2PPP2P/1BG1K4/LNS2GSNL w 3P2p 20",
            Opening::AonoStyle,
        ),
        (
            "lnsg2snl/4k1g2/p1ppppb1p/6R2/9/1rP3P2/P2PPP2P/1BG1K4/LNS2GSNL w 3P2p 20",
            Opening::AonoStyle,
        ),
        (
            "lnsgk1snl/6g2/p1ppppb1p/6R2/9/1rP6/P2PPPP1P/1BGK5/LNS2GSNL w 3P2p 18",
            Opening::YuukiStyle,
        ),
        // 角道を止めない飛先交換は角換わりとは分類しない。
        (
            "lnsgkgsnl/1r5+B1/pppppp1pp/6p2/9/2P6/PP1PPPPPP/7R1/LNSGKGSNL w B 4",
            Opening::None,
        ),
    ])
});

/// 既知の「局面 + 指し手」の即答表。
static OPENINGS_POS_AND_MOVE_D: Lazy<SfenMap<Opening>> = Lazy::new(|| {
    SfenMap::new(&[
        (
            "lnsgk1snl/1r4g2/p1pppp1pp/6p2/1p5P1/2P6/PPSPPPP1P/7R1/LN1GKGSNL w Bb 12 8h7g",
            Opening::BishopExchange,
        ),
        (
            "lnsgkgsnl/1r5b1/pppppp1pp/6p2/9/4P4/PPPP1PPPP/1B2R4/LNSGKGSNL w - 4 2h5h",
            Opening::GokigenCentralRook,
        ),
        (
            "lnsgk1snl/6g2/p1pppp2p/6R2/5b3/1rP6/P2PPPP1P/1SG4S1/LN2KG1NL b B4Pp 21 B*4e",
            Opening::Bishop45Strategy,
        ),
        (
            "lnsgk1snl/6gb1/p1pppp2p/6pR1/9/P1r6/3PPPP1P/1BG6/LNS1KGSNL b 2P3p 17 8f7f",
            Opening::SidePawnPicker,
        ),
        (
            "lnsgk1snl/6gb1/p1pppp2p/6pR1/9/P1r6/2BPPPP1P/2G6/LNS1KGSNL w 2P3p 18 8h7g",
            Opening::Bishop33Strategy,
        ),
        (
            "lnsgk1snl/1r4gb1/p1ppppppp/7P1/1p7/9/PPPPPPP1P/1BG4R1/LNS1KGSNL w - 8 2e2d",
            Opening::DoubleWingAttack,
        ),
        (
            "ln1gk1snl/1rs3gb1/p1pppppp1/8p/1p7/9/PPPPPPPSP/1BG4R1/LNS1KG1NL w P 16 3h2g",
            Opening::DoubleWingAttackClimbingSilver,
        ),
        (
            "lnsgkgsnl/4r4/pppp1pb1p/6pR1/9/2P1P4/PP1P1PP1P/1S2G4/LN1GK1SNL b B2Pp 17 B*3c",
            Opening::SuperRapidAttack,
        ),
        (
            "lnsgkgs+Rl/4r4/pppp1pb1p/6p2/9/2P1P4/PP1P1PP1P/1S2G4/LN1GK1SNL w BN2Pp 18 2d2a+",
            Opening::SuperRapidAttack,
        ),
    ])
});

type Entry = (Vec<PatternSource>, PatternTag<Opening>);

fn lib() -> Vec<Entry> {
    use Opening::*;
    use PatternTag::Terminal;

    let cat = |mut a: Vec<PatternSource>, b: Vec<PatternSource>| {
        a.extend(b);
        a
    };

    vec![
        (
            vec![
                p("K", "48"),
                p("G", "58"),
                p("S", "47"),
                p("N", "37"),
                p("L", "19"),
                p("R", "29"),
                p("P", "46"),
                p("P", "36"),
                p("P", "56,57"),
                p("P", "25,26"),
                p("P", "16,17"),
            ],
            Terminal(RightHandKing),
        ),
        (
            cat(
                cat(
                    vec![
                        p("S", "27"),
                        p("to", "27"),
                        p("P", "25,26"),
                        p("B", "88"),
                        p("R", "28"),
                        p("P", "76,77"),
                    ],
                    last_row_pieces("3"),
                ),
                adjacent_pawns(7, 1, 10, &[2, 7]),
            ),
            Terminal(PrimitiveClimbingSilver),
        ),
        (
            cat(
                cat(
                    vec![
                        p("S", "37"),
                        p("to", "37"),
                        p("P", "25,26"),
                        p("B", "88"),
                        p("R", "28"),
                        p("P", "36"),
                        p("P", "76,77"),
                        p("G", "78"),
                    ],
                    last_row_pieces("36"),
                ),
                adjacent_pawns(7, 1, 10, &[2, 3, 7]),
            ),
            Terminal(PrimitiveClimbingSilver),
        ),
        (
            cat(
                cat(
                    vec![
                        p("R", "58"),
                        p("to", "58"),
                        p("P", "55,56"),
                        p("P", "76"),
                        p("B", "77,88"),
                    ],
                    last_row_pieces(""),
                ),
                adjacent_pawns(7, 2, 9, &[5, 7]),
            ),
            Terminal(GokigenCentralRook),
        ),
        (
            vec![
                p("to", "56"),
                p("S", "56"),
                p("P", "46"),
                p("P", "67"),
                p("P", "57"),
                p("R", "25,26,27,28,29"),
                p("r", "81,82,83,84,85"),
                n("B", 1),
                n("b", 1),
                p("P", "36"),
                p("N", "29,37"),
                p("G", "48,58"),
            ],
            Terminal(BishopExchangeRecliningSilver),
        ),
        (
            vec![
                p("to", "56"),
                p("S", "56"),
                p("P", "46"),
                p("P", "67"),
                p("P", "57"),
                p("R", "26,28"),
                n("B", 0),
                n("b", 0),
                p("P", "36"),
                p("N", "37"),
                p("P", "76"),
                p("G", "78"),
            ],
            Terminal(RecliningSilver),
        ),
        (
            cat(
                vec![
                    p("B", "79"),
                    p("K", "59"),
                    p("S", "78"),
                    p("P", "56"),
                    p("R", "28"),
                    p("!r", "82"),
                    p("P", "25,26"),
                    p("P", "96,97"),
                    p("P", "16,17"),
                    p("L", "19"),
                    p("L", "99"),
                    p("N", "29"),
                    p("N", "89"),
                    p("S", "39,48"),
                    p("G", "69"),
                    p("G", "58,69"),
                ],
                adjacent_pawns(7, 3, 9, &[5]),
            ),
            Terminal(IjimasBackBishopStrategy),
        ),
        (
            cat(
                cat(
                    vec![
                        p("G", "77"),
                        p("R", "88"),
                        p("P", "76"),
                        p("P", "26,27"),
                        p("to", "88"),
                        // 角交換が成立している。
                        n("B", 1),
                        n("b", 1),
                        p("P", "96,97"),
                        p("P", "16,17"),
                    ],
                    last_row_pieces("6"),
                ),
                adjacent_pawns(7, 3, 9, &[7]),
            ),
            Terminal(SakataOpposingRook),
        ),
        (
            vec![
                p("S", "77"),
                p("R", "28"),
                n("B", 1),
                n("b", 1),
                p("P", "76"),
                p("P", "67"),
                p("K", "59"),
                p("L", "99"),
                p("L", "19"),
                p("N", "29"),
                p("N", "89"),
                p("from", "68,88"),
                p("to", "77"),
                p("G", "78"),
                n("max-gold-moves", 2),
            ],
            Terminal(BishopExchange),
        ),
        (
            vec![
                p("S", "26"),
                p("from", "27"),
                p("to", "26"),
                p("P", "25"),
                p("R", "28"),
                p("P", "37"),
                n("B", 1),
                n("b", 1),
            ],
            Terminal(BishopExchangeClimbingSilver),
        ),
        (
            cat(
                vec![
                    p("B", "77"),
                    p("from", "88"),
                    p("to", "77"),
                    p("K", "78"),
                    p("G", "58,67"),
                    p("P", "87"),
                    p("P", "76"),
                    p("P", "66,67"),
                    p("P", "56"),
                    p("S", "48,57"),
                    p("R", "28"),
                    p("!p", "43"),
                ],
                last_row_pieces("2345"),
            ),
            Terminal(SwingingRookSlowGameCountermeasure),
        ),
        (
            cat(
                cat(
                    vec![
                        p("B", "66"),
                        p("R", "88"),
                        p("to", "88"),
                        p("S", "77"),
                        p("P", "76"),
                    ],
                    last_row_pieces("7"),
                ),
                adjacent_pawns(7, 2, 9, &[7]),
            ),
            Terminal(AmahikoOpposingRook),
        ),
        (
            cat(
                cat(
                    vec![
                        p("B", "79"),
                        p("K", "78"),
                        p("S", "57"),
                        p("R", "28"),
                        p("P", "56"),
                        p("P", "67"),
                        p("P", "47"),
                        p("P", "25"),
                    ],
                    last_row_pieces("357"),
                ),
                adjacent_pawns(7, 3, 9, &[5]),
            ),
            Terminal(SpearingTheBird),
        ),
        (
            cat(
                vec![
                    p("P", "36"),
                    p("to", "36"),
                    p("R", "68"),
                    p("S", "38"),
                    p("S", "67,78"),
                    p("G", "58,69"),
                    p("B", "77"),
                    p("P", "76"),
                    p("P", "66,67"),
                    p("P", "57"),
                    p("P", "87"),
                    p("P", "27"),
                    p("P", "15,16"),
                ],
                last_row_pieces("367"),
            ),
            Terminal(FujiiSystem),
        ),
        (
            cat(
                vec![
                    p("P", "46"),
                    p("to", "46"),
                    p("R", "68"),
                    p("S", "38"),
                    p("S", "67,78"),
                    p("G", "58,69"),
                    p("B", "77"),
                    p("P", "76"),
                    p("P", "66,67"),
                    p("P", "57"),
                    p("P", "87"),
                    p("P", "27"),
                    p("P", "15,16"),
                ],
                last_row_pieces("367"),
            ),
            Terminal(FujiiSystem),
        ),
        (
            vec![
                p("K", "69"),
                p("G", "78"),
                p("G", "58"),
                p("S", "67"),
                p("S", "47"),
                p("to", "47"),
                p("P", "76"),
                p("P", "66"),
                p("P", "56,57"),
                p("P", "46"),
                p("N", "89"),
                p("L", "99"),
                p("N", "29,37"),
                p("L", "19"),
                p("B", "77,88"),
            ],
            Terminal(SilverHornedSnowRoof),
        ),
        (
            cat(
                cat(
                    vec![
                        p("P", "75"),
                        p("R", "78"),
                        p("to", "78"),
                        p("from", "28"),
                        p("B", "88"),
                        p("p", "34"),
                    ],
                    last_row_pieces(""),
                ),
                adjacent_pawns(7, 1, 10, &[7]),
            ),
            Terminal(QuickIshida),
        ),
        (
            cat(
                cat(
                    vec![
                        p("K", "48"),
                        p("to", "48"),
                        p("R", "78"),
                        p("P", "75"),
                        p("B", "88"),
                        p("r", "82"),
                        p("p", "34"),
                    ],
                    last_row_pieces("5"),
                ),
                adjacent_pawns(7, 1, 10, &[7]),
            ),
            Terminal(MasudasIshidaStyle),
        ),
        (
            vec![
                p("R", "76"),
                p("N", "77"),
                p("to", "77"),
                p("P", "66"),
                p("P", "75"),
                p("P", "87"),
                p("B", "88,97"),
                p("P", "96,97"),
                p("L", "99"),
            ],
            Terminal(IshidaStyle),
        ),
        (
            vec![
                p("G", "27"),
                p("to", "27"),
                p("from", "38"),
                p("P", "25,26"),
                p("R", "28"),
                p("P", "37"),
                p("p", "35"),
                p("N", "29"),
                p("L", "19"),
            ],
            Terminal(ClimbingGold),
        ),
        (
            cat(
                cat(
                    vec![
                        p("HORSE", "22"),
                        p("to", "22"),
                        p("from", "88"),
                        n("side", -1),
                        p("R", "28"),
                        p("G", "69,78"),
                        p("P", "76"),
                    ],
                    adjacent_pawns(7, 3, 7, &[]),
                ),
                last_row_pieces("6"),
            ),
            Terminal(OneTurnLossBishopExchange),
        ),
        (
            cat(
                cat(
                    vec![
                        p("R", "68"),
                        p("to", "68"),
                        p("from", "28"),
                        n("B", 1),
                        n("b", 1),
                        p("S", "77"),
                    ],
                    last_row_pieces("7"),
                ),
                adjacent_pawns(7, 2, 9, &[7]),
            ),
            Terminal(LeghornSpecial),
        ),
        (
            cat(
                cat(
                    vec![
                        p("S", "36"),
                        p("to", "36"),
                        p("from", "27"),
                        p("R", "28"),
                        p("G", "78"),
                        p(" ", "25"),
                        p(" ", "24"),
                    ],
                    last_row_pieces("36"),
                ),
                adjacent_pawns(7, 3, 7, &[]),
            ),
            Terminal(UfoSilver),
        ),
        (
            cat(
                cat(
                    vec![
                        p("R", "78"),
                        p("from", "68"),
                        p("to", "78"),
                        p("P", "75"),
                        p("K", "38"),
                        p("B", "88"),
                    ],
                    last_row_pieces("5"),
                ),
                adjacent_pawns(7, 2, 9, &[7]),
            ),
            Terminal(ForthThirdFileRookStrategy),
        ),
    ]
}

/// 戦型の認識器を作る。対局ごとに作り直してよい。
pub fn opening_recognizer() -> Recognizer<Opening> {
    Recognizer::new(lib(), "openings")
}

/// 現局面の戦型を認識する。索引を先に引き、パターン照合は最後。
pub fn position_find_opening(
    rec: &mut Recognizer<Opening>,
    pos: &mut PositionForPatternRecognition,
) -> Option<Opening> {
    if let Some(ot) = OPENINGS_D.get(pos) {
        // NONE 番兵はこの局面を分類しない指示。パターン照合にも回さない。
        return (ot != Opening::None).then_some(ot);
    }
    if let Some(m) = pos.last_move() {
        if let Some(ot) = OPENINGS_POS_AND_MOVE_D.get_with_move(pos, m) {
            return Some(ot);
        }
    }
    rec.find(pos)
}

/// 飛をまだ振っていないうちに付きうる戦型。これしか無ければ
/// 「ほぼ空」とみなして飛の移動先から単独戦型を確定させる。
const BEFORE_ROOK_OPENINGS: [Opening; 2] =
    [Opening::UresinoStyle, Opening::PrimitiveClimbingSilver];

/// 最初の飛の移動先の筋(指す側から見た 1 始まり)から戦型を分類する。
fn update_openings_by_rooks(
    move_no: u32,
    col: u8,
    side: Side,
    res: &mut RecognizerResult<Opening>,
) {
    let opp_swinging = res.side(side.inv()).contains(Opening::SwingingRook);
    let my = res.side_mut(side);

    if col < 5 && opp_swinging {
        my.insert(Opening::DoubleSwingingRook, move_no);
        return;
    }

    let almost_empty = my.is_subset_of(&BEFORE_ROOK_OPENINGS);
    match col {
        2 => {
            if almost_empty {
                my.insert(Opening::OpposingRook, move_no);
            }
            my.insert(Opening::SwingingRook, move_no);
        }
        3 => {
            // 早石田は三間飛車とは区別する。
            if almost_empty {
                my.insert(Opening::ThirdFileRook, move_no);
            }
            my.insert(Opening::SwingingRook, move_no);
        }
        4 => {
            if almost_empty {
                my.insert(Opening::ForthFileRook, move_no);
            }
            my.insert(Opening::SwingingRook, move_no);
        }
        5 => {
            my.insert(Opening::SwingingRook, move_no);
        }
        6 => {
            if almost_empty {
                my.insert(Opening::RightHandForthFileRook, move_no);
            }
        }
        7 => {
            if almost_empty && move_no <= 5 {
                my.insert(Opening::SleeveRook, move_no);
            }
        }
        _ => {}
    }
}

/// 包含される冗長なタグを取り除く。
fn remove_redundant(s: &mut TagSet<Opening>) {
    s.remove(Opening::SwingingRook);
    if s.contains(Opening::SakataOpposingRook) {
        s.remove(Opening::BishopExchange);
        s.remove(Opening::OpposingRook);
    }
    if s.contains(Opening::AmahikoOpposingRook) {
        s.remove(Opening::OpposingRook);
    }
    if s.contains(Opening::PrimitiveClimbingSilver) {
        s.remove(Opening::RightHandForthFileRook);
    }
    if s.contains(Opening::LeghornSpecial) {
        s.remove(Opening::ForthFileRook);
    }
    if s.contains(Opening::QuickIshida) {
        s.remove(Opening::ThirdFileRook);
    }
}

/// 対局中に現れた戦型を両陣営について検出する。
///
/// 平手初期局面から始まった対局のみが対象。開始局面が指定されている
/// 対局では空の結果を返す。
pub fn game_find_openings(g: &Game) -> RecognizerResult<Opening> {
    let mut res = RecognizerResult::default();
    if g.start_pos.is_some() {
        log::debug!("opening recognition skipped: game has an explicit start position");
        return res;
    }

    // 後手の 2 手目４二銀は嬉野流。
    if g.moves.len() >= 2 {
        if let Some(uresino) = move_parse("４二銀(31)", GOTE, None) {
            if g.moves[1] == uresino {
                res.gote.insert(Opening::UresinoStyle, 2);
            }
        }
    }

    let mut rec = opening_recognizer();
    let mut pos = PositionForPatternRecognition::new();
    for m in g.moves.iter().take(OPENING_SWEEP_HORIZON) {
        if let Some(col) = pos.first_rook_move_file(m) {
            let side = pos.side_to_move();
            update_openings_by_rooks(pos.move_no(), col, side, &mut res);
        }
        if pos.do_move(m.clone()).is_err() {
            break;
        }
        if !pos.is_opening(0) {
            log::debug!("out of opening: {}", pos.sfen_cached());
            break;
        }
        if let Some(ot) = position_find_opening(&mut rec, &mut pos) {
            let side = pos.side_to_move().inv();
            res.side_mut(side).insert(ot, pos.move_no() - 1);
        }
    }

    remove_redundant(&mut res.sente);
    remove_redundant(&mut res.gote);
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_of(moves: &[&str]) -> Game {
        let mut g = Game::new(None).unwrap();
        for s in moves {
            g.do_usi_move(s).unwrap();
        }
        g
    }

    #[test]
    fn test_forth_file_rook_by_first_rook_move() {
        // 先手が 3 手目に飛を６八(自陣視点の４筋)へ振る。
        let g = game_of(&["7g7f", "3c3d", "2h6h", "8c8d"]);
        let res = game_find_openings(&g);
        assert!(res.sente.contains(Opening::ForthFileRook));
        // SWINGING_ROOK は冗長タグとして最終結果から取り除かれる。
        assert!(!res.sente.contains(Opening::SwingingRook));
        assert_eq!(res.sente.first_move_no(Opening::ForthFileRook), Some(3));
    }

    #[test]
    fn test_double_swinging_rook() {
        let g = game_of(&["7g7f", "3c3d", "2h6h", "8b4b"]);
        let res = game_find_openings(&g);
        assert!(res.sente.contains(Opening::ForthFileRook));
        assert!(res.gote.contains(Opening::DoubleSwingingRook));
    }

    #[test]
    fn test_uresino_by_second_move() {
        let g = game_of(&["7g7f", "3a4b"]);
        let res = game_find_openings(&g);
        assert!(res.gote.contains(Opening::UresinoStyle));
    }

    #[test]
    fn test_quick_ishida_sfen_lookup() {
        // 7g7f 3c3d 7f7g? — 早石田の既知局面: 2六歩を省く 7六歩 3四歩 7五歩? の形。
        let g = game_of(&["2g2f", "3c3d", "2f2e"]);
        // 既知局面ではないので何も認識されないだけで、パニックしないこと。
        let _ = game_find_openings(&g);

        let g = game_of(&["7g7f", "3c3d", "7f7e"]);
        let res = game_find_openings(&g);
        assert!(res.sente.contains(Opening::QuickIshida));
    }

    #[test]
    fn test_explicit_start_pos_disables_recognition() {
        let mut g = Game::new(Some(
            "lnsgkgsnl/1r5b1/ppppppppp/9/9/2P6/PP1PPPPPP/1B5R1/LNSGKGSNL w - 2",
        ))
        .unwrap();
        g.do_usi_move("3c3d").unwrap();
        let res = game_find_openings(&g);
        assert!(res.sente.is_empty());
        assert!(res.gote.is_empty());
    }
}
