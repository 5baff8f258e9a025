//! 囲いの認識。
//!
//! パターン集は先手視点で記述してあり、認識器が両陣営に適用する。
//! 片半美濃は美濃囲いのパターンの部分集合なので、必ず美濃囲いの後に
//! 並べること(認識器は記述順に照合する)。

use crate::game::Game;
use crate::error::ShogiError;
use crate::pattern::{
    adjacent_pawns, base_pattern as base, piece_cells as p, PatternSource, PatternTag,
    PositionForPatternRecognition, Recognizer, RecognizerResult,
};

/// 囲い。
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Castle {
    // 居飛車
    BoatCastle,
    LeftHandMino,
    StaticRookAnaguma,
    SilverCrownAnaguma,
    MilleniumCastle,
    GirlInTheHouse,
    YaguraCastle,
    SilverYagura,
    HalfYagura,
    CompleteYagura,
    YaguraAnaguma,
    KikusuiYagura,
    SilverStandingYagura,
    DiamondYagura,
    RapidCastle,
    DoiYagura,
    CrabCastle,
    ElmoCastle,
    BonanzaCastle,
    EdgeKingSilverCrown,
    KushikatsuCastle,
    // 相居飛車
    SnowRoofCastle,
    StrawberryCastle,
    // 振り飛車
    CastleTowerMino,
    TopknotMino,
    HalfMinoCastle,
    HighMinoCastle,
    MinoCastle,
    SilverCrown,
    KimuraMino,
    DiamondMino,
    GoldMino,
    PeerlessGolds,
    SwingingRookAnaguma,
    SilverMino,
}

/// 囲いの照合を打ち切る手数。
const CASTLE_SWEEP_HORIZON: usize = 50;

type Entry = (Vec<PatternSource>, PatternTag<Castle>);

fn lib() -> Vec<Entry> {
    use Castle::*;
    use PatternTag::{Base, Terminal};

    let mut v: Vec<Entry> = Vec::new();

    // 銀冠の土台と変化形。
    v.push((
        vec![
            p("K", "28"),
            p("S", "27"),
            p("G", "38"),
            p("L", "19"),
            p("P", "26"),
            p("P", "16,17"),
        ],
        Base("SILVER_CROWN"),
    ));
    v.push((
        vec![
            base("SILVER_CROWN"),
            p("N", "29"),
            p("P", "46,47"),
            p("P", "37"),
        ],
        Terminal(SilverCrown),
    ));
    v.push((
        vec![base("SILVER_CROWN"), p("N", "37"), p("P", "46"), p("P", "36")],
        Terminal(SilverCrown),
    ));
    v.push((
        vec![
            p("K", "88"),
            p("S", "87"),
            p("G", "78"),
            p("P", "86"),
            p("P", "76"),
            p("P", "66,67"),
            p("L", "99"),
            p("N", "89"),
            p("P", "95,96,97"),
        ],
        Terminal(SilverCrown),
    ));
    v.push((
        vec![
            p("K", "98"),
            p("S", "87"),
            p("G", "78"),
            p("to", "78"),
            p("N", "89"),
            p("L", "99"),
            p("P", "96,97"),
            p("P", "86"),
            p("P", "76"),
            p("G", "49,58,67,68"),
        ],
        Terminal(EdgeKingSilverCrown),
    ));
    v.push((
        {
            let mut s = vec![
                p("K", "99"),
                p("S", "87"),
                p("G", "78"),
                p("L", "98"),
                p("N", "89"),
                p("P", "96,97"),
            ];
            s.extend(adjacent_pawns(6, 6, 9, &[]));
            s
        },
        Terminal(SilverCrownAnaguma),
    ));
    v.push((
        vec![
            p("S", "47"),
            p("G", "58"),
            p("G", "49"),
            p("S", "38"),
            p("K", "28"),
            p("N", "29"),
            p("L", "19"),
            p("P", "46"),
            p("P", "36"),
            p("P", "27"),
            p("P", "16,17"),
        ],
        Terminal(DiamondMino),
    ));

    // 高美濃の土台と変化形。
    v.push((
        vec![
            p("G", "47"),
            p("to", "47"),
            p("K", "28"),
            p("S", "38"),
            p("G", "49"),
            p("L", "19"),
            p("P", "46"),
            p("P", "15,16,17"),
        ],
        Base("HIGH_MINO"),
    ));
    v.push((
        vec![base("HIGH_MINO"), p("P", "37"), p("P", "27"), p("N", "29")],
        Terminal(HighMinoCastle),
    ));
    v.push((
        vec![base("HIGH_MINO"), p("P", "36"), p("P", "27"), p("N", "37")],
        Terminal(HighMinoCastle),
    ));
    v.push((
        vec![base("HIGH_MINO"), p("P", "36"), p("P", "26"), p("N", "29")],
        Terminal(HighMinoCastle),
    ));
    v.push((
        vec![
            p("K", "28"),
            p("S", "38"),
            p("S", "47"),
            p("G", "49"),
            p(" ", "48"),
            p("!G", "58"),
            p("N", "29"),
            p("L", "19"),
            p("P", "46"),
            p("P", "37"),
            p("P", "27"),
            p("P", "15,16,17"),
        ],
        Terminal(SilverMino),
    ));
    v.push((
        vec![
            p("K", "28"),
            p("S", "38"),
            p("G", "49"),
            p("L", "19"),
            p("P", "37"),
            p("P", "26"),
            p("P", "15,16,17"),
        ],
        Terminal(TopknotMino),
    ));

    // 銀冠風の壁囲い(居飛車側)。
    v.push((
        vec![
            p("K", "87"),
            p("S", "78"),
            p("G", "69"),
            p("N", "89"),
            p("L", "99"),
            p("P", "76"),
            p("P", "86"),
            p("P", "95,96,97"),
        ],
        Base("TOWER_MINO"),
    ));
    v.push((vec![base("TOWER_MINO"), p("P", "67")], Terminal(CastleTowerMino)));
    v.push((
        vec![base("TOWER_MINO"), p("G", "67"), p("P", "66")],
        Terminal(CastleTowerMino),
    ));

    v.push((
        vec![
            p("K", "78"),
            p("S", "79"),
            p("G", "69"),
            p("G", "58"),
            p("S", "48"),
            p("B", "88"),
            p("N", "89"),
            p("L", "99"),
            p("P", "56,57"),
            p("P", "67"),
            p("P", "76"),
            p("P", "87"),
            p("P", "95,96,97"),
        ],
        Terminal(BoatCastle),
    ));

    // 木村美濃。
    v.push((
        vec![
            p("K", "28"),
            p("G", "38"),
            p("S", "47"),
            p("L", "19"),
            p("P", "27"),
            p("P", "16,17"),
            p("!S", "46"),
        ],
        Base("KIMURA_MINO"),
    ));
    v.push((
        vec![base("KIMURA_MINO"), p("N", "29"), p("P", "37")],
        Terminal(KimuraMino),
    ));
    v.push((
        vec![base("KIMURA_MINO"), p("N", "37"), p("P", "36")],
        Terminal(KimuraMino),
    ));

    v.push((
        vec![
            p("K", "28,39"),
            p("S", "38"),
            p("G", "49"),
            p("N", "29"),
            p("L", "19"),
            p("G", "58"),
            p("P", "46,47"),
            p("P", "36,37"),
            p("P", "27"),
            p("P", "15,16,17"),
        ],
        Terminal(MinoCastle),
    ));
    v.push((
        vec![
            p("K", "28"),
            p("G", "38"),
            p("S", "48"),
            p("N", "29"),
            p("L", "19"),
            p("P", "37"),
            p("P", "27"),
            p("P", "15,16,17"),
        ],
        Terminal(GoldMino),
    ));
    v.push((
        vec![
            p("K", "28,39"),
            p("S", "38"),
            p("G", "49"),
            p("N", "29"),
            p("L", "19"),
            p("!G", "58"),
            p("!S", "58"),
            p("P", "47"),
            p("P", "37"),
            p("P", "27"),
            p("P", "15,16,17"),
        ],
        Terminal(HalfMinoCastle),
    ));
    v.push((
        vec![
            p("K", "38"),
            p("G", "48"),
            p("G", "58"),
            p("S", "28,39"),
            p("N", "29"),
            p("L", "19"),
            p("P", "27"),
            p("P", "37"),
            p("P", "47"),
            p("P", "15,16,17"),
        ],
        Terminal(PeerlessGolds),
    ));
    v.push((
        vec![
            p("K", "19"),
            p("S", "28"),
            p("G", "39,49"),
            p("L", "18"),
            p("N", "29"),
            p("P", "27"),
            p("P", "16,17"),
        ],
        Terminal(SwingingRookAnaguma),
    ));

    // 居飛車穴熊。
    v.push((
        vec![
            p("K", "99"),
            p("S", "88"),
            p("L", "98"),
            p("N", "89"),
            p("P", "86,87"),
            p("P", "96,97"),
        ],
        Base("STATIC_ROOK_ANAGUMA"),
    ));
    v.push((
        vec![
            base("STATIC_ROOK_ANAGUMA"),
            p("G", "69,78,87"),
            p("to", "88"),
        ],
        Terminal(StaticRookAnaguma),
    ));
    v.push((
        vec![base("STATIC_ROOK_ANAGUMA"), p("G", "79"), p("G", "78")],
        Terminal(StaticRookAnaguma),
    ));

    v.push((
        vec![
            p("K", "88"),
            p("S", "78"),
            p("G", "69"),
            p("G", "58,67"),
            p("L", "99"),
            p("N", "89"),
            p("P", "87"),
            p("P", "76,77"),
            p("P", "66,67"),
            p("P", "95,96,97"),
        ],
        Terminal(LeftHandMino),
    ));
    v.push((
        vec![
            p("K", "68"),
            p("G", "58"),
            p("G", "78"),
            p("B", "88"),
            p("S", "79"),
            p("N", "89"),
            p("L", "99"),
            p("P", "96,97"),
            p("P", "87"),
            p("P", "76"),
            p("P", "67"),
            p("P", "57"),
        ],
        Terminal(StrawberryCastle),
    ));
    v.push((
        vec![
            p("K", "89"),
            p("G", "79"),
            p("S", "88"),
            p("N", "77"),
            p("P", "87"),
            p("P", "76"),
            p("P", "67"),
            p("P", "96,97"),
            p("L", "99"),
        ],
        Terminal(MilleniumCastle),
    ));
    v.push((
        vec![
            p("K", "69"),
            p("G", "78"),
            p("G", "58"),
            p("S", "67"),
            p("P", "76"),
            p("P", "66"),
            p("P", "56,57"),
            p("N", "89"),
            p("L", "99"),
        ],
        Terminal(SnowRoofCastle),
    ));
    v.push((
        vec![
            p("G", "79"),
            p("S", "68"),
            p("K", "78"),
            p("B", "88"),
            p("N", "89"),
            p("L", "99"),
            p("P", "76"),
            p("P", "87"),
            p("P", "96,97"),
        ],
        Terminal(ElmoCastle),
    ));
    v.push((
        vec![
            p("G", "68"),
            p("K", "78"),
            p("G", "69"),
            p("S", "79"),
            p("N", "89"),
            p("L", "99"),
            p("P", "67"),
            p("P", "87"),
            p("P", "76,77"),
            p("P", "96,97"),
        ],
        Terminal(GirlInTheHouse),
    ));

    // 矢倉の仲間。総矢倉は金矢倉のパターンを含むので先に照合する。
    v.push((
        vec![
            p("G", "67"),
            p("G", "78"),
            p("S", "77"),
            p("K", "88"),
            p("N", "89"),
            p("L", "99"),
            p("P", "66"),
            p("P", "76"),
            p("P", "87"),
            p("P", "97"),
        ],
        Base("YAGURA"),
    ));
    v.push((
        vec![base("YAGURA"), p("P", "56"), p("S", "57")],
        Terminal(CompleteYagura),
    ));
    v.push((vec![base("YAGURA")], Terminal(YaguraCastle)));
    v.push((
        vec![
            p("S", "67"),
            p("G", "78"),
            p("S", "77"),
            p("K", "88"),
            p("N", "89"),
            p("L", "99"),
            p("P", "66"),
            p("P", "76"),
            p("P", "87"),
            p("P", "96,97"),
        ],
        Terminal(SilverYagura),
    ));
    v.push((
        vec![
            p("G", "67"),
            p("G", "68"),
            p("S", "77"),
            p("K", "78"),
            p("N", "89"),
            p("L", "99"),
            p("P", "56"),
            p("P", "66"),
            p("P", "76"),
            p("P", "87"),
            p("P", "95,96,97"),
        ],
        Terminal(HalfYagura),
    ));
    v.push((
        vec![
            p("G", "67"),
            p("G", "78"),
            p("S", "77"),
            p("K", "99"),
            p("N", "89"),
            p("L", "98"),
            p("P", "66"),
            p("P", "76"),
            p("P", "87"),
            p("P", "96,97"),
        ],
        Terminal(YaguraAnaguma),
    ));
    v.push((
        vec![
            p("G", "67"),
            p("G", "78"),
            p("S", "88"),
            p("K", "89"),
            p("N", "77"),
            p("L", "99"),
            p("P", "66"),
            p("P", "76"),
            p("P", "87"),
            p("P", "96,97"),
        ],
        Terminal(KikusuiYagura),
    ));
    v.push((
        vec![
            p("G", "67"),
            p("G", "78"),
            p("S", "76"),
            p("K", "88"),
            p("N", "89"),
            p("L", "99"),
            p("P", "66"),
            p("P", "75"),
            p("P", "86"),
            p("P", "96,97"),
        ],
        Terminal(SilverStandingYagura),
    ));
    v.push((
        vec![
            p("G", "67"),
            p("G", "78"),
            p("S", "77"),
            p("K", "88"),
            p("N", "89"),
            p("L", "99"),
            p("S", "66"),
            p("P", "65"),
            p("P", "76"),
            p("P", "87"),
            p("P", "96,97"),
        ],
        Terminal(DiamondYagura),
    ));
    v.push((
        vec![
            p("G", "58"),
            p("G", "78"),
            p("S", "68"),
            p("K", "69"),
            p("B", "88"),
            p("N", "89"),
            p("L", "99"),
            p("P", "56,57"),
            p("P", "67"),
            p("P", "76"),
            p("P", "87"),
            p("P", "97"),
        ],
        Terminal(CrabCastle),
    ));
    v.push((
        vec![
            p("G", "58"),
            p("G", "68"),
            p("K", "78"),
            p("S", "77"),
            p("N", "89"),
            p("L", "99"),
            p("P", "67"),
            p("P", "76"),
            p("P", "87"),
            p("P", "96,97"),
        ],
        Terminal(BonanzaCastle),
    ));
    v.push((
        vec![
            p("G", "67"),
            p("K", "78"),
            p("S", "77"),
            p("G", "69"),
            p("N", "89"),
            p("L", "99"),
            p("P", "87"),
            p("P", "76"),
            p("P", "66"),
            p("P", "56,57"),
            p("P", "95,96,97"),
        ],
        Terminal(RapidCastle),
    ));
    v.push((
        vec![
            p("G", "58"),
            p("G", "67"),
            p("S", "77"),
            p("K", "78"),
            p("N", "89"),
            p("L", "99"),
            p("P", "87"),
            p("P", "76"),
            p("P", "66"),
            p("P", "56,57"),
            p("P", "96,97"),
        ],
        Terminal(DoiYagura),
    ));
    v.push((
        vec![
            p("K", "98"),
            p("S", "88"),
            p("to", "88"),
            p("N", "89"),
            p("L", "99"),
            p("P", "87"),
            p("P", "97"),
        ],
        Terminal(KushikatsuCastle),
    ));

    v
}

/// 囲いの認識器を作る。対局ごとに作り直してよい(カウンタは持ち越さない)。
pub fn castle_recognizer() -> Recognizer<Castle> {
    Recognizer::new(lib(), "castles")
}

/// 直前に指した側の囲いを認識する。
pub fn position_find_castle(
    rec: &mut Recognizer<Castle>,
    pos: &mut PositionForPatternRecognition,
) -> Option<Castle> {
    rec.find(pos)
}

/// SFEN で与えた局面の囲い(直前に指した側)を認識する。
pub fn sfen_find_castle(sfen: &str) -> Result<Option<Castle>, ShogiError> {
    let mut rec = castle_recognizer();
    let mut pos = PositionForPatternRecognition::from_sfen(sfen)?;
    Ok(rec.find(&mut pos))
}

/// 対局中に現れた囲いを両陣営について検出する。
///
/// 平手初期局面から始まった対局のみが対象。開始局面が指定されている
/// 対局では差分状態を再構成できないため、空の結果を返す。
pub fn game_find_castles(g: &Game) -> RecognizerResult<Castle> {
    let mut res = RecognizerResult::default();
    if g.start_pos.is_some() {
        log::debug!("castle recognition skipped: game has an explicit start position");
        return res;
    }

    let mut rec = castle_recognizer();
    let mut pos = PositionForPatternRecognition::new();
    for m in g.moves.iter().take(CASTLE_SWEEP_HORIZON) {
        if pos.do_move(m.clone()).is_err() {
            break;
        }
        if !pos.is_opening(0) {
            log::debug!("out of opening: {}", pos.sfen_cached());
            break;
        }
        if let Some(castle) = rec.find(&mut pos) {
            let side = pos.side_to_move().inv();
            res.side_mut(side).insert(castle, pos.move_no() - 1);
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_position_has_no_castle() {
        let castle = sfen_find_castle(crate::position::SFEN_INITIAL).unwrap();
        assert_eq!(castle, None);
    }

    #[test]
    fn test_find_is_stable_across_repeated_calls() {
        // 並べ替えが起きても同じ局面に対する答えは変わらない。
        let sfen = "ln1g3rl/1ks2bg2/2pp1snp1/pp2ppp1p/7P1/PPP1PPP1P/1SBP2N2/1KG1GS1R1/LN6L w - 38";
        let mut rec = castle_recognizer();
        let mut pos = PositionForPatternRecognition::from_sfen(sfen).unwrap();
        let first = rec.find(&mut pos);
        assert!(first.is_some());
        for _ in 0..20 {
            assert_eq!(rec.find(&mut pos), first);
        }
    }

    #[test]
    fn test_base_pattern_feeds_dependent_patterns() {
        // ２八玉型の銀冠。終端パターンは基本形「SILVER_CROWN」の結果を
        // 参照して成立する。
        let sfen = "lnsgkgsnl/1r5b1/6pp1/ppp1pp2p/3p5/7P1/PPPPPPPSP/1B1RG1GK1/LNS4NL w - 18";
        assert_eq!(sfen_find_castle(sfen).unwrap(), Some(Castle::SilverCrown));
    }
}
