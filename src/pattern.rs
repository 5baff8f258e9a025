//! 囲い・戦型認識のパターン DSL。
//!
//! パターンは「駒述語」(1 個の原子述語)の連言で、全て先手視点で記述する。
//! 後手に対して照合するときはマスを中心対称に映し、駒の符号を反転する。
//! これで 1 つのパターン集が両陣営をカバーする。
//!
//! 述語はオペコードごとの enum 変種にコンパイルされ、照合ループでは
//! match で分岐する。命中率の低い(= 早く偽になる)述語が先頭に来るよう、
//! フィボナッチ番目の照合ごとに並べ替える。

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::error::ShogiError;
use crate::moves::Move;
use crate::position::Position;
use crate::shogi::*;

/// 81 マスのビットマスク。
pub type CellMask = u128;

/// 最下段 9 筋のビットマスク(筋 - 1 がビット位置)。
pub type FileMask = u16;

const fn cell_bit(sq: Square) -> CellMask {
    1u128 << sq.inner()
}

/// パターン記述の引数。
#[derive(Clone, Debug)]
pub enum PatternArg {
    /// カンマ区切りの数字 2 桁マス表記("46,47" など)。
    Cells(String),
    /// 数値(手駒の枚数、陣営など)。
    Num(i32),
    /// 基本形の名前。
    Name(&'static str),
}

/// パターン記述の 1 要素。駒の文字(またはキーワード)と引数の組。
#[derive(Clone, Debug)]
pub struct PatternSource {
    pub key: String,
    pub arg: PatternArg,
}

/// 駒の文字とマス集合の記述を作る。
pub fn piece_cells(key: &str, cells: &str) -> PatternSource {
    PatternSource {
        key: key.to_owned(),
        arg: PatternArg::Cells(cells.to_owned()),
    }
}

/// 駒の文字と数値の記述(手駒の枚数など)を作る。
pub fn piece_count(key: &str, n: i32) -> PatternSource {
    PatternSource {
        key: key.to_owned(),
        arg: PatternArg::Num(n),
    }
}

/// 基本形への参照を作る。
pub fn base_pattern(name: &'static str) -> PatternSource {
    PatternSource {
        key: "base-pattern".to_owned(),
        arg: PatternArg::Name(name),
    }
}

/// `row` 段目の `col_lo` 筋から `col_hi` 筋の手前までに自陣の歩が
/// 並んでいることを要求する記述を作る。`except` の筋は除く。
/// 単マスの歩述語の列になり、コンパイル時に 1 個のマスク述語に融合される。
pub fn adjacent_pawns(row: u8, col_lo: u8, col_hi: u8, except: &[u8]) -> Vec<PatternSource> {
    debug_assert!((1..=9).contains(&row) && col_lo >= 1 && col_hi <= 10);

    (col_lo..col_hi)
        .filter(|col| !except.contains(col))
        .map(|col| piece_cells("P", &format!("{}{}", col, row)))
        .collect()
}

/// 最下段の駒が初期配置から動いていないことを要求する記述を作る。
/// `except` は免除する筋の数字の列("36" なら３筋と６筋を除く)。
pub fn last_row_pieces(except: &str) -> Vec<PatternSource> {
    vec![PatternSource {
        key: "last-row".to_owned(),
        arg: PatternArg::Cells(except.to_owned()),
    }]
}

/// コンパイル済みの原子述語。
#[derive(Clone, Debug, Eq, PartialEq)]
enum PatternOp {
    /// 指定マスの駒が一致する。駒なし(空きマス)の照合にも使う。
    Eq { piece: Piece, cell: Square },
    /// 集合内のいずれかのマスに駒がある。
    In { piece: Piece, cells: Vec<Square> },
    /// 集合内のどのマスにも駒がない。
    NotIn { piece: Piece, cells: Vec<Square> },
    /// 手駒の枚数が一致する。
    PiecesEq { piece: Piece, count: u8 },
    /// 自陣の歩がマスク内に少なくとも 1 枚ある。
    PawnsIn { mask: CellMask },
    /// マスクされた全マスに自陣の歩がある。
    PawnsMask { mask: CellMask },
    /// マスクされた筋の最下段の駒が全て初期配置のまま動いていない。
    LastRow { mask: FileMask },
    /// 直前の指し手の移動元が集合内にある。
    FromIn { cells: Vec<Square> },
    /// 直前の指し手の移動先が集合内にある。
    ToIn { cells: Vec<Square> },
    /// 照合する陣営が一致する。
    SideIs { side: Side },
    /// その駒がこの対局でそのマスへ一度も動いていない。
    NoMove { piece: Piece, cell: Square },
    /// その駒種の移動回数が上限以下。
    MaxPieceMoves { kind: PieceKind, limit: u32 },
}

/// 命中率カウンタつきの駒述語。
///
/// アロケータにより同じ記述の述語はパターン間で共有され、
/// カウンタも共有される。
#[derive(Debug)]
pub struct PiecePattern {
    op: PatternOp,
    hits: Cell<u32>,
    calls: Cell<u32>,
}

impl PiecePattern {
    fn new(op: PatternOp) -> Self {
        Self {
            op,
            hits: Cell::new(0),
            calls: Cell::new(0),
        }
    }

    /// 成功率。小さいほど早く短絡させられるので前に置く価値がある。
    fn hit_ratio(&self) -> f64 {
        f64::from(self.hits.get()) / f64::from(self.calls.get() + 1)
    }

    fn matches(&self, pos: &PositionForPatternRecognition, side: Side) -> bool {
        self.calls.set(self.calls.get() + 1);
        let ok = self.eval(pos, side);
        if ok {
            self.hits.set(self.hits.get() + 1);
        }
        ok
    }

    fn eval(&self, pos: &PositionForPatternRecognition, side: Side) -> bool {
        // 先手視点の記述を照合する陣営に合わせて解決する。
        let rc = |c: Square| if side == SENTE { c } else { c.swap_side() };
        let rp = |p: Piece| {
            if side == SENTE || p == NO_PIECE {
                p
            } else {
                -p
            }
        };

        match &self.op {
            PatternOp::Eq { piece, cell } => pos.pos().piece_at(rc(*cell)) == rp(*piece),
            PatternOp::In { piece, cells } => {
                cells.iter().any(|&c| pos.pos().piece_at(rc(c)) == rp(*piece))
            }
            PatternOp::NotIn { piece, cells } => {
                cells.iter().all(|&c| pos.pos().piece_at(rc(c)) != rp(*piece))
            }
            PatternOp::PiecesEq { piece, count } => {
                let owner = if piece.side() == SENTE { side } else { side.inv() };
                pos.pos().hand(owner).count(piece.kind()) == *count
            }
            PatternOp::PawnsIn { mask } => pos.pawns(side) & mask != 0,
            PatternOp::PawnsMask { mask } => pos.pawns(side) & mask == *mask,
            PatternOp::LastRow { mask } => pos.unmovable(side) & mask == *mask,
            PatternOp::FromIn { cells } => match pos.last_move() {
                Some(m) => cells.iter().any(|&c| m.from_cell == Some(rc(c))),
                None => false,
            },
            PatternOp::ToIn { cells } => match pos.last_move() {
                Some(m) => cells.iter().any(|&c| m.to_cell == rc(c)),
                None => false,
            },
            PatternOp::SideIs { side: target } => side == *target,
            PatternOp::NoMove { piece, cell } => {
                !pos.destinations_contain(rp(*piece), rc(*cell))
            }
            PatternOp::MaxPieceMoves { kind, limit } => {
                pos.count_moves(Piece::new(side, *kind)) <= *limit
            }
        }
    }
}

/// 同じ記述の述語を使い回す構造共有キャッシュ。
/// 共有された述語はカウンタも共有する。
#[derive(Debug, Default)]
struct PpAllocator {
    cache: HashMap<String, Rc<PiecePattern>>,
}

impl PpAllocator {
    fn intern(&mut self, repr: String, op: impl FnOnce() -> PatternOp) -> Rc<PiecePattern> {
        self.cache
            .entry(repr)
            .or_insert_with(|| Rc::new(PiecePattern::new(op())))
            .clone()
    }
}

/// 駒の名前(1 文字または HORSE などの長い名前)を先手視点の駒に解決する。
/// ' ' は空きマス。小文字は相手側の駒。
fn parse_piece_name(name: &str) -> Option<Piece> {
    if name == " " {
        return Some(NO_PIECE);
    }
    let long = |kind: PieceKind, lower: bool| {
        Some(Piece::new(if lower { GOTE } else { SENTE }, kind))
    };
    match name {
        "TOKIN" => return long(TOKIN, false),
        "HORSE" => return long(HORSE, false),
        "DRAGON" => return long(DRAGON, false),
        "tokin" => return long(TOKIN, true),
        "horse" => return long(HORSE, true),
        "dragon" => return long(DRAGON, true),
        _ => {}
    }
    let mut it = name.chars();
    let c = it.next()?;
    if it.next().is_some() {
        return None;
    }
    let (side, pk) = piece_from_ascii(c)?;
    Some(Piece::new(side, pk))
}

fn parse_cells(s: &str) -> Vec<Square> {
    s.split(',')
        .map(|t| {
            Square::digital_parse(t)
                .unwrap_or_else(|| panic!("bad cell '{}' in pattern data", t))
        })
        .collect()
}

/// 駒述語の連言。基本形への参照は 1 個まで。
#[derive(Debug)]
pub struct PositionPattern {
    preds: Vec<Rc<PiecePattern>>,
    base: Option<&'static str>,
}

impl PositionPattern {
    fn matches(&self, pos: &PositionForPatternRecognition, side: Side) -> bool {
        if let Some(name) = self.base {
            if !pos.base_pattern(name) {
                return false;
            }
        }
        self.preds.iter().all(|p| p.matches(pos, side))
    }

    /// 述語を成功率の昇順に並べ替える。よく偽になるものが先頭に来る。
    fn reorder(&mut self) {
        self.preds
            .sort_by(|a, b| a.hit_ratio().total_cmp(&b.hit_ratio()));
    }
}

/// パターン記述をコンパイルする。
///
/// * 単マスの IN は EQ に落とす。
/// * 自陣の歩の単マス述語は 1 個の `PawnsMask` に融合する。
/// * 'K' の述語は玉マス制約として取り出し、連言からは除く
///   (認識器の玉マス索引が照合前に保証するため)。
/// * 基本形への参照も取り出し、認識器レベルで評価する。
fn compile_pattern(
    sources: &[PatternSource],
    alloc: &mut PpAllocator,
) -> (PositionPattern, Option<Vec<Square>>) {
    let mut preds = Vec::new();
    let mut base = None;
    let mut king_cells: Option<Vec<Square>> = None;
    let mut pawns_mask: CellMask = 0;

    for s in sources {
        let repr = format!("{}|{:?}", s.key, s.arg);
        match (s.key.as_str(), &s.arg) {
            ("base-pattern", PatternArg::Name(name)) => {
                assert!(base.is_none(), "pattern has two base references");
                base = Some(*name);
            }
            ("last-row", PatternArg::Cells(except)) => {
                let mut mask: FileMask = 0x1FF;
                for c in except.chars() {
                    let d = c.to_digit(10).expect("bad last-row digit");
                    assert!((1..=9).contains(&d), "bad last-row file");
                    mask &= !(1 << (d - 1));
                }
                preds.push(alloc.intern(repr, || PatternOp::LastRow { mask }));
            }
            ("from", PatternArg::Cells(cs)) => {
                let cells = parse_cells(cs);
                preds.push(alloc.intern(repr, || PatternOp::FromIn { cells }));
            }
            ("to", PatternArg::Cells(cs)) => {
                let cells = parse_cells(cs);
                preds.push(alloc.intern(repr, || PatternOp::ToIn { cells }));
            }
            ("side", PatternArg::Num(n)) => {
                let side = if *n > 0 { SENTE } else { GOTE };
                preds.push(alloc.intern(repr, || PatternOp::SideIs { side }));
            }
            ("max-gold-moves", PatternArg::Num(n)) => {
                let limit = u32::try_from(*n).expect("bad move limit");
                preds.push(alloc.intern(repr, || PatternOp::MaxPieceMoves {
                    kind: GOLD,
                    limit,
                }));
            }
            ("no-move", PatternArg::Cells(spec)) => {
                // 引数は駒の文字 1 個とマス("G67" など)。
                let piece = parse_piece_name(&spec[..1]).expect("bad no-move piece");
                let cell = Square::digital_parse(&spec[1..]).expect("bad no-move cell");
                preds.push(alloc.intern(repr, || PatternOp::NoMove { piece, cell }));
            }
            (key, arg) => {
                let (negate, name) = match key.strip_prefix('!') {
                    Some(rest) => (true, rest),
                    None => (false, key),
                };
                let piece = parse_piece_name(name)
                    .unwrap_or_else(|| panic!("bad piece '{}' in pattern data", key));
                match arg {
                    PatternArg::Num(n) => {
                        assert!(!negate, "negated count pattern");
                        let count = u8::try_from(*n).expect("bad hand count");
                        preds.push(alloc.intern(repr, || PatternOp::PiecesEq { piece, count }));
                    }
                    PatternArg::Cells(cs) => {
                        let cells = parse_cells(cs);
                        if negate {
                            preds.push(alloc.intern(repr, || PatternOp::NotIn { piece, cells }));
                        } else if piece == Piece::new(SENTE, KING) {
                            assert!(king_cells.is_none(), "pattern has two king constraints");
                            king_cells = Some(cells);
                        } else if piece == Piece::new(SENTE, PAWN) && cells.len() == 1 {
                            // 自陣の歩の単マス述語はまとめて 1 個のマスク照合にする。
                            pawns_mask |= cell_bit(cells[0]);
                        } else if piece == Piece::new(SENTE, PAWN) {
                            let mask = cells.iter().fold(0, |m, &c| m | cell_bit(c));
                            preds.push(alloc.intern(repr, || PatternOp::PawnsIn { mask }));
                        } else if cells.len() == 1 {
                            let cell = cells[0];
                            preds.push(alloc.intern(repr, || PatternOp::Eq { piece, cell }));
                        } else {
                            preds.push(alloc.intern(repr, || PatternOp::In { piece, cells }));
                        }
                    }
                    PatternArg::Name(_) => panic!("name argument for piece pattern"),
                }
            }
        }
    }

    if pawns_mask != 0 {
        let repr = format!("P|mask:{:021x}", pawns_mask);
        preds.push(alloc.intern(repr, || PatternOp::PawnsMask { mask: pawns_mask }));
    }

    (PositionPattern { preds, base }, king_cells)
}

/// パターンに対応づけるタグ。文字列は後続パターンが参照する基本形、
/// enum 値は終端の認識結果。
#[derive(Clone, Copy, Debug)]
pub enum PatternTag<T> {
    Base(&'static str),
    Terminal(T),
}

/// 順序つきパターン列と玉マス索引を持つ認識器。
///
/// 照合は直前に指した側に対して行い、その側の玉のマスに対応する
/// パターンだけを記述順に評価する。文字列タグの結果は局面に記録され、
/// enum タグが真になった時点でそれを返す。
#[derive(Debug)]
pub struct Recognizer<T: Copy> {
    name: &'static str,
    patterns: Vec<(PositionPattern, PatternTag<T>)>,
    /// 玉のマス → そのマスを許すパターンの添字(記述順)。
    by_king: Vec<Vec<u16>>,
    calls: u64,
    fib_prev: u64,
    fib_next: u64,
}

impl<T: Copy> Recognizer<T> {
    /// パターン集をコンパイルして認識器を作る。
    pub fn new(library: Vec<(Vec<PatternSource>, PatternTag<T>)>, name: &'static str) -> Self {
        let mut alloc = PpAllocator::default();
        let mut patterns: Vec<(PositionPattern, PatternTag<T>)> = Vec::new();
        let mut by_king: Vec<Vec<u16>> = vec![Vec::new(); 81];
        // 基本形の玉マス制約。参照するパターンに継承される。
        let mut base_kings: HashMap<&'static str, Option<Vec<Square>>> = HashMap::new();

        for (sources, tag) in library {
            let (pat, own_kings) = compile_pattern(&sources, &mut alloc);
            let kings = own_kings.or_else(|| {
                pat.base
                    .and_then(|b| base_kings.get(b).cloned().flatten())
            });
            if let PatternTag::Base(name) = tag {
                base_kings.insert(name, kings.clone());
            }
            let idx = u16::try_from(patterns.len()).expect("too many patterns");
            match &kings {
                Some(cells) => {
                    for &c in cells {
                        by_king[usize::from(c)].push(idx);
                    }
                }
                None => {
                    for v in by_king.iter_mut() {
                        v.push(idx);
                    }
                }
            }
            patterns.push((pat, tag));
        }

        Self {
            name,
            patterns,
            by_king,
            calls: 0,
            fib_prev: 1,
            fib_next: 1,
        }
    }

    /// 認識器の名前を返す。
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 直前に指した側の形を認識する。最初に一致した終端タグを返す。
    pub fn find(&mut self, pos: &mut PositionForPatternRecognition) -> Option<T> {
        self.calls += 1;
        if self.calls == self.fib_next {
            // フィボナッチ番目の照合ごとに並べ替え、オーバーヘッドを抑える。
            let next = self.fib_prev + self.fib_next;
            self.fib_prev = self.fib_next;
            self.fib_next = next;
            log::debug!("{}: reordering predicates after {} calls", self.name, self.calls);
            self.reorder();
        }

        let side = pos.pos().side_to_move().inv();
        let king = pos.king_cell(side);

        for idx in &self.by_king[usize::from(king)] {
            let (pat, tag) = &self.patterns[usize::from(*idx)];
            let ok = pat.matches(pos, side);
            match *tag {
                PatternTag::Base(name) => pos.set_base_pattern(name, ok),
                PatternTag::Terminal(t) => {
                    if ok {
                        return Some(t);
                    }
                }
            }
        }
        None
    }

    /// 全パターンの述語を並べ替える。対局間のリセットにも使える。
    pub fn reorder(&mut self) {
        for (pat, _) in &mut self.patterns {
            pat.reorder();
        }
    }
}

/// SFEN をキーとする局面(+指し手)の索引。
#[derive(Debug)]
pub struct SfenMap<T: Copy>(HashMap<&'static str, T>);

impl<T: Copy> SfenMap<T> {
    pub fn new(entries: &[(&'static str, T)]) -> Self {
        Self(entries.iter().copied().collect())
    }

    /// 局面の SFEN で引く。
    pub fn get(&self, pos: &PositionForPatternRecognition) -> Option<T> {
        self.0.get(pos.sfen_cached()).copied()
    }

    /// 「SFEN + 半角空白 + USI 指し手」で引く。
    pub fn get_with_move(&self, pos: &PositionForPatternRecognition, m: &Move) -> Option<T> {
        let key = format!("{} {}", pos.sfen_cached(), m.usi_str());
        self.0.get(key.as_str()).copied()
    }
}

/// 認識済みタグの集合と、各タグを最初に認識した手数。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TagSet<T: Copy + Ord> {
    tags: BTreeSet<T>,
    first_move_no: BTreeMap<T, u32>,
}

impl<T: Copy + Ord> Default for TagSet<T> {
    fn default() -> Self {
        Self {
            tags: BTreeSet::new(),
            first_move_no: BTreeMap::new(),
        }
    }
}

impl<T: Copy + Ord> TagSet<T> {
    /// タグを追加する。既にあれば偽を返す。
    pub fn insert(&mut self, tag: T, move_no: u32) -> bool {
        if self.tags.insert(tag) {
            self.first_move_no.insert(tag, move_no);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, tag: T) -> bool {
        self.tags.contains(&tag)
    }

    pub fn remove(&mut self, tag: T) {
        self.tags.remove(&tag);
        self.first_move_no.remove(&tag);
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// 集合が `allowed` の部分集合かどうかを返す。
    pub fn is_subset_of(&self, allowed: &[T]) -> bool {
        self.tags.iter().all(|t| allowed.contains(t))
    }

    /// タグを最初に認識した手数を返す。
    pub fn first_move_no(&self, tag: T) -> Option<u32> {
        self.first_move_no.get(&tag).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.tags.iter().copied()
    }
}

/// 両陣営それぞれの認識結果。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecognizerResult<T: Copy + Ord> {
    pub sente: TagSet<T>,
    pub gote: TagSet<T>,
}

impl<T: Copy + Ord> Default for RecognizerResult<T> {
    fn default() -> Self {
        Self {
            sente: TagSet::default(),
            gote: TagSet::default(),
        }
    }
}

impl<T: Copy + Ord> RecognizerResult<T> {
    /// 指定した陣営のタグ集合への可変参照を返す。
    pub fn side_mut(&mut self, side: Side) -> &mut TagSet<T> {
        if side == SENTE {
            &mut self.sente
        } else {
            &mut self.gote
        }
    }

    /// 指定した陣営のタグ集合を返す。
    pub fn side(&self, side: Side) -> &TagSet<T> {
        if side == SENTE {
            &self.sente
        } else {
            &self.gote
        }
    }
}

/// 最下段の初期配置(１筋から９筋へ)。
const BACK_RANK: [PieceKind; 9] = [
    LANCE, KNIGHT, SILVER, GOLD, KING, GOLD, SILVER, KNIGHT, LANCE,
];

/// 序盤認識を打ち切る「主要な序盤の駒」。
/// この駒種を相手に取られた側は以後の序盤認識の対象外になる。
const MAJOR_OPENING_KINDS: [PieceKind; 4] = [SILVER, GOLD, PRO_LANCE, LANCE];

/// 形認識用に拡張した局面。
///
/// パターン照合を O(1) に近づけるための差分更新される状態
/// (歩のビットマスク、玉位置、最下段の不動フラグ、駒取りの記録、
/// 移動先集合、基本形の照合結果など)を `Position` に付け足したもの。
/// 後手側のマスク・マスは中心対称に映した座標で持ち、先手視点で
/// 記述されたパターンをそのまま適用できるようにしている。
#[derive(Clone, Debug)]
pub struct PositionForPatternRecognition {
    pos: Position,
    sente_pawns: CellMask,
    gote_rev_pawns: CellMask,
    sente_king: Square,
    gote_rev_king: Square,
    sente_unmovable: FileMask,
    gote_unmovable: FileMask,
    sente_captures_mask: CellMask,
    gote_rev_captures_mask: CellMask,
    /// その側が取った駒種の集合(駒種の内部値をビット位置とするマスク)。
    sente_captured_kinds: u16,
    gote_captured_kinds: u16,
    /// 今までに現れた (動かした駒, 移動先) の組。
    moves_destinations: HashSet<(Piece, Square)>,
    sente_opening: bool,
    gote_opening: bool,
    /// 両陣営とも飛を手駒に持った(飛交換が成立した)ことがあるか。
    rooks_exchange: bool,
    /// 駒ごとの移動回数。
    move_counts: HashMap<Piece, u32>,
    /// 駒打ちが一度でも行われたか。
    was_drops: bool,
    last_move: Option<Move>,
    cached_sfen: OnceCell<String>,
    /// 現局面で評価済みの基本形の結果。
    patterns_d: HashMap<&'static str, bool>,
}

impl PositionForPatternRecognition {
    /// 平手初期局面から作る。
    pub fn new() -> Self {
        Self::from_position(Position::initial())
    }

    /// SFEN から作る。途中局面では最下段の不動フラグを
    /// 「初期配置の駒が今もそこに居るか」で近似する。
    pub fn from_sfen(sfen: &str) -> Result<Self, ShogiError> {
        Ok(Self::from_position(Position::new(sfen)?))
    }

    fn from_position(pos: Position) -> Self {
        let mut sente_pawns: CellMask = 0;
        let mut gote_rev_pawns: CellMask = 0;
        for sq in Square::iter() {
            let pc = pos.piece_at(sq);
            if pc.kind() == PAWN {
                if pc.side() == SENTE {
                    sente_pawns |= cell_bit(sq);
                } else {
                    gote_rev_pawns |= cell_bit(sq.swap_side());
                }
            }
        }

        let sente_king = pos.king_square(SENTE).expect("position has a sente king");
        let gote_rev_king = pos
            .king_square(GOTE)
            .expect("position has a gote king")
            .swap_side();

        let mut sente_unmovable: FileMask = 0;
        let mut gote_unmovable: FileMask = 0;
        for bit in 0..9u8 {
            let sq = Square::from_row_col(8, bit);
            if pos.piece_at(sq) == Piece::new(SENTE, BACK_RANK[usize::from(bit)]) {
                sente_unmovable |= 1 << bit;
            }
            let sq = Square::from_row_col(0, 8 - bit);
            if pos.piece_at(sq) == Piece::new(GOTE, BACK_RANK[usize::from(8 - bit)]) {
                gote_unmovable |= 1 << bit;
            }
        }

        Self {
            pos,
            sente_pawns,
            gote_rev_pawns,
            sente_king,
            gote_rev_king,
            sente_unmovable,
            gote_unmovable,
            sente_captures_mask: 0,
            gote_rev_captures_mask: 0,
            sente_captured_kinds: 0,
            gote_captured_kinds: 0,
            moves_destinations: HashSet::new(),
            sente_opening: true,
            gote_opening: true,
            rooks_exchange: false,
            move_counts: HashMap::new(),
            was_drops: false,
            last_move: None,
            cached_sfen: OnceCell::new(),
            patterns_d: HashMap::new(),
        }
    }

    /// 土台の局面への参照を返す。
    pub fn pos(&self) -> &Position {
        &self.pos
    }

    /// 手番を返す。
    pub fn side_to_move(&self) -> Side {
        self.pos.side_to_move()
    }

    /// 手数を返す。
    pub fn move_no(&self) -> u32 {
        self.pos.move_no()
    }

    /// 直前の指し手を返す。
    pub fn last_move(&self) -> Option<&Move> {
        self.last_move.as_ref()
    }

    /// 指定した陣営の歩のマスク(後手は映した座標)を返す。
    pub fn pawns(&self, side: Side) -> CellMask {
        if side == SENTE {
            self.sente_pawns
        } else {
            self.gote_rev_pawns
        }
    }

    /// 指定した陣営の玉のマス(後手は映した座標)を返す。
    pub fn king_cell(&self, side: Side) -> Square {
        if side == SENTE {
            self.sente_king
        } else {
            self.gote_rev_king
        }
    }

    /// 指定した陣営の最下段の不動フラグを返す。
    pub fn unmovable(&self, side: Side) -> FileMask {
        if side == SENTE {
            self.sente_unmovable
        } else {
            self.gote_unmovable
        }
    }

    /// 指定した陣営が駒を取ったマスのマスク(後手は映した座標)を返す。
    pub fn captures_mask(&self, side: Side) -> CellMask {
        if side == SENTE {
            self.sente_captures_mask
        } else {
            self.gote_rev_captures_mask
        }
    }

    /// 指定した陣営が取った駒種の集合を返す。
    pub fn captured_kinds(&self, side: Side) -> u16 {
        if side == SENTE {
            self.sente_captured_kinds
        } else {
            self.gote_captured_kinds
        }
    }

    /// 指定した駒の移動回数を返す。
    pub fn count_moves(&self, piece: Piece) -> u32 {
        self.move_counts.get(&piece).copied().unwrap_or(0)
    }

    /// 駒打ちが一度でも行われたかを返す。
    pub fn was_drops(&self) -> bool {
        self.was_drops
    }

    /// 飛交換が成立したことがあるかを返す。
    pub fn rooks_exchange(&self) -> bool {
        self.rooks_exchange
    }

    /// (駒, 移動先) の組が現れたことがあるかを返す。
    pub fn destinations_contain(&self, piece: Piece, cell: Square) -> bool {
        self.moves_destinations.contains(&(piece, cell))
    }

    /// 序盤認識がまだ有効かどうかを返す。
    /// `side` が正なら先手、負なら後手、0 なら両方について判定する。
    pub fn is_opening(&self, side: i8) -> bool {
        match side.cmp(&0) {
            std::cmp::Ordering::Greater => self.sente_opening,
            std::cmp::Ordering::Less => self.gote_opening,
            std::cmp::Ordering::Equal => self.sente_opening && self.gote_opening,
        }
    }

    /// 現局面の SFEN(手数つき)を返す。結果は手が進むまでキャッシュされる。
    pub fn sfen_cached(&self) -> &str {
        self.cached_sfen.get_or_init(|| self.pos.sfen(true))
    }

    /// 基本形の照合結果を返す。未評価なら偽。
    pub fn base_pattern(&self, name: &str) -> bool {
        self.patterns_d.get(name).copied().unwrap_or(false)
    }

    /// 基本形の照合結果を記録する。認識器が呼ぶ。
    pub(crate) fn set_base_pattern(&mut self, name: &'static str, value: bool) {
        self.patterns_d.insert(name, value);
    }

    /// この手がその側の最初の飛の移動で、かつ序盤の戦型分類に使える
    /// 条件を満たすなら、指す側から見た移動先の筋(1 始まり)を返す。
    ///
    /// 条件: 駒打ちがまだ無い、飛交換が起きていない、指す側が角(馬)を
    /// 取っていない。着手前に呼ぶこと。
    pub fn first_rook_move_file(&self, m: &Move) -> Option<u8> {
        let from_piece = m.from_piece?;
        if from_piece.kind() != ROOK {
            return None;
        }
        if self.count_moves(from_piece) != 0 {
            return None;
        }
        if self.was_drops || self.rooks_exchange {
            return None;
        }
        let side = from_piece.side();
        let bishopish = (1u16 << BISHOP.inner()) | (1 << HORSE.inner());
        if self.captured_kinds(side) & bishopish != 0 {
            return None;
        }
        Some(if side == SENTE {
            9 - m.to_cell.col()
        } else {
            m.to_cell.col() + 1
        })
    }

    /// 指し手で局面を進め、派生状態を差分更新する。
    /// 失敗した場合、局面も派生状態も変わらない。
    pub fn do_move(&mut self, mut m: Move) -> Result<(), ShogiError> {
        let captured = if m.is_drop() {
            NO_PIECE
        } else {
            self.pos.piece_at(m.to_cell)
        };

        self.pos.do_move(&mut m)?;

        let mover = m.to_piece.side();

        *self
            .move_counts
            .entry(m.from_piece.unwrap_or(m.to_piece))
            .or_insert(0) += 1;
        if m.is_drop() {
            self.was_drops = true;
        }

        // 歩のマスク。
        if let Some(fp) = m.from_piece {
            if fp.kind() == PAWN {
                let from = m.from_cell.unwrap();
                if mover == SENTE {
                    self.sente_pawns &= !cell_bit(from);
                } else {
                    self.gote_rev_pawns &= !cell_bit(from.swap_side());
                }
            }
        }
        if m.to_piece.kind() == PAWN {
            if mover == SENTE {
                self.sente_pawns |= cell_bit(m.to_cell);
            } else {
                self.gote_rev_pawns |= cell_bit(m.to_cell.swap_side());
            }
        }

        // 玉位置。
        if m.to_piece.kind() == KING {
            if mover == SENTE {
                self.sente_king = m.to_cell;
            } else {
                self.gote_rev_king = m.to_cell.swap_side();
            }
        }

        // 最下段の駒が動いた。
        if let Some(from) = m.from_cell {
            if mover == SENTE && from.row() == 8 {
                self.sente_unmovable &= !(1 << from.col());
            } else if mover == GOTE && from.row() == 0 {
                self.gote_unmovable &= !(1 << from.swap_side().col());
            }
        }

        // 駒取り。
        if captured.is_piece() {
            let victim = captured.side();

            if captured.kind() == PAWN {
                if victim == SENTE {
                    self.sente_pawns &= !cell_bit(m.to_cell);
                } else {
                    self.gote_rev_pawns &= !cell_bit(m.to_cell.swap_side());
                }
            }

            if mover == SENTE {
                self.sente_captures_mask |= cell_bit(m.to_cell);
                self.sente_captured_kinds |= 1 << captured.kind().inner();
            } else {
                self.gote_rev_captures_mask |= cell_bit(m.to_cell.swap_side());
                self.gote_captured_kinds |= 1 << captured.kind().inner();
            }

            // 最下段の駒が取られた場合も不動フラグを落とす。
            if victim == SENTE && m.to_cell.row() == 8 {
                self.sente_unmovable &= !(1 << m.to_cell.col());
            } else if victim == GOTE && m.to_cell.row() == 0 {
                self.gote_unmovable &= !(1 << m.to_cell.swap_side().col());
            }

            if MAJOR_OPENING_KINDS.contains(&captured.kind()) {
                if victim == SENTE {
                    self.sente_opening = false;
                } else {
                    self.gote_opening = false;
                }
            }

            if self.pos.hand(SENTE).count(ROOK) > 0 && self.pos.hand(GOTE).count(ROOK) > 0 {
                self.rooks_exchange = true;
            }
        }

        self.moves_destinations.insert((m.to_piece, m.to_cell));

        self.last_move = Some(m);
        self.cached_sfen = OnceCell::new();
        self.patterns_d.clear();

        Ok(())
    }
}

impl Default for PositionForPatternRecognition {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn do_usi(pos: &mut PositionForPatternRecognition, moves: &[&str]) {
        for s in moves {
            let m = pos.pos().parse_usi_move(s).unwrap();
            pos.do_move(m).unwrap();
        }
    }

    #[test]
    fn test_ppr_initial_state() {
        let pos = PositionForPatternRecognition::new();
        assert_eq!(pos.unmovable(SENTE), 0x1FF);
        assert_eq!(pos.unmovable(GOTE), 0x1FF);
        assert_eq!(pos.pawns(SENTE).count_ones(), 9);
        assert_eq!(pos.pawns(GOTE).count_ones(), 9);
        // 後手の歩も映した座標では先手の歩と同じ段に見える。
        assert_eq!(pos.pawns(SENTE), pos.pawns(GOTE));
        assert_eq!(pos.king_cell(SENTE).digital_str(), "59");
        assert_eq!(pos.king_cell(GOTE).digital_str(), "59");
        assert!(pos.is_opening(0));
    }

    #[test]
    fn test_ppr_incremental_update() {
        let mut pos = PositionForPatternRecognition::new();
        do_usi(&mut pos, &["7g7f", "3c3d", "8h2b+"]);

        // 先手の角が後手の角を取って馬に成った。
        assert_ne!(
            pos.pawns(SENTE) & cell_bit(Square::digital_parse("76").unwrap()),
            0
        );
        assert_ne!(pos.captured_kinds(SENTE) & (1 << BISHOP.inner()), 0);
        assert!(pos.is_opening(0));

        // 後手が馬を取り返す。
        do_usi(&mut pos, &["3a2b"]);
        assert!(pos.captured_kinds(GOTE) & (1 << HORSE.inner()) != 0);
        // 銀が最下段から動いたので後手の不動フラグが欠ける。
        assert_ne!(pos.unmovable(GOTE), 0x1FF);
        assert!(pos.is_opening(0));
    }

    #[test]
    fn test_eq_pattern_mirrors_for_gote() {
        let mut alloc = PpAllocator::default();
        let (pat, _) = compile_pattern(&[piece_cells("S", "27")], &mut alloc);

        let mut pos = PositionForPatternRecognition::new();
        // 初期局面ではどちらの銀も(自陣視点の)２七に居ない。
        assert!(!pat.matches(&pos, SENTE));
        assert!(!pat.matches(&pos, GOTE));

        // 先手の銀を３八経由で２七へ進める。
        do_usi(&mut pos, &["3i3h", "8c8d", "3h2g", "8d8e"]);
        assert!(pat.matches(&pos, SENTE));
        assert!(!pat.matches(&pos, GOTE));
    }

    #[test]
    fn test_pattern_counters_shared() {
        let mut alloc = PpAllocator::default();
        let (a, _) = compile_pattern(&[piece_cells("G", "58")], &mut alloc);
        let (b, _) = compile_pattern(&[piece_cells("G", "58")], &mut alloc);
        let pos = PositionForPatternRecognition::new();
        a.matches(&pos, SENTE);
        b.matches(&pos, SENTE);
        // 同じ記述の述語は共有され、カウンタも合算される。
        assert_eq!(a.preds[0].calls.get(), 2);
        assert!(Rc::ptr_eq(&a.preds[0], &b.preds[0]));
    }

    #[test]
    fn test_pawn_fusion() {
        let mut alloc = PpAllocator::default();
        let (pat, _) = compile_pattern(
            &[
                piece_cells("P", "76"),
                piece_cells("P", "27"),
                piece_cells("P", "15,16,17"),
            ],
            &mut alloc,
        );
        // 単マスの歩 2 個は 1 個のマスク述語に融合され、複マスは PawnsIn のまま。
        assert_eq!(pat.preds.len(), 2);

        let mut pos = PositionForPatternRecognition::new();
        // ７六の歩がまだ突かれていないので偽。
        assert!(!pat.matches(&pos, SENTE));
        do_usi(&mut pos, &["7g7f"]);
        // 76 と 27 の両方に歩があり、端歩 15,16,17 も 17 で満たされる。
        assert!(pat.matches(&pos, SENTE));
    }

    #[test]
    fn test_first_rook_move_file() {
        let mut pos = PositionForPatternRecognition::new();
        do_usi(&mut pos, &["7g7f", "3c3d"]);
        // 先手の飛が６八へ(四間飛車)。先手視点の筋は 10 - 6 = 4。
        let m = pos.pos().parse_usi_move("2h6h").unwrap();
        assert_eq!(pos.first_rook_move_file(&m), Some(4));
        pos.do_move(m).unwrap();
        // 2 回目の飛の移動は対象外。
        let m = pos.pos().parse_usi_move("6h5h").unwrap();
        assert_eq!(pos.first_rook_move_file(&m), None);
    }

    #[test]
    fn test_base_pattern_results_reset_per_position() {
        let mut pos = PositionForPatternRecognition::new();
        pos.set_base_pattern("X", true);
        assert!(pos.base_pattern("X"));
        do_usi(&mut pos, &["7g7f"]);
        assert!(!pos.base_pattern("X"));
    }
}
