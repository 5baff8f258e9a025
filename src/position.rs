//! 局面。
//!
//! 盤面 81 マス + 両陣営の手駒 + 手番 + 手数を持つ。
//! SFEN の読み書き、指し手の実行と巻き戻し、王手判定、
//! 合法手の有無(詰み判定用)、入玉宣言の判定などを提供する。
//!
//! `do_move` はトランザクショナル: 成功すれば局面が進み、
//! 失敗すれば局面は呼び出し前のまま変わらない。

use arrayvec::ArrayVec;

use crate::error::ShogiError;
use crate::kifu::{kanji_number, KIFU_HAND_ORDER};
use crate::moves::{Legality, Move, UndoMove};
use crate::shogi::*;

/// 平手初期局面の SFEN。
pub const SFEN_INITIAL: &str = "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1";

/// 疑似合法手の生成先。王手放置なども含むため合法手数の上界より広めに取る。
pub type MoveArray = ArrayVec<Move, 700>;

/// 片方の陣営の手駒。駒種の内部値 - 1 でインデックスする 7 要素の配列。
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[repr(transparent)]
pub struct Hand([u8; 7]);

impl Hand {
    /// 空の手駒を返す。
    pub const fn empty() -> Self {
        Self([0; 7])
    }

    /// 指定した駒種の枚数を返す。`pk` は手駒となりうる駒種でなければならない。
    pub fn count(&self, pk: PieceKind) -> u8 {
        debug_assert!(pk.is_hand());

        self.0[usize::from(pk.inner() - 1)]
    }

    /// 手駒が空かどうかを返す。
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&n| n == 0)
    }

    fn add(&mut self, pk: PieceKind, n: u8) {
        debug_assert!(pk.is_hand());

        let slot = &mut self.0[usize::from(pk.inner() - 1)];
        *slot = slot.saturating_add(n);
    }

    fn sub(&mut self, pk: PieceKind, n: u8) {
        debug_assert!(pk.is_hand());
        debug_assert!(self.count(pk) >= n);

        self.0[usize::from(pk.inner() - 1)] -= n;
    }
}

// 王手判定に使う駒種集合(駒種の内部値をビット位置とするマスク)。
// 遠距離(far)は玉から 2 マス以上離れた地点から利く駒種、
// 近接(near)は玉の隣接マスから利く駒種。馬、龍、玉は全方向に近接利きを
// 持つため NEAR_ALWAYS として常に合わせて判定する。

const fn kind_mask(kinds: &[PieceKind]) -> u16 {
    let mut mask = 0u16;
    let mut i = 0;
    while i < kinds.len() {
        mask |= 1 << kinds[i].inner();
        i += 1;
    }
    mask
}

const GOLDS: &[PieceKind] = &[GOLD, TOKIN, PRO_LANCE, PRO_KNIGHT, PRO_SILVER];

const NEAR_ALWAYS: u16 = kind_mask(&[KING, HORSE, DRAGON]);
const ATTACK_UP_FAR: u16 = kind_mask(&[LANCE, ROOK, DRAGON]);
const ATTACK_UP_NEAR: u16 =
    kind_mask(&[PAWN, LANCE, SILVER, ROOK, DRAGON]) | kind_mask(GOLDS);
const ATTACK_DIAG_FAR: u16 = kind_mask(&[BISHOP, HORSE]);
const ATTACK_DIAG_UP_NEAR: u16 = kind_mask(&[SILVER, BISHOP, HORSE]) | kind_mask(GOLDS);
const ATTACK_SIDE_FAR: u16 = kind_mask(&[ROOK, DRAGON]);
const ATTACK_SIDE_NEAR: u16 = kind_mask(&[ROOK, DRAGON]) | kind_mask(GOLDS);
const ATTACK_DIAG_DOWN_NEAR: u16 = kind_mask(&[SILVER, BISHOP, HORSE]);

const fn in_mask(mask: u16, pk: PieceKind) -> bool {
    (mask & (1 << pk.inner())) != 0
}

/// 局面。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Position {
    board: [Piece; 81],
    sente_hand: Hand,
    gote_hand: Hand,
    side_to_move: Side,
    move_no: u32,
}

impl Position {
    /// 平手初期局面を作る。
    pub fn initial() -> Self {
        Self::new(SFEN_INITIAL).expect("initial sfen must be valid")
    }

    /// SFEN をパースして局面を作る。
    ///
    /// 構文に加えて局面不変条件もチェックする:
    ///
    /// * 両陣営とも玉がちょうど 1 枚。
    /// * 盤上と手駒の合計が駒種ごとの総数(歩 18、香桂銀金各 4、角飛各 2)に一致。
    /// * 直前に指した側が王手を受けていない。
    pub fn new(sfen: &str) -> Result<Self, ShogiError> {
        let err = |reason: String| ShogiError::InvalidSfen { reason };

        let tokens: Vec<&str> = sfen.split_ascii_whitespace().collect();
        if tokens.len() != 4 {
            return Err(err(format!("expected 4 fields, got {}", tokens.len())));
        }

        let mut this = Self {
            board: [NO_PIECE; 81],
            sente_hand: Hand::empty(),
            gote_hand: Hand::empty(),
            side_to_move: SENTE,
            move_no: 1,
        };

        this.side_to_move = match tokens[1] {
            "b" => SENTE,
            "w" => GOTE,
            s => return Err(err(format!("unknown side to move '{}'", s))),
        };

        this.move_no = tokens[3]
            .parse::<u32>()
            .ok()
            .filter(|&n| n >= 1)
            .ok_or_else(|| err(format!("bad move number '{}'", tokens[3])))?;

        this.parse_board(tokens[0])?;
        this.parse_hands(tokens[2])?;
        this.validate()?;

        Ok(this)
    }

    fn parse_board(&mut self, s: &str) -> Result<(), ShogiError> {
        let err = |reason: String| ShogiError::InvalidSfen { reason };

        let rows: Vec<&str> = s.split('/').collect();
        if rows.len() != 9 {
            return Err(err(format!("board must have 9 rows, got {}", rows.len())));
        }

        for (row, t) in rows.iter().enumerate() {
            let mut col: i32 = 9;
            let mut promoted = false;
            for c in t.chars() {
                if let Some(n) = c.to_digit(10) {
                    if promoted {
                        return Err(err("free cell can't be promoted".to_owned()));
                    }
                    col -= n as i32;
                    if col < 0 {
                        return Err(err(format!("row #{} overflows", row + 1)));
                    }
                } else if c == '+' {
                    if promoted {
                        return Err(err("double plus".to_owned()));
                    }
                    promoted = true;
                } else {
                    let (side, mut pk) = piece_from_ascii(c)
                        .ok_or_else(|| err(format!("unknown piece '{}'", c)))?;
                    if promoted {
                        pk = pk
                            .to_promoted()
                            .ok_or_else(|| err(format!("piece '{}' can't be promoted", c)))?;
                        promoted = false;
                    }
                    col -= 1;
                    if col < 0 {
                        return Err(err(format!("row #{} overflows", row + 1)));
                    }
                    let sq = Square::from_row_col(row as u8, col as u8);
                    self.board[usize::from(sq)] = Piece::new(side, pk);
                }
            }
            if col != 0 {
                return Err(err(format!("not enough data in row #{}", row + 1)));
            }
            if promoted {
                return Err(err("remaining promotion flag".to_owned()));
            }
        }

        Ok(())
    }

    fn parse_hands(&mut self, s: &str) -> Result<(), ShogiError> {
        let err = |reason: String| ShogiError::InvalidSfen { reason };

        if s == "-" {
            return Ok(());
        }

        let mut t: u32 = 0;
        for c in s.chars() {
            if let Some(d) = c.to_digit(10) {
                t = t
                    .checked_mul(10)
                    .and_then(|t| t.checked_add(d))
                    .ok_or_else(|| err("hand count is too large".to_owned()))?;
            } else {
                let (side, pk) = piece_from_ascii(c)
                    .ok_or_else(|| err(format!("piece in hand should be alphabetic, got '{}'", c)))?;
                if !pk.is_hand() {
                    return Err(err(format!("piece '{}' can't be in hand", c)));
                }
                let n = t.max(1);
                if n > 18 {
                    return Err(err(format!("hand count {} is too large", n)));
                }
                self.hand_mut(side).add(pk, n as u8);
                t = 0;
            }
        }
        if t != 0 {
            return Err(err(
                "after number in hand should be alphabetic character".to_owned(),
            ));
        }

        Ok(())
    }

    /// 局面不変条件のチェック。
    fn validate(&self) -> Result<(), ShogiError> {
        let err = |reason: String| ShogiError::InvalidSfen { reason };

        // 玉の枚数。
        for side in Side::iter() {
            let n = Square::iter()
                .filter(|&sq| self.board[usize::from(sq)] == Piece::new(side, KING))
                .count();
            if n != 1 {
                return Err(err(format!("{} must have exactly one king, got {}", side, n)));
            }
        }

        // 駒種ごとの総数(成駒は生駒に数える)。
        const TOTALS: [(PieceKind, u8); 7] = [
            (PAWN, 18),
            (LANCE, 4),
            (KNIGHT, 4),
            (SILVER, 4),
            (GOLD, 4),
            (BISHOP, 2),
            (ROOK, 2),
        ];
        let mut counts = [0u32; 8];
        for sq in Square::iter() {
            let pc = self.board[usize::from(sq)];
            if pc.is_piece() && pc.kind() != KING {
                counts[usize::from(pc.kind().to_raw().inner())] += 1;
            }
        }
        for (pk, total) in TOTALS {
            let n = counts[usize::from(pk.inner())]
                + u32::from(self.sente_hand.count(pk))
                + u32::from(self.gote_hand.count(pk));
            if n != u32::from(total) {
                return Err(err(format!(
                    "piece count mismatch: {} of kind {:?} (expected {})",
                    n, pk, total
                )));
            }
        }

        // 直前に指した側が王手を受けていたら、その手は違法だったことになる。
        if !self.is_legal() {
            return Err(err(
                "the side that has just moved is in check".to_owned(),
            ));
        }

        Ok(())
    }

    /// 手数を返す。
    pub fn move_no(&self) -> u32 {
        self.move_no
    }

    /// 手番を返す。
    pub fn side_to_move(&self) -> Side {
        self.side_to_move
    }

    /// 指定したマスの駒を返す。
    pub fn piece_at(&self, sq: Square) -> Piece {
        self.board[usize::from(sq)]
    }

    /// 指定した陣営の手駒への参照を返す。
    pub fn hand(&self, side: Side) -> &Hand {
        if side == SENTE {
            &self.sente_hand
        } else {
            &self.gote_hand
        }
    }

    fn hand_mut(&mut self, side: Side) -> &mut Hand {
        if side == SENTE {
            &mut self.sente_hand
        } else {
            &mut self.gote_hand
        }
    }

    /// 指定した陣営の玉の位置を返す。
    pub fn king_square(&self, side: Side) -> Option<Square> {
        let king = Piece::new(side, KING);
        if side == SENTE {
            Square::iter().rev().find(|&sq| self.board[usize::from(sq)] == king)
        } else {
            Square::iter().find(|&sq| self.board[usize::from(sq)] == king)
        }
    }

    /// SFEN 文字列を返す。`include_move_no` が偽なら末尾の手数を省く
    /// (千日手検出用の局面シグネチャ)。
    pub fn sfen(&self, include_move_no: bool) -> String {
        let mut s = String::new();

        for row in 0..9u8 {
            if row > 0 {
                s.push('/');
            }
            let mut run = 0u32;
            for col in (0..9u8).rev() {
                let pc = self.board[usize::from(Square::from_row_col(row, col))];
                if pc == NO_PIECE {
                    run += 1;
                } else {
                    if run > 0 {
                        s.push(char::from_digit(run, 10).unwrap());
                        run = 0;
                    }
                    pc.write_ascii(&mut s);
                }
            }
            if run > 0 {
                s.push(char::from_digit(run, 10).unwrap());
            }
        }

        s.push(' ');
        s.push(if self.side_to_move == SENTE { 'b' } else { 'w' });
        s.push(' ');

        let mut hands = String::new();
        for side in Side::iter() {
            // 飛から歩への降順。
            for pk in PieceKind::iter_hand().rev() {
                let n = self.hand(side).count(pk);
                if n == 0 {
                    continue;
                }
                if n > 1 {
                    hands.push_str(&n.to_string());
                }
                Piece::new(side, pk).write_ascii(&mut hands);
            }
        }
        s.push_str(if hands.is_empty() { "-" } else { &hands });

        if include_move_no {
            s.push(' ');
            s.push_str(&self.move_no.to_string());
        }

        s
    }

    /// 玉から見て (dr, dc) 方向に伸びる利き筋を走査する。
    ///
    /// 最初にぶつかった駒が攻撃側(`attacker`)の駒のとき、距離 1 なら
    /// `near`(+ 馬龍玉)、距離 2 以上なら `far` に属する駒種であれば王手。
    fn scan_ray(&self, attacker: Side, rk: i32, ck: i32, dr: i32, dc: i32, far: u16, near: u16) -> bool {
        let mut r = rk;
        let mut c = ck;
        let mut k = 0;
        loop {
            k += 1;
            r += dr;
            c += dc;
            if !(0..9).contains(&r) || !(0..9).contains(&c) {
                return false;
            }
            let pc = self.board[(9 * r + c) as usize];
            if !pc.is_piece() {
                continue;
            }
            if pc.side() != attacker {
                return false;
            }
            let pk = pc.kind();
            return if k > 1 {
                in_mask(far, pk)
            } else {
                in_mask(NEAR_ALWAYS, pk) || in_mask(near, pk)
            };
        }
    }

    /// 指定した陣営の玉が王手を受けているかどうかを返す。
    fn king_under_check(&self, us: Side) -> bool {
        let Some(king) = self.king_square(us) else {
            return false;
        };
        let them = us.inv();
        let s = i32::from(us.sign());
        let rk = i32::from(king.row());
        let ck = i32::from(king.col());

        // 前 1 方向、前斜め 2 方向、横 2 方向、後ろ 1 方向、後ろ斜め 2 方向。
        if self.scan_ray(them, rk, ck, -s, 0, ATTACK_UP_FAR, ATTACK_UP_NEAR)
            || self.scan_ray(them, rk, ck, -s, -1, ATTACK_DIAG_FAR, ATTACK_DIAG_UP_NEAR)
            || self.scan_ray(them, rk, ck, -s, 1, ATTACK_DIAG_FAR, ATTACK_DIAG_UP_NEAR)
            || self.scan_ray(them, rk, ck, 0, -1, ATTACK_SIDE_FAR, ATTACK_SIDE_NEAR)
            || self.scan_ray(them, rk, ck, 0, 1, ATTACK_SIDE_FAR, ATTACK_SIDE_NEAR)
            || self.scan_ray(them, rk, ck, s, 0, ATTACK_SIDE_FAR, ATTACK_SIDE_NEAR)
            || self.scan_ray(them, rk, ck, s, -1, ATTACK_DIAG_FAR, ATTACK_DIAG_DOWN_NEAR)
            || self.scan_ray(them, rk, ck, s, 1, ATTACK_DIAG_FAR, ATTACK_DIAG_DOWN_NEAR)
        {
            return true;
        }

        // 桂の王手。
        let r = rk - 2 * s;
        if (0..9).contains(&r) {
            let knight = Piece::new(them, KNIGHT);
            if ck > 0 && self.board[(9 * r + ck - 1) as usize] == knight {
                return true;
            }
            if ck < 8 && self.board[(9 * r + ck + 1) as usize] == knight {
                return true;
            }
        }

        false
    }

    /// 直前に指した側が王手を受けていなければ真。偽ならその手は違法だった。
    pub fn is_legal(&self) -> bool {
        !self.king_under_check(self.side_to_move.inv())
    }

    /// 手番の側が王手を受けているかどうかを返す。
    pub fn is_check(&self) -> bool {
        self.king_under_check(self.side_to_move)
    }

    /// 指し手を規則に照らして検査する。盤面は変更しない。
    fn validate_move(&self, m: &Move) -> Result<(), ShogiError> {
        let illegal = |reason: &str| ShogiError::IllegalMove {
            reason: reason.to_owned(),
        };

        if i32::from(self.side_to_move.sign()) * i32::from(m.to_piece.inner()) <= 0 {
            return Err(illegal("side to move does not match the move"));
        }

        if m.is_drop() {
            if self.board[usize::from(m.to_cell)] != NO_PIECE {
                return Err(illegal("drop piece on occupied cell"));
            }
            let pk = m.to_piece.kind();
            if !pk.is_hand() || self.hand(m.to_piece.side()).count(pk) == 0 {
                return Err(illegal("dropping piece which is not in the player's hand"));
            }
            if !can_drop(m.to_cell, m.to_piece) {
                return Err(illegal("dropped piece would have no further move"));
            }
            if pk == PAWN {
                let col = m.to_cell.col();
                let nifu = (0..9u8)
                    .any(|row| self.board[usize::from(Square::from_row_col(row, col))] == m.to_piece);
                if nifu {
                    return Err(ShogiError::Nifu);
                }
            }
        } else {
            let from_piece = m.from_piece.ok_or_else(|| illegal("walk without from piece"))?;
            let from_cell = m.from_cell.unwrap();
            if i32::from(self.side_to_move.sign()) * i32::from(from_piece.inner()) <= 0 {
                return Err(illegal("side to move does not match the moving piece"));
            }
            if self.board[usize::from(from_cell)] != from_piece {
                return Err(illegal("from-cell does not hold the moving piece"));
            }
            if from_piece != m.to_piece && from_piece.promote() != Some(m.to_piece) {
                return Err(illegal("promotion of non-promotable piece"));
            }
            let taken = self.board[usize::from(m.to_cell)];
            if taken.is_piece() && taken.side() == self.side_to_move {
                return Err(illegal("player takes his own piece"));
            }
        }

        Ok(())
    }

    /// 指し手で局面を進める。取った駒があれば `UndoMove` として返す。
    ///
    /// 規則違反は `IllegalMove` / `Nifu` として、指した後に自玉への王手が
    /// 残る場合は局面を巻き戻した上で `UnresolvedCheck` として報告する。
    /// 検査結果は `m` の合法性キャッシュに記録される。
    pub fn do_move(&mut self, m: &mut Move) -> Result<Option<UndoMove>, ShogiError> {
        if m.legality() == Legality::Illegal {
            return Err(ShogiError::IllegalMove {
                reason: "move is cached as illegal".to_owned(),
            });
        }

        if let Err(e) = self.validate_move(m) {
            m.set_legality(Legality::Illegal);
            log::debug!("do_move({}): {}. SFEN = \"{}\"", m, e, self.sfen(true));
            return Err(e);
        }

        let undo = if m.is_drop() {
            self.board[usize::from(m.to_cell)] = m.to_piece;
            let side = m.to_piece.side();
            self.hand_mut(side).sub(m.to_piece.kind(), 1);
            None
        } else {
            let taken = self.board[usize::from(m.to_cell)];
            let undo = if taken.is_piece() {
                if taken.kind() != KING {
                    // 取った駒は成りを解いて自分の手駒に入る。
                    let us = taken.side().inv();
                    self.hand_mut(us).add(taken.kind().to_raw(), 1);
                }
                Some(UndoMove::new(taken))
            } else {
                None
            };
            self.board[usize::from(m.from_cell.unwrap())] = NO_PIECE;
            self.board[usize::from(m.to_cell)] = m.to_piece;
            undo
        };

        self.side_to_move = self.side_to_move.inv();
        self.move_no += 1;

        if m.legality() == Legality::Unknown && !self.is_legal() {
            log::debug!("illegal position (king under check) = {}", self.sfen(true));
            self.undo_move(m, undo);
            m.set_legality(Legality::Illegal);
            return Err(ShogiError::UnresolvedCheck);
        }

        m.set_legality(Legality::Legal);
        Ok(undo)
    }

    /// `do_move` を正確に巻き戻す。
    pub fn undo_move(&mut self, m: &Move, undo: Option<UndoMove>) {
        self.side_to_move = self.side_to_move.inv();
        self.move_no -= 1;

        if m.is_drop() {
            let side = m.to_piece.side();
            self.hand_mut(side).add(m.to_piece.kind(), 1);
            self.board[usize::from(m.to_cell)] = NO_PIECE;
        } else {
            let taken = undo.map_or(NO_PIECE, |u| u.taken_piece);
            if taken.is_piece() && taken.kind() != KING {
                let us = taken.side().inv();
                self.hand_mut(us).sub(taken.kind().to_raw(), 1);
            }
            self.board[usize::from(m.to_cell)] = taken;
            self.board[usize::from(m.from_cell.unwrap())] = m.from_piece.unwrap();
        }
    }

    /// 疑似合法手(自殺手などを含む)を全て生成する。
    fn generate_pseudo_legal(&self) -> MoveArray {
        let us = self.side_to_move;
        let s = i32::from(us.sign());
        let mut mvs = MoveArray::new();

        let push_walks = |pc: Piece, from: Square, to: Square, mvs: &mut MoveArray| {
            let pk = pc.kind();
            if pk.is_promotable()
                && (from.is_promotion_zone(us) || to.is_promotion_zone(us))
            {
                mvs.push(Move::walk(pc, from, pc.promote().unwrap(), to));
            }
            // 歩・香・桂は行き所のなくなるマスへは成りしか許されない。
            let must_promote = matches!(pk, PAWN | LANCE | KNIGHT) && !can_drop(to, pc);
            if !must_promote {
                mvs.push(Move::walk(pc, from, pc, to));
            }
        };

        for from in Square::iter() {
            let pc = self.board[usize::from(from)];
            if !pc.is_piece() || pc.side() != us {
                continue;
            }
            let table = move_table(pc.kind());
            let r0 = i32::from(from.row());
            let c0 = i32::from(from.col());

            for &(dr, dc) in table.steps {
                let r = r0 + i32::from(dr) * s;
                let c = c0 + i32::from(dc) * s;
                if !(0..9).contains(&r) || !(0..9).contains(&c) {
                    continue;
                }
                let to = Square::from_inner((9 * r + c) as u8);
                let target = self.board[usize::from(to)];
                if target.is_piece() && target.side() == us {
                    continue;
                }
                push_walks(pc, from, to, &mut mvs);
            }

            for &(dr, dc) in table.slides {
                let mut r = r0;
                let mut c = c0;
                loop {
                    r += i32::from(dr) * s;
                    c += i32::from(dc) * s;
                    if !(0..9).contains(&r) || !(0..9).contains(&c) {
                        break;
                    }
                    let to = Square::from_inner((9 * r + c) as u8);
                    let target = self.board[usize::from(to)];
                    if target.is_piece() && target.side() == us {
                        break;
                    }
                    push_walks(pc, from, to, &mut mvs);
                    if target.is_piece() {
                        break;
                    }
                }
            }
        }

        for pk in PieceKind::iter_hand() {
            if self.hand(us).count(pk) == 0 {
                continue;
            }
            let pc = Piece::new(us, pk);
            for to in Square::iter() {
                if self.board[usize::from(to)] == NO_PIECE && can_drop(to, pc) {
                    mvs.push(Move::drop(pc, to));
                }
            }
        }

        mvs
    }

    /// 手番の側に合法手が存在するかどうかを返す。
    /// 詰み・ステイルメイトの判定にのみ使う。
    pub fn has_legal_move(&self) -> bool {
        let mut work = self.clone();
        for mut m in self.generate_pseudo_legal() {
            if let Ok(undo) = work.do_move(&mut m) {
                work.undo_move(&m, undo);
                return true;
            }
            // 失敗時は do_move が巻き戻している。
        }
        false
    }

    /// 入玉宣言(FESA 規定)が成立するかどうかを返す。
    ///
    /// 手番の玉が敵陣にあり、玉以外の自駒が敵陣に 10 枚以上、
    /// かつ点数(飛角とその成駒が 5 点、他は 1 点、手駒も数える)が
    /// 先手 28 点・後手 27 点以上であれば成立。
    pub fn fesa_impasse_points(&self) -> bool {
        let us = self.side_to_move;
        let Some(king) = self.king_square(us) else {
            return false;
        };
        if !king.is_promotion_zone(us) {
            return false;
        }

        let value = |pk: PieceKind| -> u32 {
            if matches!(pk.to_raw(), BISHOP | ROOK) {
                5
            } else {
                1
            }
        };

        let mut count = 0u32;
        let mut points = 0u32;
        for sq in Square::iter() {
            if !sq.is_promotion_zone(us) {
                continue;
            }
            let pc = self.board[usize::from(sq)];
            if pc.is_piece() && pc.side() == us && pc.kind() != KING {
                count += 1;
                points += value(pc.kind());
            }
        }
        for pk in PieceKind::iter_hand() {
            points += u32::from(self.hand(us).count(pk)) * value(pk);
        }

        count >= 10 && points >= if us == SENTE { 28 } else { 27 }
    }

    /// USI 指し手文字列をパースして指し手を作る。
    ///
    /// 文字列の構文エラーは `InvalidMoveSyntax`、空きでないマスへの駒打ちや
    /// 自駒を取る手など明白な規則違反は `IllegalMove` になる。
    pub fn parse_usi_move(&self, s: &str) -> Result<Move, ShogiError> {
        let syntax = |reason: String| ShogiError::InvalidMoveSyntax { reason };
        let illegal = |reason: &str| ShogiError::IllegalMove {
            reason: reason.to_owned(),
        };

        let b: Vec<char> = s.chars().collect();

        if b.len() == 4 && b[1] == '*' {
            let pk = piece_kind_from_upper(b[0])
                .filter(|pk| pk.is_hand())
                .ok_or_else(|| syntax(format!("bad drop piece in '{}'", s)))?;
            let to = Square::usi_parse(b[2], b[3])
                .ok_or_else(|| syntax(format!("bad drop cell in '{}'", s)))?;
            if self.board[usize::from(to)] != NO_PIECE {
                return Err(illegal("drop piece on occupied cell"));
            }
            return Ok(Move::drop(Piece::new(self.side_to_move, pk), to));
        }

        if b.len() != 4 && !(b.len() == 5 && b[4] == '+') {
            return Err(syntax(format!("bad move string '{}'", s)));
        }

        let from = Square::usi_parse(b[0], b[1])
            .ok_or_else(|| syntax(format!("bad from cell in '{}'", s)))?;
        let to = Square::usi_parse(b[2], b[3])
            .ok_or_else(|| syntax(format!("bad to cell in '{}'", s)))?;

        let from_piece = self.board[usize::from(from)];
        if !from_piece.is_piece() {
            return Err(illegal("from-cell is empty"));
        }
        let to_piece = if b.len() == 5 {
            from_piece
                .promote()
                .ok_or_else(|| illegal("promotion of non-promotable piece"))?
        } else {
            from_piece
        };

        let target = self.board[usize::from(to)];
        if target.is_piece() && target.side() == from_piece.side() {
            return Err(illegal("player takes his own piece"));
        }

        Ok(Move::walk(from_piece, from, to_piece, to))
    }

    /// `pc` が `from` から `to` に(盤上の駒を考慮して)動けるかどうかを返す。
    /// 西洋式表記の曖昧さ解消に使う。
    fn piece_reaches(&self, pc: Piece, from: Square, to: Square) -> bool {
        let s = i32::from(pc.side().sign());
        let table = move_table(pc.kind());
        let r0 = i32::from(from.row());
        let c0 = i32::from(from.col());
        let rt = i32::from(to.row());
        let ct = i32::from(to.col());

        for &(dr, dc) in table.steps {
            if r0 + i32::from(dr) * s == rt && c0 + i32::from(dc) * s == ct {
                return true;
            }
        }
        for &(dr, dc) in table.slides {
            let mut r = r0;
            let mut c = c0;
            loop {
                r += i32::from(dr) * s;
                c += i32::from(dc) * s;
                if !(0..9).contains(&r) || !(0..9).contains(&c) {
                    break;
                }
                if r == rt && c == ct {
                    return true;
                }
                if self.board[(9 * r + c) as usize].is_piece() {
                    break;
                }
            }
        }
        false
    }

    /// 西洋式の指し手表記を返す。
    ///
    /// 駒のアルファベット、(同種の駒が同じ移動先に利いている場合のみ)移動元、
    /// 静かな手は `-`、駒取りは `x`、移動先、成りは `+`、成らずは `=`。
    /// 駒打ちは `P*76` のように表す。
    pub fn western_move_str(&self, m: &Move) -> String {
        let letter = |pk: PieceKind| -> String {
            let base = (ASCII_PIECES[usize::from(pk.to_raw().inner() - 1)] as char)
                .to_ascii_uppercase();
            if pk.is_promoted() {
                format!("+{}", base)
            } else {
                base.to_string()
            }
        };

        if m.is_drop() {
            return format!("{}*{}", letter(m.to_piece.kind()), m.to_cell.digital_str());
        }

        let from_piece = m.from_piece.unwrap();
        let from = m.from_cell.unwrap();
        let mut s = letter(from_piece.kind());

        let ambiguous = Square::iter().any(|sq| {
            sq != from
                && self.board[usize::from(sq)] == from_piece
                && self.piece_reaches(from_piece, sq, m.to_cell)
        });
        if ambiguous {
            s.push_str(&from.digital_str());
        }

        s.push(if self.board[usize::from(m.to_cell)].is_piece() {
            'x'
        } else {
            '-'
        });
        s.push_str(&m.to_cell.digital_str());

        if m.is_promotion() {
            s.push('+');
        } else {
            let us = from_piece.side();
            if from_piece.kind().is_promotable()
                && (from.is_promotion_zone(us) || m.to_cell.is_promotion_zone(us))
            {
                s.push('=');
            }
        }

        s
    }

    /// KIF 形式の盤面図を返す。KIF リーダーと正確に往復できる。
    pub fn kifu_str(&self) -> String {
        let hand_str = |hand: &Hand| -> String {
            if hand.is_empty() {
                return "なし".to_owned();
            }
            let mut items = Vec::new();
            for pk in KIFU_HAND_ORDER {
                let n = hand.count(pk);
                if n == 0 {
                    continue;
                }
                let mut item = pk.kifu_char().to_string();
                if n > 1 {
                    item.push_str(&kanji_number(u32::from(n)));
                }
                items.push(item);
            }
            items.join("　")
        };

        let mut s = String::new();
        s.push_str("後手の持駒：");
        s.push_str(&hand_str(&self.gote_hand));
        s.push('\n');
        s.push_str("  ９ ８ ７ ６ ５ ４ ３ ２ １\n");
        s.push_str("+---------------------------+\n");
        for row in 0..9u8 {
            s.push('|');
            for col in (0..9u8).rev() {
                let pc = self.board[usize::from(Square::from_row_col(row, col))];
                if pc == NO_PIECE {
                    s.push_str(" ・");
                } else {
                    s.push(if pc.side() == GOTE { 'v' } else { ' ' });
                    s.push(pc.kind().kifu_char());
                }
            }
            s.push('|');
            s.push(KIFU_ROWS[usize::from(row)]);
            s.push('\n');
        }
        s.push_str("+---------------------------+\n");
        s.push_str("先手の持駒：");
        s.push_str(&hand_str(&self.sente_hand));
        s.push('\n');
        if self.side_to_move == GOTE {
            s.push_str("後手番\n");
        }
        s
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.kifu_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_roundtrip() {
        let pos = Position::initial();
        assert_eq!(pos.sfen(true), SFEN_INITIAL);
        assert_eq!(pos.side_to_move(), SENTE);
        assert_eq!(pos.move_no(), 1);
    }

    #[test]
    fn test_reject_garbage() {
        assert!(Position::new("9 - - 1").is_err());
        assert!(Position::new("lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b -").is_err());
        assert!(Position::new("lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL x - 1").is_err());
    }

    #[test]
    fn test_reject_two_kings() {
        // 先手玉が 2 枚。
        assert!(Position::new("lnsgkgsnl/1r5b1/ppppppppp/9/9/4K4/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1").is_err());
    }

    #[test]
    fn test_do_undo_roundtrip() {
        let mut pos = Position::initial();
        let before = pos.sfen(true);
        let mut m = pos.parse_usi_move("7g7f").unwrap();
        let undo = pos.do_move(&mut m).unwrap();
        assert_ne!(pos.sfen(true), before);
        pos.undo_move(&m, undo);
        assert_eq!(pos.sfen(true), before);
    }

    #[test]
    fn test_capture_goes_to_hand_unpromoted() {
        // 先手の飛で後手の馬を取ると、手駒には角として入る。
        let mut pos =
            Position::new("lnsgkgsnl/1r7/ppppppppp/9/9/5R1+b1/PPPPPPPPP/1B7/LNSGKGSNL b - 1")
                .unwrap();
        let mut m = pos.parse_usi_move("4f2f").unwrap();
        pos.do_move(&mut m).unwrap();
        assert_eq!(pos.hand(SENTE).count(BISHOP), 1);
    }

    #[test]
    fn test_is_check() {
        // 後手玉に先手の飛が王手をかけている(後手番)。
        let pos =
            Position::new("4k4/9/4R4/9/9/9/9/9/4K4 w 2B2G2S2N2L9Pr2g2s2n2l9p 1").unwrap();
        assert!(pos.is_check());
        assert!(pos.is_legal());
    }

    #[test]
    fn test_has_legal_move_mate() {
        // 頭金の詰み。後手玉 5a、先手の金 5b、飛 5c で受けなし。
        let pos =
            Position::new("4k4/4G4/4R4/9/9/9/9/9/4K4 w B3GS2N2L9Pbr3s2n2l9p 1").unwrap();
        assert!(pos.is_check());
        assert!(!pos.has_legal_move());
    }
}
