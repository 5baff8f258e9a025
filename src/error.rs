//! コアのエラー型。
//!
//! 局面・指し手の規則違反は全てここの enum で表す。KIF ファイル単位の
//! 構文エラーは `anyhow` で文脈を付けて報告する(`kifu` モジュール参照)。

use thiserror::Error;

/// 将棋規則まわりのエラー。
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ShogiError {
    /// SFEN の構文違反、または局面不変条件(玉の数、駒数、王手)の違反。
    #[error("invalid sfen: {reason}")]
    InvalidSfen { reason: String },

    /// USI / KIF の指し手トークンが解釈できない。
    #[error("invalid move syntax: {reason}")]
    InvalidMoveSyntax { reason: String },

    /// 指し手が規則に違反している(駒のない移動元、自駒の取り、
    /// 持っていない駒打ち、成れない駒の成り、など)。
    #[error("illegal move: {reason}")]
    IllegalMove { reason: String },

    /// 二歩。`IllegalMove` の特殊形。
    #[error("two unpromoted pawns on the same file")]
    Nifu,

    /// 指した後に自玉に王手が残る。局面は着手前に巻き戻されている。
    #[error("the mover's king is left under check")]
    UnresolvedCheck,
}

impl ShogiError {
    /// 指し手の規則違反(`Game` が `ILLEGAL_MOVE` として記録すべきもの)かどうかを返す。
    pub fn is_illegal_move(&self) -> bool {
        matches!(
            self,
            Self::IllegalMove { .. } | Self::Nifu | Self::UnresolvedCheck
        )
    }
}
