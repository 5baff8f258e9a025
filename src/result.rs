//! 対局結果。
//!
//! KIF の終局語彙との対応は閉じた双方向の表になっている。

/// 対局結果。
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum GameResult {
    Aborted,
    Resignation,
    Repetition,
    Checkmate,
    Time,
    IllegalPrecedingMove,
    IllegalMove,
    EnteringKing,
    BadConnection,
}

impl GameResult {
    /// 全ての結果を列挙する。
    pub const ALL: [GameResult; 9] = [
        Self::Aborted,
        Self::Resignation,
        Self::Repetition,
        Self::Checkmate,
        Self::Time,
        Self::IllegalPrecedingMove,
        Self::IllegalMove,
        Self::EnteringKing,
        Self::BadConnection,
    ];

    /// KIF の終局語彙(日本語)を返す。
    pub const fn japan_str(self) -> &'static str {
        match self {
            Self::Aborted => "中断",
            Self::Resignation => "投了",
            Self::Repetition => "千日手",
            Self::Checkmate => "詰み",
            Self::Time => "切れ負け",
            Self::IllegalPrecedingMove => "反則勝ち",
            Self::IllegalMove => "反則負け",
            Self::EnteringKing => "入玉勝ち",
            Self::BadConnection => "接続切れにて終局",
        }
    }

    /// 手番側から見た勝ち点(+1 勝ち、-1 負け、0 引き分け)を返す。
    /// 中断は勝敗が付かないので `None`。
    pub const fn side_to_move_points(self) -> Option<i32> {
        match self {
            Self::Aborted => None,
            Self::Resignation => Some(-1),
            Self::Repetition => Some(0),
            Self::Checkmate => Some(-1),
            Self::Time => Some(-1),
            Self::IllegalPrecedingMove => Some(1),
            Self::IllegalMove => Some(-1),
            Self::EnteringKing => Some(1),
            Self::BadConnection => Some(-1),
        }
    }

    /// 英語の説明文を返す。
    pub const fn description(self) -> &'static str {
        match self {
            Self::Aborted => "Game was aborted.",
            Self::Resignation => "The player whose turn it was, is the one who resigned.",
            Self::Repetition => "Four-fold repetition.",
            Self::Checkmate => {
                "Checkmate or stalemate. The player whose turn it was, is the one who is checkmated."
            }
            Self::Time => "Losing on time. The player whose turn it was, is the one who ran out of time.",
            Self::IllegalPrecedingMove => "Indicates that the immediately preceding move was illegal.",
            Self::IllegalMove => {
                "Indicates that the player whose turn this was supposed to be somehow lost by illegality."
            }
            Self::EnteringKing => {
                "Indicates that the player whose turn it was, declared win by entering king."
            }
            Self::BadConnection => "The player whose turn it was, lost by disconnection.",
        }
    }

    /// KIF の終局語彙から結果を求める。
    pub fn from_japan_str(jp: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.japan_str() == jp)
    }
}

impl std::fmt::Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.japan_str())
    }
}
