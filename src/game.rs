//! 対局。
//!
//! 指し手列とタグ(対局者名、レーティング、日時など)、手ごとのコメント、
//! そして千日手・入玉宣言の自動検出に使う局面の出現記録を持つ。

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::error::ShogiError;
use crate::moves::Move;
use crate::position::Position;
use crate::result::GameResult;
use crate::shogi::{Side, GOTE, SENTE};

/// タグ辞書から「名前(レーティング)」形式の表示名を作る。
pub fn player_with_rating_from_tags(tags: &BTreeMap<String, String>, side: Side) -> Option<String> {
    let name = side.to_string();
    let player = tags.get(&name)?;
    match tags.get(&format!("{}_rating", name)) {
        Some(rating) => Some(format!("{}({})", player, rating)),
        None => Some(player.clone()),
    }
}

/// 対局。
#[derive(Clone, Debug)]
pub struct Game {
    tags: BTreeMap<String, String>,
    pub moves: Vec<Move>,
    /// 手数 → その手の直前に付くコメント行。
    comments: BTreeMap<u32, Vec<String>>,
    /// 開始局面の SFEN。平手初期局面から始まる場合は `None`。
    pub start_pos: Option<String>,
    /// 現在(最終手の後)の局面。
    pub pos: Position,
    start_move_no: u32,
    start_side_to_move: Side,
    game_result: Option<GameResult>,
    /// 局面シグネチャ(手数抜き SFEN) → 出現した手番号のリスト。
    repetitions: HashMap<String, Vec<usize>>,
    /// 出現順の王手フラグ。`repetitions` の値はこのリストへの添字。
    checks: Vec<bool>,
    auto_detect: bool,
}

impl Game {
    /// 対局を作る。`start_pos` が `None` なら平手初期局面から。
    pub fn new(start_pos: Option<&str>) -> Result<Self, ShogiError> {
        Self::with_options(start_pos, false)
    }

    /// 千日手などの自動検出を無効にできるコンストラクタ。
    pub fn with_options(
        start_pos: Option<&str>,
        disable_game_result_auto_detection: bool,
    ) -> Result<Self, ShogiError> {
        let pos = match start_pos {
            Some(sfen) => Position::new(sfen)?,
            None => Position::initial(),
        };
        let mut this = Self {
            tags: BTreeMap::new(),
            moves: Vec::new(),
            comments: BTreeMap::new(),
            start_pos: start_pos.map(str::to_owned),
            start_move_no: pos.move_no(),
            start_side_to_move: pos.side_to_move(),
            pos,
            game_result: None,
            repetitions: HashMap::new(),
            checks: Vec::new(),
            auto_detect: !disable_game_result_auto_detection,
        };
        this.insert_sfen();
        Ok(this)
    }

    /// 結果が記録済みかどうかを返す。
    pub fn has_result(&self) -> bool {
        self.game_result.is_some()
    }

    /// 対局結果を返す。
    pub fn result(&self) -> Option<GameResult> {
        self.game_result
    }

    /// 最終手を返す。
    pub fn last_move(&self) -> Option<&Move> {
        self.moves.last()
    }

    /// 開始局面の手数を返す。
    pub fn start_move_no(&self) -> u32 {
        self.start_move_no
    }

    /// 結果を記録する。既に結果があれば何もしない(先勝ち)。
    pub fn set_result(&mut self, game_result: GameResult) {
        if self.game_result.is_none() {
            self.game_result = Some(game_result);
        }
    }

    /// 中断された対局の後処理: 結果が無く手番側に合法手も無ければ詰みを記録する。
    pub fn adjourn(&mut self) {
        if self.game_result.is_none() && !self.pos.has_legal_move() {
            self.set_result(GameResult::Checkmate);
        }
    }

    /// 現局面を出現記録に追加し、千日手・連続王手・入玉宣言を検出する。
    fn insert_sfen(&mut self) {
        if !self.auto_detect {
            return;
        }

        let sfen = self.pos.sfen(false);
        let check = self.pos.is_check();
        let idx = self.checks.len();
        let (first, last, occurrences) = {
            let l = self.repetitions.entry(sfen.clone()).or_default();
            l.push(idx);
            (l[0], *l.last().unwrap(), l.len())
        };
        self.checks.push(check);

        if occurrences >= 2 {
            log::debug!(
                "Position '{}' was repeated {} times (first at {})",
                sfen,
                occurrences,
                first
            );
        }
        if occurrences >= 4 {
            // 同一局面 4 回。間の自分番の局面が全て王手なら連続王手の千日手で、
            // 王手をかけ続けた側の反則負けになる。
            if check && (first..last).step_by(2).all(|i| self.checks[i]) {
                self.set_result(GameResult::IllegalPrecedingMove);
            } else {
                self.set_result(GameResult::Repetition);
            }
        }
        if !check && self.pos.fesa_impasse_points() {
            // https://lishogi.org/explanation/impasse
            self.set_result(GameResult::EnteringKing);
        }
    }

    /// 指し手で対局を進める。
    ///
    /// 規則違反の手は `ILLEGAL_MOVE` として結果に記録され、以後の手は受け付けない。
    pub fn do_move(&mut self, mut m: Move) {
        if self.game_result == Some(GameResult::IllegalMove) {
            return;
        }
        match self.pos.do_move(&mut m) {
            Ok(_) => {
                self.moves.push(m);
                self.insert_sfen();
            }
            Err(e) => {
                log::debug!("illegal move {}: {}", m, e);
                self.set_result(GameResult::IllegalMove);
            }
        }
    }

    /// USI 指し手文字列で対局を進める。"resign" は投了として扱う。
    pub fn do_usi_move(&mut self, usi_move: &str) -> Result<(), ShogiError> {
        if usi_move == "resign" {
            self.set_result(GameResult::Resignation);
            return Ok(());
        }
        let m = self.pos.parse_usi_move(usi_move)?;
        self.do_move(m);
        Ok(())
    }

    /// USI の position コマンド文字列を返す。
    pub fn usi_position_command(&self) -> String {
        let mut s = String::from("position ");
        match &self.start_pos {
            None => s.push_str("startpos"),
            Some(sfen) => {
                s.push_str("sfen ");
                s.push_str(sfen);
            }
        }
        if !self.moves.is_empty() {
            s.push_str(" moves");
            for m in &self.moves {
                s.push(' ');
                s.push_str(&m.usi_str());
            }
        }
        s
    }

    /// 指定した手数の手番を返す。開始手数より小さい値には `None`。
    pub fn move_no_to_side_to_move(&self, move_no: u32) -> Option<Side> {
        if move_no < self.start_move_no {
            return None;
        }
        Some(if (move_no - self.start_move_no) % 2 == 0 {
            self.start_side_to_move
        } else {
            self.start_side_to_move.inv()
        })
    }

    /// タグの値を返す。
    pub fn get_tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// タグを設定する。
    pub fn set_tag(&mut self, key: &str, value: impl Into<String>) {
        self.tags.insert(key.to_owned(), value.into());
    }

    /// タグ辞書への参照を返す。
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// 対局者名をパースしてタグに入れる。
    /// 末尾の "(数字)" はレーティングとして `<key>_rating` に分離する。
    pub fn parse_player_name(&mut self, s: &str, key: &str) {
        if s.ends_with(')') {
            if let Some(i) = s.rfind('(') {
                let t = &s[i + 1..s.len() - 1];
                if !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()) {
                    self.set_tag(key, &s[..i]);
                    self.set_tag(&format!("{}_rating", key), t);
                    return;
                }
            }
        }
        self.set_tag(key, s);
    }

    /// 「名前(レーティング)」形式の対局者表示名を返す。
    pub fn player_with_rating(&self, side: Side) -> Option<String> {
        player_with_rating_from_tags(&self.tags, side)
    }

    /// 対局者名 → レーティングの辞書からレーティングタグを埋める。
    pub fn set_ratings(&mut self, d: &HashMap<String, u32>) {
        for side in [SENTE, GOTE] {
            let name = side.to_string();
            if let Some(rating) = self.tags.get(&name).and_then(|player| d.get(player)) {
                self.tags
                    .insert(format!("{}_rating", name), rating.to_string());
            }
        }
    }

    /// 先手から見た勝ち点を返す。結果が無いか中断なら `None`。
    pub fn sente_points(&self) -> Option<i32> {
        let mut p = self.game_result?.side_to_move_points()?;
        if self.pos.side_to_move() == GOTE {
            p = -p;
        }
        Some(p)
    }

    /// "1-0" / "0-1" / "1/2" 形式の結果文字列を返す。
    pub fn text_result(&self) -> Option<&'static str> {
        let p = self.sente_points()?;
        Some(match p.cmp(&0) {
            std::cmp::Ordering::Greater => "1-0",
            std::cmp::Ordering::Less => "0-1",
            std::cmp::Ordering::Equal => "1/2",
        })
    }

    /// 両対局者の累計消費時間の合計(秒)を返す。
    /// どちらかの累計時間が分からなければ `None`。
    pub fn total_time(&self) -> Option<u64> {
        let mut sente_time: Option<Duration> = None;
        let mut gote_time: Option<Duration> = None;
        for m in self.moves.iter().rev() {
            let Some(cum) = m.cum_time else { continue };
            let slot = if m.to_piece.side() == SENTE {
                &mut sente_time
            } else {
                &mut gote_time
            };
            if slot.is_none() {
                *slot = Some(cum);
            }
            if sente_time.is_some() && gote_time.is_some() {
                break;
            }
        }
        Some((sente_time? + gote_time?).as_secs())
    }

    /// 全ての手の消費時間が 0 または未設定なら、時間情報を全て落とす。
    pub fn drop_zero_times(&mut self) {
        if self.moves.iter().all(Move::zero_or_none_time) {
            for m in &mut self.moves {
                m.drop_times();
            }
        }
    }

    /// 指定した手の直前に付くコメントを追加する。
    pub fn append_comment_before_move(&mut self, move_no: u32, s: impl Into<String>) {
        self.comments.entry(move_no).or_default().push(s.into());
    }

    /// 指定した手の直前に付くコメントを返す。
    pub fn comments_before_move(&self, move_no: u32) -> &[String] {
        self.comments.get(&move_no).map_or(&[], Vec::as_slice)
    }

    /// 到達した全局面の手数 → SFEN の表を返す。
    pub fn positions(&self) -> BTreeMap<u32, String> {
        let mut pos = match &self.start_pos {
            Some(sfen) => Position::new(sfen).expect("start_pos was validated at construction"),
            None => Position::initial(),
        };
        let mut d = BTreeMap::new();
        d.insert(pos.move_no(), pos.sfen(true));
        for m in &self.moves {
            let mut m = m.clone();
            if pos.do_move(&mut m).is_err() {
                break;
            }
            d.insert(pos.move_no(), pos.sfen(true));
        }
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_player_name() {
        let mut g = Game::new(None).unwrap();
        g.parse_player_name("sakura(1850)", "sente");
        assert_eq!(g.get_tag("sente"), Some("sakura"));
        assert_eq!(g.get_tag("sente_rating"), Some("1850"));
        assert_eq!(g.player_with_rating(SENTE).as_deref(), Some("sakura(1850)"));

        g.parse_player_name("no_rating()", "gote");
        assert_eq!(g.get_tag("gote"), Some("no_rating()"));
    }

    #[test]
    fn test_usi_position_command() {
        let mut g = Game::new(None).unwrap();
        g.do_usi_move("7g7f").unwrap();
        g.do_usi_move("3c3d").unwrap();
        assert_eq!(g.usi_position_command(), "position startpos moves 7g7f 3c3d");
    }

    #[test]
    fn test_resign_points() {
        let mut g = Game::new(None).unwrap();
        g.do_usi_move("7g7f").unwrap();
        g.do_usi_move("resign").unwrap();
        assert_eq!(g.result(), Some(GameResult::Resignation));
        // 後手番での投了なので先手の勝ち。
        assert_eq!(g.sente_points(), Some(1));
        assert_eq!(g.text_result(), Some("1-0"));
    }

    #[test]
    fn test_move_no_to_side_to_move() {
        let g = Game::new(None).unwrap();
        assert_eq!(g.move_no_to_side_to_move(1), Some(SENTE));
        assert_eq!(g.move_no_to_side_to_move(2), Some(GOTE));
        assert_eq!(g.move_no_to_side_to_move(0), None);
    }

    #[test]
    fn test_illegal_move_recorded() {
        let mut g = Game::new(None).unwrap();
        // 初手から後手の駒を動かそうとする。
        let m = g.pos.parse_usi_move("3c3d").unwrap();
        g.do_move(m);
        assert_eq!(g.result(), Some(GameResult::IllegalMove));
        assert!(g.moves.is_empty());
        assert_eq!(g.sente_points(), Some(-1));
    }
}
