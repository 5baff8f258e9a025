//! KIF 形式の読み書き。
//!
//! ヘッダ(全角コロン区切り)、指し手行、消費時間、コメント、終局語彙、
//! 盤面図をサポートする。このライターが書いたファイルをリーダーで読むと、
//! タグ・指し手・結果の等しい `Game` が復元される。
//!
//! ファイル単位の構文エラーは `anyhow` で文脈付きのエラーとして報告する。
//! 呼び出し側は読めなかったファイルを単に飛ばせばよい。

use anyhow::{bail, ensure, Context as _};
use std::time::Duration;

use crate::game::Game;
use crate::moves::Move;
use crate::position::Position;
use crate::result::GameResult;
use crate::shogi::*;

/// KIF の指し手行の直前に置かれる区切り行。
pub const KIFU_SEPARATOR: &str = "手数----指手---------消費時間--";

/// 盤面図・持駒表示での駒の並び順(飛から歩への降順)。
pub const KIFU_HAND_ORDER: [PieceKind; 7] = [ROOK, BISHOP, GOLD, SILVER, KNIGHT, LANCE, PAWN];

/// KIF ヘッダのキーと内部タグ名の対応表。
const KIFU_HEADER_TAGS: [(&str, &str); 6] = [
    ("開始日時", "start_date"),
    ("終了日時", "end_date"),
    ("場所", "location"),
    ("棋戦", "event"),
    ("持ち時間", "time_control"),
    ("手合割", "handicap"),
];

const KANJI_DIGITS: [char; 9] = ['一', '二', '三', '四', '五', '六', '七', '八', '九'];

/// 1 から 18 の漢数字表記を返す。持駒の枚数表示に使う。
pub fn kanji_number(n: u32) -> String {
    debug_assert!((1..=18).contains(&n));

    let mut s = String::new();
    if n >= 10 {
        s.push('十');
    }
    let d = n % 10;
    if d > 0 {
        s.push(KANJI_DIGITS[(d - 1) as usize]);
    }
    s
}

/// 漢数字(一 から 十八)をパースする。
pub fn parse_kanji_number(s: &str) -> Option<u32> {
    let mut it = s.chars().peekable();
    let mut n = 0u32;
    if it.peek() == Some(&'十') {
        it.next();
        n = 10;
    }
    if let Some(&c) = it.peek() {
        let d = KANJI_DIGITS.iter().position(|&k| k == c)? as u32 + 1;
        it.next();
        n += d;
    }
    if n == 0 || it.next().is_some() {
        return None;
    }
    Some(n)
}

fn kifu_col(c: char) -> Option<u8> {
    KIFU_COLS.iter().position(|&k| k == c).map(|i| i as u8)
}

fn kifu_row(c: char) -> Option<u8> {
    KIFU_ROWS.iter().position(|&k| k == c).map(|i| i as u8)
}

/// 棋譜用一文字表記(と、杏、圭、全、馬、龍 を含む)から駒種を求める。
fn piece_kind_from_kifu_char(c: char) -> Option<PieceKind> {
    // 王は玉と同じ扱いにする。
    if c == '王' {
        return Some(KING);
    }
    const GLYPHS: [char; 15] = [
        '歩', '香', '桂', '銀', '金', '角', '飛', '玉', 'と', '杏', '圭', '全', '？', '馬', '龍',
    ];
    let inner = GLYPHS.iter().position(|&k| k == c)? as u8 + 1;
    (inner != 13).then(|| PieceKind::from_inner(inner))
}

/// KIF の指し手トークン("７六歩(77)", "同　銀(39)", "５五角打",
/// "２三歩成(24)", "３三成桂(43)" など)をパースする。
///
/// `side_to_move` は指す側。"同" の解決には直前の指し手が要る。
/// 解釈できないトークンには `None` を返す。
pub fn move_parse(s: &str, side_to_move: Side, last_move: Option<&Move>) -> Option<Move> {
    let mut it = s.chars().peekable();

    let first = it.next()?;
    let to_cell = if first == '同' {
        // 慣習的に全角空白が続くが、無くても受け付ける。
        if it.peek() == Some(&'\u{3000}') {
            it.next();
        }
        match last_move {
            Some(m) => m.to_cell,
            None => {
                log::debug!("'同' without last move in '{}'", s);
                return None;
            }
        }
    } else {
        let col = kifu_col(first)?;
        let row = kifu_row(it.next()?)?;
        Square::from_row_col(row, col)
    };

    // 駒。「成香」などの成駒名にも対応する。
    let mut pc_char = it.next()?;
    let pk = if pc_char == '成' {
        pc_char = it.next()?;
        piece_kind_from_kifu_char(pc_char)?.to_promoted()?
    } else {
        piece_kind_from_kifu_char(pc_char)?
    };

    let mut promoted = false;
    let mut t = it.next()?;
    if t == '成' {
        promoted = true;
        t = it.next()?;
    }

    if t == '打' {
        if promoted || it.next().is_some() || !pk.is_hand() {
            return None;
        }
        return Some(Move::drop(Piece::new(side_to_move, pk), to_cell));
    }

    if t != '(' {
        log::debug!("expected '(', but '{}' found in '{}'", t, s);
        return None;
    }
    let col = it.next()?.to_digit(10)?;
    let row = it.next()?.to_digit(10)?;
    if it.next()? != ')' || it.next().is_some() {
        return None;
    }
    if !(1..=9).contains(&col) || !(1..=9).contains(&row) {
        return None;
    }
    let from_cell = Square::from_row_col(row as u8 - 1, col as u8 - 1);

    let from_piece = Piece::new(side_to_move, pk);
    let to_piece = if promoted {
        from_piece.promote()?
    } else {
        from_piece
    };
    Some(Move::walk(from_piece, from_cell, to_piece, to_cell))
}

/// 指し手を KIF トークンにエンコードする。移動先は常に明示する(「同」は使わない)。
pub fn move_kifu_str(m: &Move) -> String {
    let mut s = m.to_cell.kifu_str();
    if m.is_drop() {
        s.push_str(&m.to_piece.kind().kifu_str());
        s.push('打');
    } else {
        s.push_str(&m.from_piece.unwrap().kind().kifu_str());
        if m.is_promotion() {
            s.push('成');
        }
        s.push('(');
        s.push_str(&m.from_cell.unwrap().digital_str());
        s.push(')');
    }
    s
}

fn parse_mmss(s: &str) -> Option<Duration> {
    let (m, sec) = s.split_once(':')?;
    let m: u64 = m.trim().parse().ok()?;
    let sec: u64 = sec.trim().parse().ok()?;
    Some(Duration::from_secs(m * 60 + sec))
}

fn parse_hhmmss(s: &str) -> Option<Duration> {
    let mut it = s.split(':');
    let h: u64 = it.next()?.trim().parse().ok()?;
    let m: u64 = it.next()?.trim().parse().ok()?;
    let sec: u64 = it.next()?.trim().parse().ok()?;
    if it.next().is_some() {
        return None;
    }
    Some(Duration::from_secs(h * 3600 + m * 60 + sec))
}

/// 消費時間表記 "( 0:02/00:00:04)" を書く。
fn time_str(time: Duration, cum: Duration) -> String {
    let t = time.as_secs();
    let c = cum.as_secs();
    format!(
        "({:2}:{:02}/{:02}:{:02}:{:02})",
        t / 60,
        t % 60,
        c / 3600,
        (c / 60) % 60,
        c % 60
    )
}

/// 指し手行の残りから指し手トークンと消費時間を切り出す。
///
/// 移動元の括弧 "(77)" と消費時間の括弧は、後者だけが ':' を含むことで
/// 区別できる。
fn split_move_and_time(rest: &str) -> (&str, Option<(Duration, Duration)>) {
    for (i, c) in rest.char_indices() {
        if c != '(' {
            continue;
        }
        if let Some(j) = rest[i..].find(')') {
            let inner = &rest[i + 1..i + j];
            if inner.contains(':') {
                if let Some(times) = inner.split_once('/').and_then(|(a, b)| {
                    Some((parse_mmss(a.trim())?, parse_hhmmss(b.trim())?))
                }) {
                    return (rest[..i].trim(), Some(times));
                }
            }
        }
    }
    (rest.trim(), None)
}

/// 持駒行("飛　歩四" や "なし")をパースする。
fn parse_hand_line(s: &str) -> anyhow::Result<Vec<(PieceKind, u32)>> {
    let s = s.trim_matches(|c: char| c.is_whitespace());
    if s.is_empty() || s == "なし" {
        return Ok(Vec::new());
    }
    let mut res = Vec::new();
    for item in s.split(|c: char| c.is_whitespace()) {
        if item.is_empty() {
            continue;
        }
        let mut it = item.chars();
        let c = it.next().unwrap();
        let pk = piece_kind_from_kifu_char(c)
            .filter(|pk| pk.is_hand())
            .with_context(|| format!("bad hand piece '{}'", item))?;
        let rest: String = it.collect();
        let n = if rest.is_empty() {
            1
        } else {
            parse_kanji_number(&rest).with_context(|| format!("bad hand count '{}'", item))?
        };
        res.push((pk, n));
    }
    Ok(res)
}

/// 盤面図(後手の持駒行から先手の持駒行まで)をパースして SFEN を組み立てる。
/// `gote_hand_line` は「後手の持駒：」の後ろの部分。
fn parse_diagram<'a, I>(
    gote_hand_line: &str,
    lines: &mut std::iter::Peekable<I>,
) -> anyhow::Result<String>
where
    I: Iterator<Item = &'a str>,
{
    let gote_hand = parse_hand_line(gote_hand_line)?;

    // 筋の見出し行と上辺の罫線。
    let header = lines.next().context("diagram is truncated")?;
    ensure!(header.contains('９'), "bad diagram column header: {}", header);
    let border = lines.next().context("diagram is truncated")?;
    ensure!(border.starts_with("+-"), "bad diagram border: {}", border);

    let mut board = [NO_PIECE; 81];
    for row in 0..9u8 {
        let line = lines.next().context("diagram is truncated")?;
        let mut it = line.chars();
        ensure!(it.next() == Some('|'), "diagram row must start with '|': {}", line);
        for col in (0..9u8).rev() {
            let mark = it.next().context("diagram row is truncated")?;
            let glyph = it.next().context("diagram row is truncated")?;
            if glyph == '・' {
                continue;
            }
            let pk = piece_kind_from_kifu_char(glyph)
                .with_context(|| format!("bad diagram piece '{}'", glyph))?;
            let side = if mark == 'v' { GOTE } else { SENTE };
            board[usize::from(Square::from_row_col(row, col))] = Piece::new(side, pk);
        }
    }

    let border = lines.next().context("diagram is truncated")?;
    ensure!(border.starts_with("+-"), "bad diagram border: {}", border);

    let sente_line = lines.next().context("diagram is truncated")?;
    let sente_hand_line = sente_line
        .strip_prefix("先手の持駒：")
        .with_context(|| format!("expected sente hand line, got: {}", sente_line))?;
    let sente_hand = parse_hand_line(sente_hand_line)?;

    let mut gote_to_move = false;
    if lines.peek().map(|l| l.trim()) == Some("後手番") {
        lines.next();
        gote_to_move = true;
    }

    // SFEN を組み立てる。検証は Position::new に任せる。
    let mut sfen = String::new();
    for row in 0..9u8 {
        if row > 0 {
            sfen.push('/');
        }
        let mut run = 0u32;
        for col in (0..9u8).rev() {
            let pc = board[usize::from(Square::from_row_col(row, col))];
            if pc == NO_PIECE {
                run += 1;
            } else {
                if run > 0 {
                    sfen.push(char::from_digit(run, 10).unwrap());
                    run = 0;
                }
                pc.write_ascii(&mut sfen);
            }
        }
        if run > 0 {
            sfen.push(char::from_digit(run, 10).unwrap());
        }
    }
    sfen.push(' ');
    sfen.push(if gote_to_move { 'w' } else { 'b' });
    sfen.push(' ');
    let mut hands = String::new();
    for (side, hand) in [(SENTE, &sente_hand), (GOTE, &gote_hand)] {
        for &(pk, n) in hand {
            if n > 1 {
                hands.push_str(&n.to_string());
            }
            Piece::new(side, pk).write_ascii(&mut hands);
        }
    }
    sfen.push_str(if hands.is_empty() { "-" } else { &hands });
    sfen.push_str(" 1");

    Ok(sfen)
}

/// KIF テキストをパースして対局を作る。
///
/// 結果が記録されておらず手番側に合法手も無い場合は詰みを補う。
pub fn game_parse(text: &str) -> anyhow::Result<Game> {
    let mut lines = text.lines().map(|l| l.trim_end_matches('\r')).peekable();

    let mut tags: Vec<(String, String)> = Vec::new();
    let mut sente_name: Option<String> = None;
    let mut gote_name: Option<String> = None;
    let mut start_sfen: Option<String> = None;

    // ヘッダ部。
    loop {
        let Some(line) = lines.next() else {
            bail!("kif has no move section separator");
        };
        if line.starts_with(KIFU_SEPARATOR) {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("後手の持駒：") {
            start_sfen =
                Some(parse_diagram(rest, &mut lines).context("cannot parse board diagram")?);
            continue;
        }
        if let Some((key, value)) = line.split_once('：') {
            match key {
                "先手" => sente_name = Some(value.to_owned()),
                "後手" => gote_name = Some(value.to_owned()),
                // 平手はライターが常に書く既定値なのでタグには残さない。
                "手合割" if value == "平手" => {}
                _ => {
                    if let Some((_, tag)) = KIFU_HEADER_TAGS.iter().find(|(jp, _)| *jp == key) {
                        tags.push((tag.to_string(), value.to_owned()));
                    } else {
                        log::warn!("unknown kif header '{}'", key);
                    }
                }
            }
            continue;
        }
        log::warn!("unrecognized kif header line '{}'", line);
    }

    // 盤面図入りでも平手初期局面なら startpos 扱いにする。
    if start_sfen.as_deref() == Some(crate::position::SFEN_INITIAL) {
        start_sfen = None;
    }

    let mut g = Game::new(start_sfen.as_deref())
        .map_err(|e| anyhow::anyhow!("bad start position: {}", e))?;
    for (key, value) in tags {
        g.set_tag(&key, value);
    }
    if let Some(name) = sente_name {
        g.parse_player_name(&name, "sente");
    }
    if let Some(name) = gote_name {
        g.parse_player_name(&name, "gote");
    }

    // 指し手部。
    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("まで") {
            continue;
        }
        if let Some(comment) = line.strip_prefix('*') {
            g.append_comment_before_move(g.pos.move_no(), comment);
            continue;
        }

        let rest = line.trim_start_matches(|c: char| c.is_ascii_digit()).trim();
        ensure!(rest.len() < line.len(), "move line has no number: {}", line);

        let (token, times) = split_move_and_time(rest);
        if let Some(result) = GameResult::from_japan_str(token) {
            g.set_result(result);
            break;
        }

        let mut m = move_parse(token, g.pos.side_to_move(), g.last_move())
            .with_context(|| format!("cannot parse move '{}'", token))?;
        if let Some((t, c)) = times {
            m.time = Some(t);
            m.cum_time = Some(c);
        }
        g.do_move(m);
        if g.result() == Some(GameResult::IllegalMove) {
            break;
        }
    }

    g.adjourn();
    Ok(g)
}

/// 対局を KIF テキストにエンコードする。
pub fn game_write(g: &Game) -> String {
    let mut s = String::from("#KIF version=2.0 encoding=UTF-8\n");

    for (jp, tag) in [
        ("開始日時", "start_date"),
        ("終了日時", "end_date"),
        ("場所", "location"),
        ("棋戦", "event"),
        ("持ち時間", "time_control"),
    ] {
        if let Some(v) = g.get_tag(tag) {
            s.push_str(jp);
            s.push('：');
            s.push_str(v);
            s.push('\n');
        }
    }

    match &g.start_pos {
        None => {
            s.push_str("手合割：");
            s.push_str(g.get_tag("handicap").unwrap_or("平手"));
            s.push('\n');
        }
        Some(sfen) => {
            let pos = Position::new(sfen).expect("start_pos was validated at construction");
            s.push_str(&pos.kifu_str());
        }
    }

    if let Some(p) = g.player_with_rating(SENTE) {
        s.push_str("先手：");
        s.push_str(&p);
        s.push('\n');
    }
    if let Some(p) = g.player_with_rating(GOTE) {
        s.push_str("後手：");
        s.push_str(&p);
        s.push('\n');
    }

    s.push_str(KIFU_SEPARATOR);
    s.push('\n');

    let mut no = g.start_move_no();
    for m in &g.moves {
        for c in g.comments_before_move(no) {
            s.push('*');
            s.push_str(c);
            s.push('\n');
        }
        s.push_str(&format!("{:4} {}", no, move_kifu_str(m)));
        if let (Some(t), Some(ct)) = (m.time, m.cum_time) {
            s.push_str("   ");
            s.push_str(&time_str(t, ct));
        }
        s.push('\n');
        no += 1;
    }

    if let Some(r) = g.result() {
        for c in g.comments_before_move(no) {
            s.push('*');
            s.push_str(c);
            s.push('\n');
        }
        s.push_str(&format!("{:4} {}\n", no, r.japan_str()));
    }

    s
}
