use criterion::{black_box, criterion_group, criterion_main, Criterion};

use shogidb::*;

criterion_group!(benches, bench);
criterion_main!(benches);

// 先手が四間飛車から美濃囲いを組む 12 手。
const GAME_MOVES: [&str; 12] = [
    "2h6h", "9c9d", "5i4h", "1c1d", "4h3h", "5c5d", "3h2h", "8c8d", "3i3h", "4c4d", "6i5h",
    "6c6d",
];

fn build_game() -> Game {
    let mut g = Game::new(None).unwrap();
    for usi in GAME_MOVES {
        g.do_usi_move(usi).unwrap();
    }
    g
}

pub fn bench(c: &mut Criterion) {
    c.bench_function("do_undo_moves", |b| {
        let mut pos = Position::initial();
        let moves: Vec<Move> = {
            let mut p = Position::initial();
            GAME_MOVES
                .iter()
                .map(|usi| {
                    let mut m = p.parse_usi_move(usi).unwrap();
                    p.do_move(&mut m).unwrap();
                    m
                })
                .collect()
        };
        b.iter(|| {
            let mut undos = Vec::with_capacity(moves.len());
            for m in &moves {
                let mut m = m.clone();
                let undo = pos.do_move(&mut m).unwrap();
                undos.push((m, undo));
            }
            for (m, undo) in undos.into_iter().rev() {
                pos.undo_move(&m, undo);
            }
        })
    });

    let game = build_game();

    c.bench_function("find_castles", |b| {
        b.iter(|| game_find_castles(black_box(&game)))
    });

    c.bench_function("find_openings", |b| {
        b.iter(|| game_find_openings(black_box(&game)))
    });

    c.bench_function("sfen_roundtrip", |b| {
        let sfen = "l4+N+R1l/2ksg4/p2p1s3/2p1pp1N1/6S1p/2r2P3/PP1P1g2P/1G1S2+b2/LN1K4L b BGN3P4p 85";
        b.iter(|| Position::new(black_box(sfen)).unwrap().sfen(true))
    });
}
