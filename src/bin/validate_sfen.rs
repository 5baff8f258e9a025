//! SFEN のリストを検証する。1 行 1 SFEN のファイルを読み、
//! 不正な行をログに出して終了コードで報告する。

use std::path::PathBuf;

use anyhow::{ensure, Context as _};
use structopt::StructOpt;

use shogidb::Position;

#[derive(Debug, StructOpt)]
struct Opt {
    /// 1 行 1 SFEN のファイル。
    #[structopt(parse(from_os_str))]
    file: PathBuf,

    /// デバッグログも出力する。
    #[structopt(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(if opt.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .chain(std::io::stdout())
        .apply()?;

    let body = std::fs::read_to_string(&opt.file)
        .with_context(|| format!("cannot read {}", opt.file.display()))?;

    let mut ok = 0u32;
    let mut bad = 0u32;
    for (lineno, line) in body.lines().enumerate() {
        let sfen = line.trim();
        if sfen.is_empty() {
            continue;
        }
        match Position::new(sfen) {
            Ok(_) => ok += 1,
            Err(e) => {
                bad += 1;
                log::error!("line {}: {}: {}", lineno + 1, e, sfen);
            }
        }
    }

    log::info!("{} valid, {} invalid", ok, bad);
    ensure!(bad == 0, "{} invalid sfen lines", bad);

    Ok(())
}
