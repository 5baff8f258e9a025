mod castles;
mod error;
mod evaluation;
mod game;
mod kifu;
mod moves;
mod openings;
mod pattern;
mod position;
mod result;
mod shogi;

pub use self::castles::*;
pub use self::error::*;
pub use self::evaluation::*;
pub use self::game::*;
pub use self::kifu::*;
pub use self::moves::*;
pub use self::openings::*;
pub use self::pattern::*;
pub use self::position::*;
pub use self::result::*;
pub use self::shogi::*;
