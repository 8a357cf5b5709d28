pub mod candle;
pub mod frame;

pub use candle::*;
pub use frame::*;
