pub mod candles;
pub mod catalog;
pub mod pool;
pub mod signals;
