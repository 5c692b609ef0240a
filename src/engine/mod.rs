pub mod dispatch;
pub mod pairing;
pub mod performance;
