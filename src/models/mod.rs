pub mod item;
pub mod listing;
pub mod order;
pub mod response;
pub mod shipping;
pub mod wallet;

pub use item::*;
pub use listing::*;
pub use order::*;
pub use response::*;
pub use shipping::*;
pub use wallet::*;
