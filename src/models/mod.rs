pub mod proof;
pub mod receipt;
pub mod response;
pub mod upi;
pub mod user;

pub use proof::*;
pub use receipt::*;
pub use response::*;
pub use upi::*;
pub use user::*;
