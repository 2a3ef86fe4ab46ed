mod account;
mod money;
mod policy;
mod transaction;
mod user;

pub use account::*;
pub use money::*;
pub use policy::*;
pub use transaction::*;
pub use user::*;
