pub mod check;
pub mod inspect;
pub mod migrate;
pub mod request;
pub mod util;
