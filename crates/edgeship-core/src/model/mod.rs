//! データモデル定義

mod dns;
mod site;
mod spec;

pub use dns::*;
pub use site::*;
pub use spec::*;
