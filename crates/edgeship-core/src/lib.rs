//! edgeship core
//!
//! `site.kdl` の読み込みと、デプロイ対象を表す不変の [`DeploymentSpec`] への変換を担当します。

pub mod error;
pub mod model;
pub mod parser;

pub use error::{CoreError, Result};
pub use model::*;
pub use parser::{parse_site_file, parse_site_string};
