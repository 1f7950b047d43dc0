#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod error;
pub mod store;

pub mod io {
    pub use oxrdfio::RdfFormat;
    pub use sparesults::QueryResultsFormat;
}

pub mod model {
    pub use kgsql_model::*;
}

pub mod sparql {
    pub use kgsql_engine::sparql::*;
}

pub mod storage {
    pub use kgsql_storage::*;
}

pub mod frames {
    pub use kgsql_frames::*;
}
