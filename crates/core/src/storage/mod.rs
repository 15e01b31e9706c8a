mod error;
mod traits;
mod types;
mod update;

pub use error::{RepositoryError, Result, StoreError};
pub use traits::{StoreClient, StoreResult};
pub use types::{
    from_item, key_of, project_key, to_item, Item, Key, Page, QueryParams, ScanParams,
    WriteCondition, WriteRequest,
};
pub use update::{build_update_expression, PartialUpdate, UpdateExpression};
