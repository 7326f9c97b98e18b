//! `delete` command.

use memostore_core::error::AppError;
use memostore_store::ResourceStore;

use super::KeyArgs;
use crate::output::{self, OutputFormat, Status};

/// Delete the stored entry for a key.
pub async fn execute(
    store: &ResourceStore,
    args: &KeyArgs,
    format: OutputFormat,
) -> Result<(), AppError> {
    let key = args.parse_key()?;
    store.delete(&key).await?;
    output::print_status(
        Status::Ok,
        &format!("Deleted entry for {}", args.key),
        format,
    );
    Ok(())
}
