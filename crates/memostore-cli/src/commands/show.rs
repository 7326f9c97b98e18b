//! `show` command.

use memostore_core::error::AppError;
use memostore_store::ResourceStore;

use super::KeyArgs;
use crate::output::{self, OutputFormat, Status};

/// Show the stored entry for a key. Nothing is generated on a miss.
pub async fn execute(
    store: &ResourceStore,
    args: &KeyArgs,
    format: OutputFormat,
) -> Result<(), AppError> {
    let key = args.parse_key()?;

    match store.get(&key).await {
        Ok(entry) => {
            output::print_item(&entry, format);
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            output::print_status(Status::Warning, &e.message, format);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
