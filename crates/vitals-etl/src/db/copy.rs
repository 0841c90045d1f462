//! Streaming `COPY ... FROM STDIN` for CSV files

use sqlx::PgConnection;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::debug;

use super::schema::quote_ident;
use super::DbResult;

/// Bytes sent per CopyData message.
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Stream `csv_path` into `table` over the COPY channel.
///
/// The file must carry a header row and its columns must follow the table's
/// column order. Runs on whatever transaction `conn` is in; the caller commits
/// or rolls back.
pub(crate) async fn copy_file_in(
    conn: &mut PgConnection,
    table: &str,
    csv_path: &Path,
) -> DbResult<u64> {
    let mut file = tokio::fs::File::open(csv_path).await?;

    let statement = format!(
        "COPY {} FROM STDIN WITH (FORMAT csv, HEADER true)",
        quote_ident(table)
    );
    let mut copy = conn.copy_in_raw(&statement).await?;

    let mut buffer = vec![0u8; COPY_CHUNK_SIZE];
    loop {
        let read = match file.read(&mut buffer).await {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) => {
                copy.abort(format!("failed to read {}: {}", csv_path.display(), e))
                    .await?;
                return Err(e.into());
            },
        };
        copy.send(&buffer[..read]).await?;
    }

    let rows = copy.finish().await?;
    debug!(table, rows, path = %csv_path.display(), "COPY finished");

    Ok(rows)
}
