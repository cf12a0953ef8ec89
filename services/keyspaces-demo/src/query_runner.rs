use std::io::Write;
use std::sync::Arc;
use futures::StreamExt;
use tokio::time::Instant;
use tracing::info;

use svckit::{
    database::DatabaseConnection,
    errors::ClientError,
    metrics,
};

const COLUMN_DELIMITER: &str = " | ";

/// Issues read statements and drains their rows, optionally rendering a table.
pub struct QueryRunner {
    conn: Arc<dyn DatabaseConnection>,
}

impl QueryRunner {
    pub fn new(conn: Arc<dyn DatabaseConnection>) -> Self {
        Self { conn }
    }

    /// Returns the number of rows the statement yielded.
    ///
    /// Stats are logged even when iteration fails part-way.
    pub async fn run<W: Write>(
        &self,
        label: &str,
        statement: &str,
        print: bool,
        collect_stats: bool,
        out: &mut W,
    ) -> Result<u64, ClientError> {
        let begin = Instant::now();
        let mut rows = 0u64;

        let result = self.drain(statement, print, out, &mut rows).await;

        metrics::record_operation("query", result.is_ok(), begin.elapsed().as_secs_f64());
        if collect_stats {
            info!("{}: printQuery: rows={} elapsed={:?}", label, rows, begin.elapsed());
        }
        result.map(|_| rows)
    }

    async fn drain<W: Write>(
        &self,
        statement: &str,
        print: bool,
        out: &mut W,
        rows: &mut u64,
    ) -> Result<(), ClientError> {
        let mut result = self.conn.query_iter(statement).await?;

        let mut table = TableWriter::new();
        if print {
            table.push_row(result.columns.iter().map(|c| c.to_string()).collect());
        }

        while let Some(row) = result.rows.next().await {
            let row = row?;
            if print {
                table.push_row(row.iter().map(|v| v.to_string()).collect());
            }
            *rows += 1;
        }

        if print {
            writeln!(out, "** {}", statement)?;
            table.write_to(out)?;
            writeln!(out)?;
            out.flush()?;
        }
        Ok(())
    }
}

/// Buffers cells and pads every column to its widest cell.
#[derive(Default)]
struct TableWriter {
    rows: Vec<Vec<String>>,
}

impl TableWriter {
    fn new() -> Self {
        Self::default()
    }

    fn push_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = Vec::new();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let width = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(width),
                    None => widths.push(width),
                }
            }
        }
        widths
    }

    fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let widths = self.column_widths();
        for row in &self.rows {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    line.push_str(COLUMN_DELIMITER);
                }
                line.push_str(cell);
                // Last cell is never padded.
                if i + 1 < row.len() {
                    let pad = widths[i] - cell.chars().count();
                    line.extend(std::iter::repeat(' ').take(pad));
                }
            }
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeConnection;
    use svckit::types::{ColumnSpec, ColumnValue};

    fn peers() -> FakeConnection {
        FakeConnection::new().with_rows(
            vec![
                ColumnSpec {
                    name: "peer".to_string(),
                    type_descriptor: "inet".to_string(),
                },
                ColumnSpec {
                    name: "data_center".to_string(),
                    type_descriptor: "text".to_string(),
                },
            ],
            vec![
                vec![
                    ColumnValue::Inet("10.0.0.1".parse().unwrap()),
                    ColumnValue::Text("us-east-1".to_string()),
                ],
                vec![
                    ColumnValue::Inet("10.0.0.22".parse().unwrap()),
                    ColumnValue::Null,
                ],
            ],
        )
    }

    #[tokio::test]
    async fn test_prints_aligned_table() {
        let runner = QueryRunner::new(Arc::new(peers()));
        let mut out = Vec::new();

        let rows = runner
            .run("query1", "select * from system.peers", true, true, &mut out)
            .await
            .unwrap();

        assert_eq!(rows, 2);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "** select * from system.peers\n\
             peer (inet) | data_center (text)\n\
             10.0.0.1    | us-east-1\n\
             10.0.0.22   | null\n\
             \n"
        );
    }

    #[tokio::test]
    async fn test_counts_rows_without_printing() {
        let runner = QueryRunner::new(Arc::new(peers()));
        let mut out = Vec::new();

        let rows = runner
            .run("query3", "select * from system.peers", false, true, &mut out)
            .await
            .unwrap();

        assert_eq!(rows, 2);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_empty_result_prints_header_only() {
        let conn = FakeConnection::new().with_rows(
            vec![ColumnSpec {
                name: "id".to_string(),
                type_descriptor: "text".to_string(),
            }],
            vec![],
        );
        let runner = QueryRunner::new(Arc::new(conn));
        let mut out = Vec::new();

        let rows = runner
            .run("query3", "select * from demo.demo1", true, false, &mut out)
            .await
            .unwrap();

        assert_eq!(rows, 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "** select * from demo.demo1\nid (text)\n\n"
        );
    }

    #[tokio::test]
    async fn test_iteration_error_aborts_query() {
        let runner = QueryRunner::new(Arc::new(peers().failing_row_at(1)));
        let mut out = Vec::new();

        let err = runner
            .run("query1", "select * from system.peers", true, true, &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::RowIterationError(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_table_writer_pads_ragged_rows() {
        let mut table = TableWriter::new();
        table.push_row(vec!["a".into(), "bb".into(), "c".into()]);
        table.push_row(vec!["aaaa".into(), "b".into()]);

        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "a    | bb | c\naaaa | b\n"
        );
    }
}
