use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ledgerseed_core::{Row, Table};

/// Write a table as CSV in column declaration order; returns bytes written.
///
/// Nulls become empty fields and decimals use the column's scale.
pub fn write_table_csv(path: &Path, table: &Table, rows: &[Row]) -> Result<u64, csv::Error> {
    let writer = BufWriter::new(File::create(path).map_err(csv::Error::from)?);
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    let header: Vec<&str> = table.columns.iter().map(|col| col.name.as_str()).collect();
    writer.write_record(&header)?;

    for row in rows {
        let record: Vec<String> = table
            .columns
            .iter()
            .map(|col| {
                row.get(&col.name)
                    .and_then(|value| value.render(col.logical_type.scale()))
                    .unwrap_or_default()
            })
            .collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(counting.bytes_written())
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
