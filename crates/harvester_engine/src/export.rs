use std::io::Write;
use std::path::{Path, PathBuf};

use harvester_core::{CommentRecord, ExportTree, SessionMetadata};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::filename::export_filename;
use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Nested JSON document with session metadata.
    Json,
    /// Tab-separated rows, one per comment, replies after their root.
    Table,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Table => "tsv",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub format: ExportFormat,
    pub root_count: usize,
    pub comment_count: usize,
    pub output_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Receives the finished comment tree.
pub trait Exporter: Send + Sync {
    fn export(
        &self,
        tree: &ExportTree,
        metadata: &SessionMetadata,
    ) -> Result<ExportSummary, ExportError>;
}

pub fn exporter_for(format: ExportFormat, output_dir: &Path) -> Box<dyn Exporter> {
    match format {
        ExportFormat::Json => Box::new(JsonExporter::new(output_dir.to_path_buf())),
        ExportFormat::Table => Box::new(TableExporter::new(output_dir.to_path_buf())),
    }
}

pub struct JsonExporter {
    output_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

impl Exporter for JsonExporter {
    fn export(
        &self,
        tree: &ExportTree,
        metadata: &SessionMetadata,
    ) -> Result<ExportSummary, ExportError> {
        let format = ExportFormat::Json;
        let document = json!({
            "metadata": metadata,
            "root_count": tree.root_count(),
            "comment_count": tree.comment_count(),
            "comments": tree.roots,
        });
        let filename = export_filename(&metadata.source_title, &metadata.link, format.extension());
        let writer = AtomicFileWriter::new(self.output_dir.clone());
        let output_path = writer.write_with(&filename, |out| -> Result<(), ExportError> {
            serde_json::to_writer_pretty(&mut *out, &document)?;
            out.write_all(b"\n")?;
            Ok(())
        })?;
        Ok(summary(format, tree, output_path))
    }
}

pub struct TableExporter {
    output_dir: PathBuf,
}

impl TableExporter {
    pub const HEADER: &'static str = "id\tparent\tauthor\ttimestamp\tlikes\treplies\ttext";

    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

impl Exporter for TableExporter {
    fn export(
        &self,
        tree: &ExportTree,
        metadata: &SessionMetadata,
    ) -> Result<ExportSummary, ExportError> {
        let format = ExportFormat::Table;
        let filename = export_filename(&metadata.source_title, &metadata.link, format.extension());
        let writer = AtomicFileWriter::new(self.output_dir.clone());
        let output_path = writer.write_with(&filename, |out| -> Result<(), ExportError> {
            writeln!(out, "{}", Self::HEADER)?;
            for node in &tree.roots {
                write_row(out, &node.record, Some(node.children.len()))?;
                for child in &node.children {
                    write_row(out, child, None)?;
                }
            }
            Ok(())
        })?;
        Ok(summary(format, tree, output_path))
    }
}

fn write_row(
    out: &mut dyn Write,
    record: &CommentRecord,
    replies: Option<usize>,
) -> std::io::Result<()> {
    writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        record.id,
        record.parent.map(|p| p.to_string()).unwrap_or_default(),
        cell(&record.payload.author),
        record.payload.timestamp,
        record.payload.likes,
        replies.map(|n| n.to_string()).unwrap_or_default(),
        cell(&record.payload.text),
    )
}

fn cell(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

fn summary(format: ExportFormat, tree: &ExportTree, output_path: PathBuf) -> ExportSummary {
    ExportSummary {
        format,
        root_count: tree.root_count(),
        comment_count: tree.comment_count(),
        output_path,
    }
}
