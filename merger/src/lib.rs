use anyhow::{Context, Result};
use merge_core::courselets::{add_courselet_ids, EnrichmentCounts, ExactIndex};
use merge_core::export::{default_columns, response_rows, write_csv, GenericErrors};
use merge_core::field_path::FieldPath;
use merge_core::persist::{csv_path, load_legacy, load_rows, merged_path, save_json, ContentFile, ContentLibrary};
use merge_core::{MergeConfig, MergeIssue, MergeReport, Merger, Severity};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct ReportFile<'a> {
    generated_at: String,
    legacy: String,
    content: Vec<String>,
    issues: &'a [MergeIssue],
}

/// Inject legacy responses into the content files and write `<stem>merge.json`
/// next to each of them. Returns the written paths and the run's report.
pub fn run_merge(
    legacy: &Path,
    content: &[PathBuf],
    config: MergeConfig,
    report_out: Option<&Path>,
) -> Result<(Vec<PathBuf>, MergeReport)> {
    let merger = Merger::new(config)?;
    let mut library = ContentLibrary::load(content).context("loading content files")?;
    let mut set = library.canonical_set()?;
    tracing::info!(files = content.len(), questions = set.len(), "loaded canonical content");

    let export = load_legacy(legacy).with_context(|| format!("reading legacy export {}", legacy.display()))?;
    let report = merger.merge(&mut set, export.into_questions())?;
    library.store(&set)?;

    let mut written = Vec::new();
    for file in library.files() {
        let out = merged_path(&file.path);
        tracing::info!(output = %out.display(), "writing merged content");
        file.save(&out).with_context(|| format!("writing {}", out.display()))?;
        written.push(out);
    }

    if let Some(path) = report_out {
        let dump = ReportFile {
            generated_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "".into()),
            legacy: legacy.display().to_string(),
            content: content.iter().map(|p| p.display().to_string()).collect(),
            issues: &report.issues,
        };
        save_json(path, &dump).with_context(|| format!("writing report {}", path.display()))?;
    }
    Ok((written, report))
}

/// One line for stdout. The issues themselves go through `tracing` as they are
/// recorded.
pub fn merge_summary(written: &[PathBuf], report: &MergeReport) -> String {
    format!(
        "wrote {} merged files ({} skipped, {} warnings)",
        written.len(),
        report.count(Severity::Skipped),
        report.count(Severity::Warning)
    )
}

/// Add courselets concept ids to each content file, rewriting it in place.
pub fn run_courselets(titles: &Path, errors: &Path, content: &[PathBuf]) -> Result<(EnrichmentCounts, MergeReport)> {
    let titles = ExactIndex::from_rows(load_rows(titles).with_context(|| format!("reading {}", titles.display()))?);
    let errors = ExactIndex::from_rows(load_rows(errors).with_context(|| format!("reading {}", errors.display()))?);
    if titles.is_empty() || errors.is_empty() {
        tracing::warn!(titles = titles.len(), errors = errors.len(), "a courselets lookup table is empty");
    }
    let mut total = EnrichmentCounts::default();
    let mut report = MergeReport::default();
    for path in content {
        let mut file = ContentFile::load(path).with_context(|| format!("reading {}", path.display()))?;
        let mut questions = file.questions()?;
        let counts = add_courselet_ids(questions.iter_mut().map(|(_, q)| q), &titles, &errors, &mut report);
        for (slot, q) in &questions {
            file.replace_block(*slot, q)?;
        }
        tracing::info!(file = %path.display(), "writing enriched content");
        file.save(path)?;
        total.titles += counts.titles;
        total.errors += counts.errors;
    }
    Ok((total, report))
}

/// Options of the CSV export.
#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    pub generic_em: Option<PathBuf>,
    /// Column field paths; the default column set when empty.
    pub columns: Vec<String>,
    /// Constants added to every row context, replacing built-in keys.
    pub extra: Map<String, Value>,
    pub header: bool,
}

/// Parse `key=value` for `csv --set`. The value is read as JSON when it parses
/// as JSON and taken as a plain string otherwise.
pub fn parse_assignment(arg: &str) -> std::result::Result<(String, Value), String> {
    let (key, raw) = arg.split_once('=').ok_or_else(|| format!("expected key=value, got {arg:?}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {arg:?}"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Write one CSV row per response of a merged content file to `<stem>.csv`.
pub fn run_csv(input: &Path, opts: &CsvOptions) -> Result<(PathBuf, MergeReport)> {
    let file = ContentFile::load(input).with_context(|| format!("reading {}", input.display()))?;
    let questions: Vec<_> = file.questions()?.into_iter().map(|(_, q)| q).collect();
    let generic = match &opts.generic_em {
        Some(path) => GenericErrors::from_rows(load_rows(path).with_context(|| format!("reading {}", path.display()))?),
        None => GenericErrors::default(),
    };
    if generic.is_empty() {
        tracing::info!("no generic error models, genericErrors columns will be NULL");
    }
    let columns = if opts.columns.is_empty() {
        default_columns()
    } else {
        opts.columns.iter().map(|c| FieldPath::parse(c)).collect::<merge_core::Result<Vec<_>>>()?
    };

    let mut report = MergeReport::default();
    let rows = response_rows(&questions, &generic, &columns, &opts.extra, &mut report)?;
    let out = csv_path(input);
    tracing::info!(output = %out.display(), rows = rows.len(), "writing csv");
    let f = BufWriter::new(File::create(&out).with_context(|| format!("creating {}", out.display()))?);
    write_csv(f, opts.header.then_some(columns.as_slice()), &rows)?;
    Ok((out, report))
}

/// One tab separated summary line per legacy question.
pub fn run_report<W: Write>(legacy: &Path, mut out: W) -> Result<usize> {
    let export = load_legacy(legacy).with_context(|| format!("reading legacy export {}", legacy.display()))?;
    let mut n = 0;
    for q in export.iter_questions() {
        writeln!(out, "{}", q.summary_line())?;
        n += 1;
    }
    Ok(n)
}
