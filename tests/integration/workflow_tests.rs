//! End-to-end pipeline tests.
//!
//! Each test builds sample files in a temporary directory, runs the batch
//! driver or the per-file pipeline, and inspects the artifacts on disk.

use std::path::Path;

use serde_json::json;

use microscopy_metadata::error::WorkflowError;
use microscopy_metadata::extract::ExtractorRegistry;
use microscopy_metadata::workflow::{
    discover_inputs, run_batch, run_for_file, WorkflowContext, ERROR_SUFFIX,
    KEY_PATHS_SUFFIX, PROCESSED_METADATA_SUFFIX, RAW_METADATA_SUFFIX, REPORT_SUFFIX,
    STRUCTURE_TEMPLATE_SUFFIX, WORKFLOW_ERROR_SUFFIX,
};

use super::test_utils::{
    create_qptiff, create_two_page_tiff, read_json, read_lines, write_file, ByteOrderType,
    CziBuilder, CZI_XML,
};

fn artifact(out: &Path, stem: &str, suffix: &str) -> std::path::PathBuf {
    out.join(format!("{}{}", stem, suffix))
}

// =============================================================================
// Batch Runs
// =============================================================================

#[tokio::test]
async fn test_batch_writes_all_artifacts() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let out = output.path().join("metadata_output");

    write_file(
        input.path(),
        "sample.tif",
        &create_two_page_tiff(ByteOrderType::LittleEndian),
    );
    write_file(
        input.path(),
        "scan.czi",
        &CziBuilder::new().with_metadata_xml(CZI_XML).build(),
    );

    let registry = ExtractorRegistry::builtin();
    let files = discover_inputs(input.path(), &registry).await.unwrap();
    assert_eq!(files.len(), 2);

    let ctx = WorkflowContext::new(&out);
    let summary = run_batch(&ctx, &registry, &files).await.unwrap();
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 0);

    for stem in ["sample", "scan"] {
        for suffix in [
            RAW_METADATA_SUFFIX,
            PROCESSED_METADATA_SUFFIX,
            KEY_PATHS_SUFFIX,
            STRUCTURE_TEMPLATE_SUFFIX,
            REPORT_SUFFIX,
        ] {
            let path = artifact(&out, stem, suffix);
            assert!(path.is_file(), "missing artifact {}", path.display());
        }
        assert!(!artifact(&out, stem, WORKFLOW_ERROR_SUFFIX).exists());
    }
}

#[tokio::test]
async fn test_processed_metadata_is_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let input = write_file(
        dir.path(),
        "sample.tif",
        &create_two_page_tiff(ByteOrderType::BigEndian),
    );

    let ctx = WorkflowContext::new(&out);
    ctx.ensure_output_dir().await.unwrap();
    let artifacts = run_for_file(&ctx, &ExtractorRegistry::builtin(), &input)
        .await
        .unwrap();

    let raw = read_json(&artifacts.raw_metadata);
    assert_eq!(raw["pages"][0]["tags"]["ImageWidth"], json!(1024));

    let processed = read_json(&artifacts.processed_metadata);
    assert!(processed.get("sourceFilePath").is_some());

    let page = &processed["pages"][0];
    assert_eq!(page["pageIndexInSeries"], json!(0));
    assert_eq!(page["imageWidth"], json!(1024));
    assert_eq!(page["imageLength"], json!(768));
    assert_eq!(page["xResolution"], json!([300, 1]));
    assert_eq!(page["software"], json!("ScopeSoft 2.1"));
    assert_eq!(page["dateTime"], json!("2024:05:01 12:30:00"));
    // Unpromoted tags stay behind
    assert_eq!(page["tags"]["make"], json!("Acme"));
    assert!(page["tags"].get("imageWidth").is_none());

    // A page whose tags were all promoted loses its `tags` mapping
    let second = &processed["pages"][1];
    assert_eq!(second["imageWidth"], json!(256));
    assert!(second.get("tags").is_none());
}

#[tokio::test]
async fn test_key_paths_and_template() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let input = write_file(dir.path(), "slide.qptiff", &create_qptiff());

    let ctx = WorkflowContext::new(&out);
    ctx.ensure_output_dir().await.unwrap();
    let artifacts = run_for_file(&ctx, &ExtractorRegistry::builtin(), &input)
        .await
        .unwrap();

    let paths = read_lines(&artifacts.key_paths);
    let mut sorted = paths.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(paths, sorted);
    assert!(paths.contains(&"pages.0.imageWidth".to_string()));
    assert!(paths.contains(&"pages.1.imageWidth".to_string()));
    assert!(paths.contains(&"pages.0.structuredImageDescription.parsedScanProfile.filters.1".to_string()));

    let template = read_lines(&artifacts.structure_template);
    assert!(template.contains(&"pages".to_string()));
    assert!(template.contains(&"pages.[]".to_string()));
    assert!(template.contains(&"pages.[].imageWidth".to_string()));
    assert!(template.contains(&"pages.[].structuredImageDescription.parsedScanProfile.filters.[]".to_string()));
    assert!(!template.iter().any(|line| line.contains(".0")));
}

#[tokio::test]
async fn test_markdown_report() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let input = write_file(
        dir.path(),
        "sample.tif",
        &create_two_page_tiff(ByteOrderType::LittleEndian),
    );

    let ctx = WorkflowContext::new(&out);
    ctx.ensure_output_dir().await.unwrap();
    let artifacts = run_for_file(&ctx, &ExtractorRegistry::builtin(), &input)
        .await
        .unwrap();

    let report = std::fs::read_to_string(&artifacts.report).unwrap();
    assert!(report.starts_with("# Metadata Report for sample.tif"));
    assert!(report.contains("| Image Width | 1024 |"));
    assert!(report.contains("| Software | ScopeSoft 2.1 |"));
    assert!(report.contains("| Bits Per Sample |"));
    assert!(artifacts.pdf_report.is_none());
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_unsupported_extension_writes_error_json() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let input = write_file(dir.path(), "notes.xyz", b"hello");

    let ctx = WorkflowContext::new(&out);
    let registry = ExtractorRegistry::builtin();
    ctx.ensure_output_dir().await.unwrap();

    let result = run_for_file(&ctx, &registry, &input).await;
    assert!(matches!(result, Err(WorkflowError::NoExtractor(_))));

    let error = read_json(&artifact(&out, "notes", ERROR_SUFFIX));
    assert_eq!(error["source_file"], json!(input.display().to_string()));
    assert!(error["error"]
        .as_str()
        .unwrap()
        .starts_with("No extractor found for file type"));

    // The batch driver counts it as failed without a workflow error file
    let summary = run_batch(&ctx, &registry, &[input]).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert!(!artifact(&out, "notes", WORKFLOW_ERROR_SUFFIX).exists());
}

#[tokio::test]
async fn test_failed_stage_writes_workflow_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let input = write_file(
        dir.path(),
        "blocked.tif",
        &create_two_page_tiff(ByteOrderType::LittleEndian),
    );

    // A directory where the key path list should go makes that write fail
    std::fs::create_dir_all(artifact(&out, "blocked", KEY_PATHS_SUFFIX)).unwrap();

    let ctx = WorkflowContext::new(&out);
    let summary = run_batch(&ctx, &ExtractorRegistry::builtin(), &[input])
        .await
        .unwrap();
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 1);

    // Earlier stages completed, later ones never ran
    assert!(artifact(&out, "blocked", RAW_METADATA_SUFFIX).is_file());
    assert!(artifact(&out, "blocked", PROCESSED_METADATA_SUFFIX).is_file());
    assert!(!artifact(&out, "blocked", REPORT_SUFFIX).exists());

    let message =
        std::fs::read_to_string(artifact(&out, "blocked", WORKFLOW_ERROR_SUFFIX)).unwrap();
    assert!(message.starts_with("A critical error occurred processing blocked.tif:"));
    assert!(message.contains("key paths stage failed"));
    assert!(message.ends_with("Check logs for more details."));
}

#[tokio::test]
async fn test_corrupt_file_still_produces_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let input = write_file(dir.path(), "broken.tif", b"not really a tiff");

    let ctx = WorkflowContext::new(&out);
    let summary = run_batch(&ctx, &ExtractorRegistry::builtin(), &[input])
        .await
        .unwrap();
    assert_eq!(summary.succeeded, 1);

    let raw = read_json(&artifact(&out, "broken", RAW_METADATA_SUFFIX));
    assert!(raw["error"].is_string());
    assert_eq!(raw["pages"], json!([]));

    let report = std::fs::read_to_string(artifact(&out, "broken", REPORT_SUFFIX)).unwrap();
    assert!(report.contains("No page data available to display general properties."));
}

#[tokio::test]
async fn test_missing_pdf_converter_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let input = write_file(
        dir.path(),
        "sample.tif",
        &create_two_page_tiff(ByteOrderType::LittleEndian),
    );

    let ctx = WorkflowContext::new(&out)
        .with_pdf(true)
        .with_pdf_converter("definitely-not-a-real-converter");
    ctx.ensure_output_dir().await.unwrap();

    let artifacts = run_for_file(&ctx, &ExtractorRegistry::builtin(), &input)
        .await
        .unwrap();
    assert!(artifacts.report.is_file());
    assert!(artifacts.pdf_report.is_none());
}

// =============================================================================
// Discovery and Mapping
// =============================================================================

#[tokio::test]
async fn test_extension_mapping_enables_new_type() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(
        dir.path(),
        "sample.btf",
        &create_two_page_tiff(ByteOrderType::LittleEndian),
    );

    let mut registry = ExtractorRegistry::builtin();
    assert!(discover_inputs(&input, &registry).await.unwrap().is_empty());

    registry.apply_mapping("btf=tiff").unwrap();
    let files = discover_inputs(&input, &registry).await.unwrap();
    assert_eq!(files.len(), 1);

    let ctx = WorkflowContext::new(dir.path().join("out"));
    let summary = run_batch(&ctx, &registry, &files).await.unwrap();
    assert_eq!(summary.succeeded, 1);
}
