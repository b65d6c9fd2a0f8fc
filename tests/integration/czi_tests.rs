//! CZI extraction and container detection tests.

use serde_json::json;

use microscopy_metadata::extract::{CziExtractor, MetadataExtractor};
use microscopy_metadata::format::{detect_container, detect_from_bytes, ContainerFormat};
use microscopy_metadata::io::MemoryRangeReader;

use super::test_utils::{
    create_two_page_tiff, write_file, ByteOrderType, CziBuilder, IfdBuilder, TiffBuilder, CZI_XML,
};

async fn extract(data: Vec<u8>) -> serde_json::Value {
    let reader = MemoryRangeReader::new(data, "/data/scan.czi");
    let tree = CziExtractor::new()
        .extract_from_reader(&reader, "/data/scan.czi")
        .await;
    serde_json::from_str(&tree.to_json_pretty().unwrap()).unwrap()
}

// =============================================================================
// Extraction
// =============================================================================

#[tokio::test]
async fn test_structured_metadata_strips_prefixes() {
    let json = extract(CziBuilder::new().with_metadata_xml(CZI_XML).build()).await;

    assert_eq!(json["source_file_path"], json!("/data/scan.czi"));
    assert_eq!(json["xml_metadata_string"], json!(CZI_XML));
    assert!(json.get("error").is_none());

    let image = &json["structured_metadata"]["ImageDocument"]["Metadata"]["Information"]["Image"];
    assert_eq!(image["SizeX"], json!(512));
    assert_eq!(image["SizeY"], json!(256));
    assert_eq!(image["PixelType"], json!("Gray16"));
    assert!(image.get("zen:PixelType").is_none());

    let distances =
        &json["structured_metadata"]["ImageDocument"]["Metadata"]["Scaling"]["Items"]["Distance"];
    assert_eq!(distances.as_array().unwrap().len(), 2);
    assert_eq!(distances[0]["@Id"], json!("X"));
    assert_eq!(distances[0]["Value"], json!(1.5e-7));
}

#[tokio::test]
async fn test_missing_metadata_segment() {
    let json = extract(CziBuilder::new().with_version(1, 2).build()).await;

    assert_eq!(json["warning"], json!("No XML metadata segment found in file."));
    assert!(json.get("structured_metadata").is_none());

    let summary = &json["file_header_summary"];
    assert_eq!(summary["major_version"], json!(1));
    assert_eq!(summary["minor_version"], json!(2));
    assert_eq!(summary["metadata_position"], json!("0"));
    assert_eq!(summary["file_guid"], json!("22".repeat(16)));
}

#[tokio::test]
async fn test_malformed_xml_keeps_text() {
    let xml = "<ImageDocument><Metadata></ImageDocument>";
    let json = extract(CziBuilder::new().with_metadata_xml(xml).build()).await;

    assert_eq!(json["xml_metadata_string"], json!(xml));
    assert!(json["error"].as_str().unwrap().starts_with("Malformed XML"));
    assert!(json.get("structured_metadata").is_none());
}

#[tokio::test]
async fn test_wrong_magic() {
    let json = extract(create_two_page_tiff(ByteOrderType::LittleEndian)).await;

    let error = json["error"].as_str().unwrap();
    assert!(error.contains("ZISRAWFILE"), "unexpected error: {}", error);
    assert!(json.get("structured_metadata").is_none());
}

#[tokio::test]
async fn test_truncated_metadata_segment() {
    let mut data = CziBuilder::new().with_metadata_xml(CZI_XML).build();
    data.truncate(data.len() - 100);
    let json = extract(data).await;

    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid metadata segment at offset 112"));
}

#[tokio::test]
async fn test_extract_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "disk.czi",
        &CziBuilder::new().with_metadata_xml(CZI_XML).build(),
    );

    let tree = CziExtractor::new().extract(&path).await;
    assert!(tree
        .get_path("structured_metadata.ImageDocument.Metadata.Information.Image")
        .is_some());
}

// =============================================================================
// Detection
// =============================================================================

#[tokio::test]
async fn test_detect_container() {
    let cases = [
        (CziBuilder::new().build(), Some(ContainerFormat::Czi)),
        (
            create_two_page_tiff(ByteOrderType::BigEndian),
            Some(ContainerFormat::Tiff),
        ),
        (
            TiffBuilder::new()
                .with_bigtiff(true)
                .add_ifd(IfdBuilder::basic_image(4, 4))
                .build(),
            Some(ContainerFormat::BigTiff),
        ),
        (b"%PDF-1.7".to_vec(), None),
        (b"II".to_vec(), None),
    ];

    for (data, expected) in cases {
        let reader = MemoryRangeReader::new(data, "probe");
        assert_eq!(detect_container(&reader).await.unwrap(), expected);
    }
}

#[test]
fn test_detected_format_names_extractor() {
    let czi = detect_from_bytes(&CziBuilder::new().build()).unwrap();
    assert_eq!(czi.extractor_name(), "czi");
    assert_eq!(czi.name(), "CZI");

    let tiff = detect_from_bytes(&create_two_page_tiff(ByteOrderType::LittleEndian)).unwrap();
    assert_eq!(tiff.extractor_name(), "tiff");
}
