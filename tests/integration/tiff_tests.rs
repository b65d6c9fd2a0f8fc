//! TIFF-family extraction tests.
//!
//! Tests verify:
//! - Little-endian, big-endian and BigTIFF files yield one page per IFD
//! - Tag values decode to the expected scalars and lists
//! - OME-XML, PerkinElmer and ImageJ descriptions are parsed
//! - Unreadable files produce an error tree instead of failing

use serde_json::json;

use microscopy_metadata::extract::{MetadataExtractor, TiffExtractor};
use microscopy_metadata::io::MemoryRangeReader;
use microscopy_metadata::tree::MetadataTree;

use super::test_utils::{
    create_imagej_tiff, create_ome_tiff, create_qptiff, create_two_page_tiff, is_bigtiff_magic,
    is_tiff_magic, write_file, ByteOrderType, IfdBuilder, TiffBuilder, PERKINELMER_XML,
};

async fn extract(data: Vec<u8>, path: &str) -> MetadataTree {
    let reader = MemoryRangeReader::new(data, path);
    TiffExtractor::new().extract_from_reader(&reader, path).await
}

fn as_json(tree: &MetadataTree) -> serde_json::Value {
    serde_json::from_str(&tree.to_json_pretty().unwrap()).unwrap()
}

// =============================================================================
// Byte Order and Layout
// =============================================================================

#[tokio::test]
async fn test_little_endian_pages() {
    let data = create_two_page_tiff(ByteOrderType::LittleEndian);
    assert!(is_tiff_magic(&data));
    assert_eq!(&data[0..2], b"II");

    let tree = extract(data, "/data/le.tif").await;
    let json = as_json(&tree);

    assert_eq!(json["source_file_path"], json!("/data/le.tif"));
    assert_eq!(json["pages"].as_array().unwrap().len(), 2);
    assert!(json.get("error").is_none());

    let first = &json["pages"][0];
    assert_eq!(first["page_index_in_series"], json!(0));
    assert_eq!(first["tags"]["ImageWidth"], json!(1024));
    assert_eq!(first["tags"]["ImageLength"], json!(768));
    assert_eq!(first["tags"]["XResolution"], json!([300, 1]));
    assert_eq!(first["tags"]["ResolutionUnit"], json!(2));
    assert_eq!(first["tags"]["Software"], json!("ScopeSoft 2.1"));
    assert_eq!(first["tags"]["Make"], json!("Acme"));
    assert_eq!(first["tags"]["ImageDescription"], json!("Plain description"));
    assert!(first.get("image_description_xml").is_none());

    let second = &json["pages"][1];
    assert_eq!(second["page_index_in_series"], json!(1));
    assert_eq!(second["tags"]["ImageWidth"], json!(256));
}

#[tokio::test]
async fn test_big_endian_matches_little_endian() {
    let le = extract(create_two_page_tiff(ByteOrderType::LittleEndian), "x.tif").await;
    let data = create_two_page_tiff(ByteOrderType::BigEndian);
    assert_eq!(&data[0..2], b"MM");
    let be = extract(data, "x.tif").await;

    assert_eq!(le, be);
}

#[tokio::test]
async fn test_bigtiff() {
    let mut ifd = IfdBuilder::basic_image(70000, 50000);
    ifd.add_entry(324, 16, &[4096, 8192]) // TileOffsets as LONG8
        .add_double(33550, 0.25); // ModelPixelScale-like double
    let data = TiffBuilder::new()
        .with_bigtiff(true)
        .add_ifd(ifd)
        .build();
    assert!(is_bigtiff_magic(&data));

    let json = as_json(&extract(data, "big.tif").await);
    let tags = &json["pages"][0]["tags"];
    assert_eq!(tags["ImageWidth"], json!(70000));
    assert_eq!(tags["TileOffsets"], json!([4096, 8192]));
    assert_eq!(tags["33550"], json!(0.25));
}

#[tokio::test]
async fn test_unknown_tags_use_decimal_names() {
    let mut ifd = IfdBuilder::basic_image(8, 8);
    ifd.add_short(65000, 7);
    let json = as_json(&extract(TiffBuilder::new().add_ifd(ifd).build(), "u.tif").await);
    assert_eq!(json["pages"][0]["tags"]["65000"], json!(7));
}

#[tokio::test]
async fn test_undefined_values() {
    let mut ifd = IfdBuilder::basic_image(8, 8);
    ifd.add_undefined(700, b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/>")
        .add_undefined(37500, &[0x00, 0xFF, b'A', b'\'']);
    let json = as_json(&extract(TiffBuilder::new().add_ifd(ifd).build(), "u.tif").await);
    let tags = &json["pages"][0]["tags"];

    assert_eq!(tags["XMP"], json!("<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/>"));
    assert_eq!(tags["37500"], json!("b'\\x00\\xffA\\''"));
}

// =============================================================================
// Descriptions
// =============================================================================

#[tokio::test]
async fn test_ome_tiff() {
    let json = as_json(&extract(create_ome_tiff(), "/data/sample.ome.tif").await);

    let top = &json["top_level_tags"];
    assert!(top["ome_xml_string"].as_str().unwrap().contains("<OME"));

    let pixels = &top["structured_ome_metadata"]["OME"]["Image"]["Pixels"];
    assert_eq!(pixels["@SizeX"], json!(64));
    assert_eq!(pixels["@PhysicalSizeX"], json!(0.325));
    assert_eq!(pixels["@Type"], json!("uint16"));
    assert_eq!(pixels["Channel"].as_array().unwrap().len(), 2);
    assert_eq!(pixels["Channel"][1]["@Name"], json!("FITC"));

    let page = &json["pages"][0];
    assert!(page["image_description_xml"].as_str().unwrap().starts_with("<?xml"));
    assert_eq!(
        page["structured_image_description"]["OME"]["@xmlns"],
        json!("http://www.openmicroscopy.org/Schemas/OME/2016-06")
    );
}

#[tokio::test]
async fn test_qptiff_scan_profile() {
    let json = as_json(&extract(create_qptiff(), "/data/slide.qptiff").await);

    let first = &json["pages"][0];
    assert_eq!(first["image_description_xml"], json!(PERKINELMER_XML));

    let structured = &first["structured_image_description"];
    assert_eq!(
        structured["PerkinElmer-QPI-ImageDescription"]["Name"],
        json!("DAPI")
    );
    assert_eq!(
        structured["parsed_scan_profile"],
        json!({"ScanResolution": 0.5, "Filters": ["DAPI", "FITC"]})
    );

    let thumb = &json["pages"][1]["structured_image_description"];
    assert_eq!(
        thumb["PerkinElmer-QPI-ImageDescription"]["ImageType"],
        json!("Thumbnail")
    );
    assert!(thumb.get("parsed_scan_profile").is_none());

    // PerkinElmer descriptions are not OME and not ImageJ
    assert!(json.get("top_level_tags").is_none());
}

#[tokio::test]
async fn test_qptiff_bad_xml_is_recorded_inline() {
    let mut ifd = IfdBuilder::basic_image(8, 8);
    ifd.add_ascii(270, "<PerkinElmer-QPI-ImageDescription><Open></PerkinElmer-QPI-ImageDescription>");
    let json = as_json(&extract(TiffBuilder::new().add_ifd(ifd).build(), "bad.qptiff").await);

    let structured = &json["pages"][0]["structured_image_description"];
    assert_eq!(structured["error"], json!("Failed generic XML parse"));
    assert!(structured["raw_value"].as_str().unwrap().contains("<Open>"));
}

#[tokio::test]
async fn test_generic_bad_xml_is_skipped() {
    let mut ifd = IfdBuilder::basic_image(8, 8);
    ifd.add_ascii(270, "<Root><Open></Root>");
    let json = as_json(&extract(TiffBuilder::new().add_ifd(ifd).build(), "bad.tif").await);

    let page = &json["pages"][0];
    assert_eq!(page["image_description_xml"], json!("<Root><Open></Root>"));
    assert!(page.get("structured_image_description").is_none());
}

#[tokio::test]
async fn test_imagej_tiff() {
    let json = as_json(&extract(create_imagej_tiff(), "stack.tif").await);

    assert_eq!(
        json["top_level_tags"]["imagej_metadata"],
        json!({
            "ImageJ": "1.54f",
            "images": 3,
            "channels": 3,
            "unit": "micron",
            "spacing": 0.5
        })
    );
    assert!(json["pages"][0].get("image_description_xml").is_none());
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_not_a_tiff() {
    let tree = extract(b"This is not a TIFF file at all".to_vec(), "fake.tif").await;
    let json = as_json(&tree);

    assert_eq!(json["pages"], json!([]));
    assert!(!json["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_header_without_ifds() {
    // Valid header whose first IFD offset points at the end of the file
    let mut data = b"II*\0".to_vec();
    data.extend(8u32.to_le_bytes());
    let json = as_json(&extract(data, "empty.tif").await);

    assert_eq!(json["pages"], json!([]));
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.tif");

    let tree = TiffExtractor::new().extract(&path).await;
    let json = as_json(&tree);

    assert_eq!(
        json["error"],
        json!(format!("File not found: {}", path.display()))
    );
    assert_eq!(json["pages"], json!([]));
}

#[tokio::test]
async fn test_extract_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "disk.tif",
        &create_two_page_tiff(ByteOrderType::LittleEndian),
    );

    let tree = TiffExtractor::new().extract(&path).await;
    assert_eq!(
        tree.get_path("pages.1.tags.ImageLength"),
        Some(&MetadataTree::from(192i64))
    );
    assert_eq!(
        tree.get("source_file_path").and_then(MetadataTree::as_str),
        Some(path.display().to_string().as_str())
    );
}
