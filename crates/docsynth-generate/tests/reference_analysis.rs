use docsynth_core::Confidence;
use docsynth_generate::{
    CapabilityError, GenerationError, ReferenceAnalyzer, ReferenceImage, ScriptedCapability,
};

fn png_bytes() -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        8,
        8,
        image::Rgb([240, 236, 220]),
    ));
    let mut bytes = Vec::new();
    image
        .write_to(&mut bytes, image::ImageOutputFormat::Png)
        .expect("encode png");
    bytes
}

const ANALYSIS: &str = r#"```json
{
  "document_type": "ใบแจ้งหนี้",
  "detected_language": "th",
  "confidence": "Medium",
  "extracted_entities": {"ชื่อลูกค้า": "สมชาย ใจดี", "ยอดรวม": "฿1,200"}
}
```"#;

#[test]
fn analyzes_a_valid_image_with_one_call() {
    let capability = ScriptedCapability::new().with_analysis_response(ANALYSIS);
    let analyzer = ReferenceAnalyzer::new(&capability);

    let analysis = analyzer
        .analyze(&ReferenceImage::from_bytes(png_bytes()))
        .expect("analysis succeeds");

    assert_eq!(analysis.detected_locale, "th");
    assert_eq!(analysis.confidence, Confidence::Medium);
    assert_eq!(analysis.extracted_entities.len(), 2);
    assert_eq!(capability.analysis_calls(), 1);
}

#[test]
fn corrupted_image_fails_before_any_call() {
    let capability = ScriptedCapability::new().with_analysis_response(ANALYSIS);
    let analyzer = ReferenceAnalyzer::new(&capability);

    let err = analyzer
        .analyze(&ReferenceImage::from_bytes(b"definitely not an image".to_vec()))
        .expect_err("corrupted image");

    assert!(matches!(err, GenerationError::UnsupportedImageFormat(_)));
    assert_eq!(capability.analysis_calls(), 0);
}

#[test]
fn truncated_image_fails_before_any_call() {
    let mut bytes = png_bytes();
    bytes.truncate(24);
    let capability = ScriptedCapability::new().with_analysis_response(ANALYSIS);

    let err = ReferenceAnalyzer::new(&capability)
        .analyze(&ReferenceImage::from_bytes(bytes))
        .expect_err("truncated image");

    assert_eq!(err.kind().as_str(), "unsupported_image_format");
    assert_eq!(capability.analysis_calls(), 0);
}

#[test]
fn capability_without_vision_is_rejected() {
    let capability = ScriptedCapability::new()
        .without_vision()
        .with_analysis_response(ANALYSIS);

    let err = ReferenceAnalyzer::new(&capability)
        .analyze(&ReferenceImage::from_bytes(png_bytes()))
        .expect_err("no vision");

    assert!(matches!(err, GenerationError::CapabilityRejected(_)));
    assert_eq!(capability.analysis_calls(), 0);
}

#[test]
fn unparseable_answer_is_a_parse_error() {
    let capability =
        ScriptedCapability::new().with_analysis_response("This looks like an invoice.");

    let err = ReferenceAnalyzer::new(&capability)
        .analyze(&ReferenceImage::from_bytes(png_bytes()))
        .expect_err("parse error");

    assert!(matches!(err, GenerationError::AnalysisParseError(_)));
    assert!(!err.is_retryable());
}

#[test]
fn service_outage_is_retryable() {
    let capability = ScriptedCapability::new()
        .with_analysis_error(CapabilityError::Unavailable("status 503".to_string()));

    let err = ReferenceAnalyzer::new(&capability)
        .analyze(&ReferenceImage::from_bytes(png_bytes()))
        .expect_err("unavailable");

    assert!(matches!(err, GenerationError::AnalysisServiceUnavailable(_)));
    assert!(err.is_retryable());
    assert_eq!(capability.analysis_calls(), 1);
}

#[test]
fn reads_images_from_disk() {
    let dir = std::env::temp_dir().join(format!("docsynth_analysis_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("reference.png");
    std::fs::write(&path, png_bytes()).expect("write png");

    let image = ReferenceImage::from_path(&path).expect("read image");
    assert_eq!(image.source(), Some(path.as_path()));
    assert_eq!(image.mime_type(), "image/png");
    image.validate().expect("valid png");

    let _ = std::fs::remove_dir_all(&dir);
}
