//! Export pipeline integration tests.
//!
//! Tests verify:
//! - Band count and page count for tall rasters
//! - Overlay assets fetched anonymously over HTTP
//! - Blocked assets abort the export with no file left behind
//! - Stage transitions observed through the watch channel
//! - Background exports report to live feedback targets only

use std::sync::{Arc, Weak};

use chrono::NaiveDate;
use tokio::sync::watch;

use ledgerdesk::export::{
    export_file_name, export_in_background, ExportPipeline, ExportRequest, ExportStage,
    HttpAssetFetcher, Overlay, PageLayout, PageSize, Rasterizer, Region, RegionManifest,
};
use ledgerdesk::{ExportError, ExportOptions, Feedback, Notice, RecordingFeedback, ReportKind};

use super::test_utils::{
    count_occurrences, png_bytes, report_raster, signed_in_context, MemoryAssets, MockBackend,
};

fn pipeline<F: ledgerdesk::AssetFetcher>(fetcher: F, dir: &std::path::Path) -> ExportPipeline<F> {
    ExportOptions {
        output_dir: dir.to_path_buf(),
        scale: 1.0,
        ..ExportOptions::default()
    }
    .build(fetcher)
    .unwrap()
}

fn logo_overlay(src: &str) -> Overlay {
    Overlay {
        src: src.to_string(),
        x: 10,
        y: 10,
        width: 40,
        height: 20,
    }
}

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn test_tall_report_spans_pages() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(MemoryAssets::default(), dir.path());

    // A4 with 10mm margins at 190px width holds 277 rows per page.
    let request = ExportRequest::new(Region::new(report_raster(190, 1000)), "tall.pdf");
    let report = pipeline.run(&request).await.unwrap();

    assert_eq!(report.pages, 4);
    assert_eq!((report.raster_width, report.raster_height), (190, 1000));

    let bytes = std::fs::read(&report.path).unwrap();
    assert_eq!(count_occurrences(&bytes, "/Type /Page /Parent"), 4);
    assert_eq!(count_occurrences(&bytes, "/Subtype /Image"), 4);
    // The last band holds the remaining 1000 - 3 * 277 rows.
    assert_eq!(count_occurrences(&bytes, "/Width 190 /Height 169"), 1);
}

#[tokio::test]
async fn test_short_report_is_single_page() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(MemoryAssets::default(), dir.path());

    let request = ExportRequest::new(Region::new(report_raster(400, 120)), "short.pdf");
    let report = pipeline.run(&request).await.unwrap();

    assert_eq!(report.pages, 1);
}

#[tokio::test]
async fn test_scale_multiplies_raster() {
    let dir = tempfile::tempdir().unwrap();
    let rasterizer = Rasterizer::new(MemoryAssets::default(), 2.0).unwrap();
    let pipeline = ExportPipeline::new(
        rasterizer,
        PageLayout::new(PageSize::Letter, 12.7).unwrap(),
        dir.path(),
    );

    let request = ExportRequest::new(Region::new(report_raster(100, 50)), "scaled.pdf");
    let report = pipeline.run(&request).await.unwrap();

    assert_eq!((report.raster_width, report.raster_height), (200, 100));
}

// =============================================================================
// Overlays
// =============================================================================

#[tokio::test]
async fn test_logo_fetched_without_credentials() {
    let backend = MockBackend::start().await;
    // A signed-in client exists; its token must not leak to asset fetches.
    let _ctx = signed_in_context(&backend.base_url);
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(HttpAssetFetcher::new().unwrap(), dir.path());

    let region = Region::new(report_raster(300, 200))
        .with_overlay(logo_overlay(&backend.url("/assets/logo.png")));
    let report = pipeline
        .run(&ExportRequest::new(region, "with-logo.pdf"))
        .await
        .unwrap();

    assert!(report.path.exists());
    assert_eq!(backend.log.authorization(), vec![Vec::<String>::new()]);
}

#[tokio::test]
async fn test_blocked_logo_fails_without_file() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(HttpAssetFetcher::new().unwrap(), dir.path());

    let region = Region::new(report_raster(300, 200))
        .with_overlay(logo_overlay(&backend.url("/assets/blocked.png")));
    let (stage, observer) = watch::channel(ExportStage::Idle);
    let result = pipeline
        .run_observed(&ExportRequest::new(region, "blocked.pdf"), &stage)
        .await;

    match result {
        Err(ExportError::CaptureFailed { reason }) => assert!(reason.contains("403")),
        other => panic!("expected capture failure, got {:?}", other),
    }
    assert_eq!(*observer.borrow(), ExportStage::Failed);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_manifest_export_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("snapshot.png"), png_bytes(&report_raster(190, 600))).unwrap();
    std::fs::write(
        dir.path().join("logo.png"),
        png_bytes(&report_raster(8, 8)),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("region.json"),
        r#"{ "snapshot": "snapshot.png",
             "overlays": [{ "src": "logo.png", "x": 4, "y": 4, "width": 16, "height": 16 }] }"#,
    )
    .unwrap();

    let region = RegionManifest::load(&dir.path().join("region.json"))
        .await
        .unwrap();
    let pipeline = pipeline(HttpAssetFetcher::new().unwrap(), out.path());
    let name = export_file_name(
        ReportKind::CustomerBalanceDetail,
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        Some("Acme Corp."),
    );
    let report = pipeline.run(&ExportRequest::new(region, name)).await.unwrap();

    assert_eq!(
        report.path,
        out.path()
            .join("customer-balance-detail_Acme-Corp_2024-03-31.pdf")
    );
    assert_eq!(report.pages, 3);
}

// =============================================================================
// Background Exports
// =============================================================================

#[tokio::test]
async fn test_background_failure_notifies_feedback() {
    let dir = tempfile::tempdir().unwrap();
    let assets = MemoryAssets::default();
    let pipeline = Arc::new(pipeline(assets.clone(), dir.path()));
    let feedback = Arc::new(RecordingFeedback::new());
    let target: Arc<dyn Feedback> = feedback.clone();

    let region = Region::new(report_raster(100, 100)).with_overlay(logo_overlay("logo.png"));
    let handle = export_in_background(
        pipeline,
        ExportRequest::new(region, "bg.pdf"),
        Arc::downgrade(&target),
    );
    let result = handle.await.unwrap();

    assert!(result.is_err());
    assert_eq!(assets.fetches(), 1);
    let notices = feedback.notices();
    assert_eq!(notices.len(), 1);
    assert!(matches!(&notices[0], Notice::ExportFailed(text) if text.contains("logo.png")));
}

#[tokio::test]
async fn test_concurrent_exports_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let logo = png_bytes(&report_raster(4, 4));
    let assets = MemoryAssets::default().with_asset("logo.png", logo);
    let pipeline = Arc::new(pipeline(assets, dir.path()));
    let nobody: Weak<dyn Feedback> = Weak::<RecordingFeedback>::new();

    let ok = export_in_background(
        pipeline.clone(),
        ExportRequest::new(
            Region::new(report_raster(190, 300)).with_overlay(logo_overlay("logo.png")),
            "ok.pdf",
        ),
        nobody.clone(),
    );
    let failing = export_in_background(
        pipeline,
        ExportRequest::new(
            Region::new(report_raster(190, 300)).with_overlay(logo_overlay("missing.png")),
            "failing.pdf",
        ),
        nobody,
    );

    let (ok, failing) = (ok.await.unwrap(), failing.await.unwrap());
    assert_eq!(ok.unwrap().pages, 2);
    assert!(matches!(failing, Err(ExportError::CaptureFailed { .. })));
    assert!(dir.path().join("ok.pdf").exists());
    assert!(!dir.path().join("failing.pdf").exists());
}
