//! End-to-end tests through the public API: building a portfolio, saving it
//! with the file bridge, reopening it and rendering it.

use folio::config::{ExportConfig, PageSize};
use folio::document::{Document, PageField};
use folio::persistence::{FileBridge, Outcome, RecentState};
use folio::render::render_document;
use folio::session::{Session, SessionEvent, SessionOptions};
use folio::types::{Page, UserIdentity};
use std::path::Path;
use tempfile::TempDir;

/// Minimal little-endian JPEG whose Exif IFD holds one DateTimeOriginal.
fn jpeg_taken_at(date: &str) -> Vec<u8> {
    let mut value = date.as_bytes().to_vec();
    value.push(0);

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes());
    // IFD0: ExifIFDPointer -> 26
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x8769u16.to_le_bytes());
    tiff.extend_from_slice(&4u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&26u32.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());
    // Exif IFD: DateTimeOriginal (ASCII) stored at 44
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x9003u16.to_le_bytes());
    tiff.extend_from_slice(&2u16.to_le_bytes());
    tiff.extend_from_slice(&(value.len() as u32).to_le_bytes());
    tiff.extend_from_slice(&44u32.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());
    tiff.extend_from_slice(&value);

    let mut app1 = b"Exif\0\0".to_vec();
    app1.extend_from_slice(&tiff);

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((app1.len() + 2) as u16).to_be_bytes());
    jpeg.extend_from_slice(&app1);
    jpeg.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0x00, 0x00]);
    jpeg
}

fn session_in(dir: &Path) -> Session<FileBridge> {
    let bridge = FileBridge::new(dir, ExportConfig::default());
    Session::new(bridge, SessionOptions::default()).unwrap()
}

// =========================================================================
// Document model
// =========================================================================

#[test]
fn building_a_portfolio_from_scratch() {
    let mut doc = Document::new();
    assert!(doc.is_empty());

    doc.set_identity(UserIdentity {
        name: "A. Artist".to_string(),
        ..Default::default()
    });
    match doc.page(0) {
        Some(Page::Cover { data }) => assert_eq!(data.name, "A. Artist"),
        other => panic!("expected cover, got {other:?}"),
    }

    doc.append_single_page(None, None, None, None);
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.page(1).unwrap().display_title(), "Image 1");

    doc.append_series("Show", "", "", 2);
    assert_eq!(doc.len(), 5);
    match doc.page(2) {
        Some(Page::SeriesCover { data, .. }) => assert_eq!(data.total, 2),
        other => panic!("expected series cover, got {other:?}"),
    }
    for (index, title) in [(3, "Image 1"), (4, "Image 2")] {
        let page = doc.page(index).unwrap();
        assert_eq!(page.display_title(), title);
        assert_eq!(page.series_key(), Some("Show"));
    }
}

#[test]
fn reordering_keeps_series_ordinals_current() {
    let mut doc = Document::new();
    doc.append_series("Show", "", "", 3);
    doc.swap(1, 3).unwrap();

    assert_eq!(doc.series_ordinals(), vec![None, Some(1), Some(2), Some(3)]);
    assert_eq!(doc.page(1).unwrap().display_title(), "Image 3");
    assert!(doc.series_layout_issues().is_empty());
}

// =========================================================================
// Save and reopen
// =========================================================================

#[test]
fn save_then_reopen_restores_the_document() {
    let tmp = TempDir::new().unwrap();
    let mut session = session_in(tmp.path());
    let events = session.subscribe();

    session.set_identity(UserIdentity {
        name: "A. Artist".to_string(),
        email: "a@example.com".to_string(),
        ..Default::default()
    });
    session.append_series("Show", "2020", "Night walks", 2);
    session
        .edit_field(1, PageField::Desc, "  Walks at night  ")
        .unwrap();
    assert!(session.is_dirty());

    let saved = session.save().unwrap().completed().unwrap();
    assert_eq!(saved, tmp.path().join("Portfolio.json"));
    assert!(!session.is_dirty());
    assert!(
        events
            .try_iter()
            .any(|e| e == SessionEvent::Saved(saved.clone()))
    );

    let mut reopened = session_in(tmp.path());
    reopened.open_at(&saved).unwrap();
    assert_eq!(reopened.document(), session.document());
    assert_eq!(reopened.path(), Some(saved.as_path()));
    assert!(!reopened.is_dirty());
}

#[test]
fn second_portfolio_gets_a_numbered_name() {
    let tmp = TempDir::new().unwrap();
    let mut session = session_in(tmp.path());

    let first = session.new_document().unwrap().completed().unwrap();
    let second = session.new_document().unwrap().completed().unwrap();

    assert_eq!(first.file_name().unwrap(), "Portfolio.json");
    assert_eq!(second.file_name().unwrap(), "Portfolio 2.json");
    assert_eq!(session.path(), Some(second.as_path()));
}

#[test]
fn attached_image_is_embedded_with_its_capture_year() {
    let tmp = TempDir::new().unwrap();
    let photo = tmp.path().join("dusk.jpg");
    std::fs::write(&photo, jpeg_taken_at("2019:06:01 20:15:00")).unwrap();

    let mut session = session_in(tmp.path());
    session.append_single_page(Some("Dusk".to_string()), None, None);
    session.attach_image(0, &photo).unwrap();
    assert_eq!(session.wait_for_pending(), 1);

    let page = session.document().page(0).unwrap();
    let Page::Single { data, image } = page else {
        panic!("expected single page, got {page:?}");
    };
    assert_eq!(data.year, "2019");
    let image = image.as_ref().unwrap();
    assert_eq!(image.mime(), Some("image/jpeg"));
    assert_eq!(image.to_bytes().unwrap(), std::fs::read(&photo).unwrap());
}

#[test]
fn bulk_add_from_directory_appends_single_pages() {
    let tmp = TempDir::new().unwrap();
    let photos = tmp.path().join("photos");
    std::fs::create_dir(&photos).unwrap();
    std::fs::write(photos.join("a.jpg"), jpeg_taken_at("2001:01:01 00:00:00")).unwrap();
    std::fs::write(photos.join("b.jpg"), jpeg_taken_at("2002:01:01 00:00:00")).unwrap();
    std::fs::write(photos.join("notes.txt"), "not an image").unwrap();

    let mut session = session_in(tmp.path());
    session.bridge_mut().set_image_sources(vec![photos]);
    let ids = session.add_images_from_dialog().unwrap().completed().unwrap();
    assert_eq!(ids.len(), 2);
    session.wait_for_pending();

    let years: Vec<_> = session
        .document()
        .pages()
        .map(|p| match p {
            Page::Single { data, .. } => data.year.clone(),
            other => panic!("unexpected page {other:?}"),
        })
        .collect();
    assert_eq!(years, vec!["2001", "2002"]);
}

#[test]
fn recent_state_reopens_last_portfolio() {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join(".folio");

    let mut session = session_in(tmp.path());
    session.append_single_page(None, None, None);
    let path = session.save().unwrap().completed().unwrap();
    RecentState {
        last_portfolio_path: Some(path.clone()),
        has_run: true,
    }
    .save(&config_dir)
    .unwrap();

    let recent = RecentState::load(&config_dir);
    let mut restored = session_in(tmp.path());
    assert!(restored.restore_recent(&recent));
    assert_eq!(restored.document().len(), 1);
}

#[test]
fn export_without_print_command_fails_and_notifies() {
    let tmp = TempDir::new().unwrap();
    let mut session = session_in(tmp.path());
    let events = session.subscribe();
    session
        .bridge_mut()
        .set_export_target(tmp.path().join("out.pdf"));

    assert!(session.export().is_err());
    assert!(
        events
            .try_iter()
            .any(|e| matches!(e, SessionEvent::Notice(m) if m.starts_with("Export failed")))
    );
}

#[test]
fn export_without_target_is_canceled() {
    let tmp = TempDir::new().unwrap();
    let mut session = session_in(tmp.path());
    assert!(matches!(session.export(), Ok(Outcome::Canceled)));
}

// =========================================================================
// Render
// =========================================================================

#[test]
fn rendered_portfolio_is_self_contained() {
    let mut doc = Document::new();
    doc.set_identity(UserIdentity {
        name: "A. Artist".to_string(),
        ..Default::default()
    });
    doc.append_series("Show", "2020", "", 1);

    let html = render_document(&doc, PageSize::Letter);

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("size: letter"));
    assert!(html.contains("A. Artist"));
    assert!(html.contains("1 images · Project"));
    assert!(html.contains("Image 1 of 1"));
    assert!(!html.contains("<link"));
    assert!(!html.contains("<script"));
}
