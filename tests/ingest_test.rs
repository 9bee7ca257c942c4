mod common;

use anyhow::Result;
use common::{minimal_docx, minimal_pdf, FailingTagger, WordTagger};
use doc_tagger::core::catalog::JsonCatalog;
use doc_tagger::domain::model::{DocumentKind, UploadedFile};
use doc_tagger::domain::ports::{DocumentRepository, KeywordTagger};
use doc_tagger::{DocError, IngestService, LocalStorage};
use std::sync::Arc;
use tempfile::TempDir;

async fn service(dir: &TempDir, tagger: Option<Arc<dyn KeywordTagger>>) -> Result<IngestService<LocalStorage>> {
    let catalog: Arc<dyn DocumentRepository> = Arc::new(JsonCatalog::open(dir.path()).await?);
    Ok(IngestService::new(LocalStorage::new(dir.path()), catalog)
        .with_tagger(tagger)
        .with_max_upload_bytes(64 * 1024))
}

#[tokio::test]
async fn test_pdf_upload_writes_text_file_with_same_base_name() -> Result<()> {
    let dir = TempDir::new()?;
    let tagger: Arc<dyn KeywordTagger> = Arc::new(WordTagger);
    let service = service(&dir, Some(tagger)).await?;

    let upload = UploadedFile::new("reports/annual.pdf", minimal_pdf("Hello biology")).with_content_type("application/pdf");
    let view = service.ingest(upload).await?;

    assert_eq!(view.record.kind, DocumentKind::Pdf);
    assert_eq!(view.record.text_path, "annual.txt");
    assert_eq!(view.record.file_name, "reports/annual.pdf");
    assert_eq!(view.record.content_type.as_deref(), Some("application/pdf"));
    assert!(view.extracted_text.contains("Hello"));
    assert!(view.record.tags.contains(&"hello".to_string()));

    let on_disk = std::fs::read_to_string(dir.path().join("annual.txt"))?;
    assert_eq!(on_disk, view.extracted_text);
    assert!(dir.path().join("index.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_docx_and_plain_text_uploads() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service(&dir, None).await?;

    let docx = service
        .ingest(UploadedFile::new("letter.docx", minimal_docx(&["Dear reader", "Goodbye"])))
        .await?;
    assert_eq!(docx.extracted_text, "Dear reader\nGoodbye");
    assert!(docx.record.tags.is_empty());

    let text = service
        .ingest(UploadedFile::new("notes.text", "plain notes".as_bytes()))
        .await?;
    assert_eq!(text.record.kind, DocumentKind::PlainText);
    assert_eq!(text.record.char_count, 11);
    assert_eq!(std::fs::read_to_string(dir.path().join("notes.txt"))?, "plain notes");

    assert_eq!(service.list().await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_reupload_overwrites_file_and_catalog_entry() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service(&dir, None).await?;

    let first = service.ingest(UploadedFile::new("draft.txt", "first".as_bytes())).await?;
    let second = service.ingest(UploadedFile::new("draft.txt", "second".as_bytes())).await?;
    assert!(second.record.id > first.record.id);

    let records = service.list().await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, second.record.id);
    assert_eq!(std::fs::read_to_string(dir.path().join("draft.txt"))?, "second");

    let err = service.get(first.record.id).await.unwrap_err();
    assert!(matches!(err, DocError::NotFound { .. }));
    assert_eq!(service.get(second.record.id).await?.extracted_text, "second");
    Ok(())
}

#[tokio::test]
async fn test_concurrent_same_name_uploads_leave_consistent_state() -> Result<()> {
    let dir = TempDir::new()?;
    let service = Arc::new(service(&dir, None).await?);

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .ingest(UploadedFile::new("shared.txt", format!("version {}", i).into_bytes()))
                .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let records = service.list().await?;
    assert_eq!(records.len(), 1);
    let view = service.get(records[0].id).await?;
    let on_disk = std::fs::read_to_string(dir.path().join("shared.txt"))?;
    assert_eq!(view.extracted_text, on_disk);
    assert_eq!(records[0].char_count, on_disk.chars().count());
    Ok(())
}

#[tokio::test]
async fn test_rejections_store_nothing() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service(&dir, None).await?;

    let err = service
        .ingest(UploadedFile::new("photo.png", vec![0u8; 16]))
        .await
        .unwrap_err();
    assert!(matches!(err, DocError::UnsupportedFileType { ref extension, .. } if extension == "png"));

    let err = service
        .ingest(UploadedFile::new("big.txt", vec![b'a'; 64 * 1024 + 1]))
        .await
        .unwrap_err();
    assert!(matches!(err, DocError::PayloadTooLarge { .. }));

    let err = service
        .ingest(UploadedFile::new("broken.pdf", b"%PDF-1.7 truncated".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, DocError::ExtractionError { .. }));

    let err = service
        .ingest_all(vec![
            UploadedFile::new("fine.txt", "ok".as_bytes()),
            UploadedFile::new("virus.exe", "nope".as_bytes()),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, DocError::UnsupportedFileType { .. }));

    let err = service.ingest_all(Vec::new()).await.unwrap_err();
    assert!(matches!(err, DocError::MissingFileField));

    assert!(service.list().await?.is_empty());
    assert!(!dir.path().join("fine.txt").exists());
    assert!(!dir.path().join("broken.txt").exists());
    Ok(())
}

#[tokio::test]
async fn test_batch_with_unreadable_file_stores_nothing() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service(&dir, None).await?;

    let err = service
        .ingest_all(vec![
            UploadedFile::new("good.txt", "kept back".as_bytes()),
            UploadedFile::new("broken.pdf", b"%PDF-1.4 garbage".to_vec()),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, DocError::ExtractionError { ref file_name, .. } if file_name == "broken.pdf"));

    assert_eq!(service.count().await, 0);
    assert!(!dir.path().join("good.txt").exists());
    assert!(!dir.path().join("broken.txt").exists());

    // 修正後重送同一批次
    let views = service
        .ingest_all(vec![
            UploadedFile::new("good.txt", "kept back".as_bytes()),
            UploadedFile::new("fixed.pdf", minimal_pdf("Recovered")),
        ])
        .await?;
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].record.id, 1);
    assert_eq!(service.count().await, 2);
    Ok(())
}

#[tokio::test]
async fn test_batch_over_file_count_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service(&dir, None).await?.with_max_files_per_request(2);

    let files = (0..3)
        .map(|i| UploadedFile::new(format!("n{}.txt", i), "x".as_bytes()))
        .collect();
    let err = service.ingest_all(files).await.unwrap_err();
    assert!(matches!(err, DocError::InvalidRequest { .. }));
    assert_eq!(service.count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_tagging_failure_does_not_fail_upload() -> Result<()> {
    let dir = TempDir::new()?;
    let tagger: Arc<dyn KeywordTagger> = Arc::new(FailingTagger);
    let service = service(&dir, Some(tagger)).await?;

    let view = service
        .ingest(UploadedFile::new("animals.txt", "Animals and biology".as_bytes()))
        .await?;
    assert!(view.record.tags.is_empty());
    assert_eq!(view.extracted_text, "Animals and biology");
    Ok(())
}

#[tokio::test]
async fn test_catalog_survives_restart() -> Result<()> {
    let dir = TempDir::new()?;
    {
        let service = service(&dir, None).await?;
        service.ingest(UploadedFile::new("a.txt", "alpha".as_bytes())).await?;
        service.ingest(UploadedFile::new("b.txt", "beta".as_bytes())).await?;
    }

    let service = service(&dir, None).await?;
    let records = service.list().await?;
    assert_eq!(records.len(), 2);
    let b = records.iter().find(|r| r.file_name == "b.txt").unwrap();
    assert_eq!(service.get(b.id).await?.extracted_text, "beta");

    let c = service.ingest(UploadedFile::new("c.txt", "gamma".as_bytes())).await?;
    assert_eq!(c.record.id, 3);
    Ok(())
}
