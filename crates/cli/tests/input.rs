use cli::input::{load_document, load_documents};
use std::fs;
use tempfile::tempdir;

#[test]
fn plain_text_documents_keep_their_file_names() {
    let temp = tempdir().unwrap();
    let a = temp.path().join("sow_a.txt");
    let b = temp.path().join("sow_b.txt");
    fs::write(&a, "The contractor shall provide support as needed.").unwrap();
    fs::write(&b, "Deliver a final report.").unwrap();

    let docs = load_documents(&[a, b], false).unwrap();
    assert_eq!(docs[0].filename, "sow_a.txt");
    assert_eq!(docs[1].full_text(), "Deliver a final report.");
    assert!(docs[0].extracted.is_none());
}

#[test]
fn extraction_records_rebuild_text() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("sow_extracted.json");
    fs::write(
        &path,
        r#"{
            "metadata": {"filename": "original.pdf"},
            "objectives": [{"text": "Reduce backlog"}],
            "deliverables": [{"name": "Monthly report"}]
        }"#,
    )
    .unwrap();

    let doc = load_document(&path, true).unwrap();
    assert_eq!(doc.filename, "original.pdf");
    assert_eq!(doc.full_text(), "Reduce backlog\n\nDeliverable: Monthly report");
    assert!(doc.structured().get("objectives").is_some());
}

#[test]
fn bad_inputs_are_errors() {
    let temp = tempdir().unwrap();
    assert!(load_document(&temp.path().join("missing.txt"), false).is_err());

    let list = temp.path().join("list.json");
    fs::write(&list, "[1, 2]").unwrap();
    assert!(load_document(&list, true).is_err());
}
