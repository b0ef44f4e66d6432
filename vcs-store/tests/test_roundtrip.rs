use pretty_assertions::assert_eq;
use rstest::*;

use vcs_catalog::{CatalogConfig, MemoryCatalog, Session};
use vcs_core::{Column, ColumnKind, FieldArray, Node, ReferenceGenome, Value, VariantCallSupport, Vid};
use vcs_store::{get_vcs_by_label, get_vcs_by_vid, save_vcs};

#[fixture]
fn genome() -> ReferenceGenome {
    ReferenceGenome::new("GRCh37", 26, "GRC", "h", "37").unwrap()
}

/// Five nodes, one dense `origin` field of five rows with fresh VIDs.
fn five_nodes(genome: &ReferenceGenome) -> VariantCallSupport {
    let mut vcs = VariantCallSupport::new("five", genome);
    vcs.define_support(vec![
        Node::new(3, 30),
        Node::new(1, 10),
        Node::new(2, 20),
        Node::new(1, 11),
        Node::new(26, 1),
    ])
    .unwrap();
    let mut origin = FieldArray::new(vec![
        Column::new(ColumnKind::String(34), "marker_vid", "marker VID"),
        Column::new(ColumnKind::Long, "marker_indx", ""),
    ])
    .unwrap();
    for i in (0..5u32).rev() {
        origin
            .push(i, vec![Value::from(Vid::mint('V').as_str()), Value::Long(i as i64)])
            .unwrap();
    }
    vcs.define_dense_field("origin", origin).unwrap();
    vcs
}

#[rstest]
fn test_reload_by_label(genome: ReferenceGenome) {
    let mut session = Session::new(MemoryCatalog::new(), CatalogConfig::default());
    let vcs = five_nodes(&genome);
    save_vcs(&mut session, &vcs, None).unwrap();

    let loaded = get_vcs_by_label(&mut session, "five", None).unwrap().unwrap();
    assert_eq!(loaded.get_nodes(), vcs.get_nodes());
    assert_eq!(
        loaded.get_field("origin").unwrap().rows(),
        vcs.get_field("origin").unwrap().rows()
    );
    assert!(
        loaded
            .get_field("origin")
            .unwrap()
            .indices()
            .eq(0..5u32)
    );
}

#[rstest]
fn test_reload_from_snapshot(genome: ReferenceGenome) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.bin.gz");

    let catalog = MemoryCatalog::new();
    let vcs = five_nodes(&genome);
    {
        let mut session = Session::new(catalog.clone(), CatalogConfig::default());
        save_vcs(&mut session, &vcs, None).unwrap();
    }
    catalog.save_snapshot(&path).unwrap();

    let restored = MemoryCatalog::builder()
        .with_snapshot(path.clone())
        .finish()
        .unwrap();
    let mut session = Session::new(restored, CatalogConfig::default());
    let loaded = get_vcs_by_vid(&mut session, vcs.vid()).unwrap().unwrap();
    assert_eq!(loaded, vcs);
}
