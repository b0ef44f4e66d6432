use log::info;
use rstest::*;

use vcs::catalog::{CatalogConfig, MemoryCatalog, Session};
use vcs::core::calls::encode_calls;
use vcs::core::{Call, Node, ReferenceGenome, VariantCallSupport, VcsError};
use vcs::markers::{
    Alignment, SetEntry, SnpMarkerDefinition, add_gdo, add_snp_marker_definitions,
    align_snp_markers_set, create_snp_markers_set, delete_snp_markers_set, get_gdo_stream,
    get_snp_markers, intersect, load_alignments, to_support,
};
use vcs::store::{delete_vcs, get_vcs_by_label, get_vcs_by_vid, save_vcs};

#[fixture]
fn logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[fixture]
fn genome() -> ReferenceGenome {
    ReferenceGenome::new("GRCh37", 26, "GRC", "h", "37").unwrap()
}

fn support(genome: &ReferenceGenome, label: &str, nodes: &[(u8, u32)]) -> VariantCallSupport {
    let mut vcs = VariantCallSupport::new(label, genome);
    vcs.define_support(nodes.iter().map(|n| Node::from(*n))).unwrap();
    vcs
}

fn nodes(list: &[(u8, u32)]) -> Vec<Node> {
    list.iter().map(|n| Node::from(*n)).collect()
}

mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[rstest]
    fn test_creation_with_duplicates(#[from(logging)] _logging: (), genome: ReferenceGenome) {
        let vcs = support(
            &genome,
            "dups",
            &[
                (1, 201),
                (1, 202),
                (2, 203),
                (1, 204),
                (1, 201),
                (2, 202),
                (1, 203),
                (2, 201),
                (1, 202),
                (2, 203),
                (1, 204),
                (1, 201),
                (1, 202),
                (2, 203),
            ],
        );
        assert_eq!(
            vcs.get_nodes(),
            nodes(&[
                (1, 201),
                (1, 202),
                (1, 203),
                (1, 204),
                (2, 201),
                (2, 202),
                (2, 203)
            ])
            .as_slice()
        );
        assert_eq!(
            vcs.get_multiple_origins_nodes(),
            [vec![0, 1, 3, 6], vec![3, 3, 2, 3]]
        );
    }

    #[rstest]
    fn test_selection(genome: ReferenceGenome) {
        let a = support(&genome, "a", &[(1, 1), (1, 2), (1, 3), (2, 1), (2, 3)]);
        let selected = a.selection((Node::new(1, 2), Node::new(2, 3))).unwrap();
        assert_eq!(selected.get_nodes(), nodes(&[(1, 2), (1, 3), (2, 1)]).as_slice());
    }

    #[rstest]
    fn test_union_intersection_complement(genome: ReferenceGenome) {
        let a = support(&genome, "a", &[(1, 1), (1, 2), (1, 3), (2, 1), (2, 3), (2, 4)]);
        let b = support(&genome, "b", &[(1, 3), (2, 1), (2, 2), (2, 3), (3, 1), (3, 2)]);

        assert_eq!(
            a.union(&b).unwrap().get_nodes(),
            nodes(&[
                (1, 1),
                (1, 2),
                (1, 3),
                (2, 1),
                (2, 2),
                (2, 3),
                (2, 4),
                (3, 1),
                (3, 2)
            ])
            .as_slice()
        );
        assert_eq!(
            a.intersection(&b).unwrap().get_nodes(),
            nodes(&[(1, 3), (2, 1), (2, 3)]).as_slice()
        );
        assert_eq!(
            a.complement(&b).unwrap().get_nodes(),
            nodes(&[(1, 1), (1, 2), (2, 4)]).as_slice()
        );
        assert_eq!(
            b.complement(&a).unwrap().get_nodes(),
            nodes(&[(2, 2), (3, 1), (3, 2)]).as_slice()
        );
    }

    #[rstest]
    fn test_pipeline(#[from(logging)] _logging: (), genome: ReferenceGenome) -> anyhow::Result<()> {
        let catalog = MemoryCatalog::new();
        let mut session = Session::new(catalog.clone(), CatalogConfig::default());
        let op = session.mint_vid();

        let masks = [
            ("m0", "GG[A/C]TT"),
            ("m1", "CAT[A/T]ACG"),
            ("m2", "AC[A/G]TT"),
            ("m3", "GC[T/C]TA"),
            ("m4", "GG[A/C]TT"),
            ("m5", "GG[A/C]TT"),
        ];
        let definitions = masks.iter().map(|(label, mask)| SnpMarkerDefinition {
            source: "pipeline".to_string(),
            label: label.to_string(),
            mask: mask.to_string(),
            ..Default::default()
        });
        let minted = add_snp_marker_definitions(&mut session, definitions, &op, true)?;
        let m: Vec<_> = minted.into_iter().map(|(_, vid)| vid).collect();
        let m3 = get_snp_markers(&mut session, Some(&["m3"][..]), None)?;
        assert_eq!(m3[0].mask, "TA[A/G]GC");

        let entries = (0..4).map(|i| SetEntry::new(m[i].clone(), i as u32, i == 3));
        let mut chip_a =
            create_snp_markers_set(&mut session, "chipA", "acme", "A", "1", 4, entries, Some(&op))?;
        align_snp_markers_set(
            &mut session,
            &chip_a,
            &genome,
            vec![
                Alignment::new(m[0].clone(), 1, 100, true, 'A', 1),
                Alignment::new(m[1].clone(), 1, 200, true, 'A', 1),
                Alignment::new(m[2].clone(), 2, 300, false, 'G', 1),
                Alignment::new(m[3].clone(), 3, 400, true, 'A', 1),
            ],
            Some(&op),
        )?;
        load_alignments(&mut session, &mut chip_a, &genome)?;

        let entries = [1, 2, 4, 5]
            .iter()
            .enumerate()
            .map(|(i, k)| SetEntry::new(m[*k].clone(), i as u32, false));
        let mut chip_b =
            create_snp_markers_set(&mut session, "chipB", "acme", "B", "1", 4, entries, Some(&op))?;
        align_snp_markers_set(
            &mut session,
            &chip_b,
            &genome,
            vec![
                Alignment::new(m[1].clone(), 1, 200, true, 'A', 1),
                Alignment::new(m[2].clone(), 2, 300, false, 'G', 1),
                Alignment::new(m[4].clone(), 5, 1, true, 'C', 1),
                Alignment::unaligned(m[5].clone()),
            ],
            None,
        )?;
        load_alignments(&mut session, &mut chip_b, &genome)?;

        let (idx_a, idx_b) = intersect(&chip_a, &chip_b)?;
        assert_eq!(idx_a, vec![1, 2]);
        assert_eq!(idx_b, vec![0, 1]);

        // supports built from both chips
        let va = to_support(&chip_a, "chipA")?;
        let vb = to_support(&chip_b, "chipB")?;
        assert_eq!(va.len(), 4);
        assert_eq!(vb.len(), 3);
        let both = va.union(&vb)?.with_label("chipA+chipB");
        assert_eq!(both.len(), 5);
        assert_eq!(both.get_field("origin")?.len(), 7);
        assert_eq!(
            va.intersection(&vb)?.get_nodes(),
            nodes(&[(1, 200), (2, 300)]).as_slice()
        );
        assert_eq!(
            va.complement(&vb)?.get_nodes(),
            nodes(&[(1, 100), (3, 400)]).as_slice()
        );

        save_vcs(&mut session, &both, Some(&op))?;
        let loaded = get_vcs_by_label(&mut session, "chipA+chipB", Some(&genome))?;
        assert_eq!(loaded.as_ref(), Some(&both));

        // genotypes
        let calls = [Call::AA, Call::AB, Call::BB, Call::NoCall];
        let (probs, confidence) = encode_calls(&calls);
        add_gdo(&mut session, &chip_a, probs, confidence, Some(&op))?;
        let gdos = get_gdo_stream(&mut session, &chip_a).collect::<Result<Vec<_>, _>>()?;
        assert_eq!(gdos.len(), 1);
        assert_eq!(gdos[0].calls(None)?, calls.to_vec());
        let called = gdos[0].calls(None)?;
        let shared: Vec<Call> = idx_a.iter().map(|i| called[*i]).collect();
        assert_eq!(shared, vec![Call::AB, Call::BB]);
        info!("Pipeline produced {} and {} genotype objects", both, gdos.len());

        // an unreachable catalog surfaces as Unavailable
        catalog.set_online(false);
        assert!(matches!(
            get_vcs_by_vid(&mut session, both.vid()),
            Err(VcsError::Unavailable(_))
        ));
        catalog.set_online(true);

        delete_vcs(&mut session, &both)?;
        assert_eq!(get_vcs_by_vid(&mut session, both.vid())?, None);
        delete_snp_markers_set(&mut session, chip_b)?;
        assert!(!session.is_connected());
        Ok(())
    }
}
