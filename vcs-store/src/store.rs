use log::{debug, info, warn};

use vcs_catalog::{
    Connector, Header, ReferenceGenomeRecord, Selector, Session, VcsRecord, record,
};
use vcs_core::{ReferenceGenome, Value, VariantCallSupport, VcsError, VcsResult, Vid};

use crate::payload::{PayloadDecoder, field_rows, manifest_rows, node_rows, payload_columns};

/// Name of the payload table of a support.
pub fn payload_table(vid: &Vid) -> String {
    vid.as_str().to_string()
}

///
/// Make `genome` known to the catalog. Saving a genome that is already
/// registered under the same VID is a no-op.
///
pub fn register_reference_genome<C: Connector>(
    session: &mut Session<C>,
    genome: &ReferenceGenome,
) -> VcsResult<()> {
    if session
        .get_by_vid::<ReferenceGenomeRecord>(&genome.vid)?
        .is_none()
    {
        session.save(&ReferenceGenomeRecord::from(genome))?;
        info!("Registered reference genome {}", genome);
    }
    Ok(())
}

pub fn get_reference_genome<C: Connector>(
    session: &mut Session<C>,
    vid: &Vid,
) -> VcsResult<Option<ReferenceGenome>> {
    Ok(session
        .get_by_vid::<ReferenceGenomeRecord>(vid)?
        .map(|r| r.genome()))
}

fn write_payload<C: Connector>(
    session: &mut Session<C>,
    table: &str,
    vcs: &VariantCallSupport,
    created: &mut bool,
) -> VcsResult<()> {
    session.create_table(table, &payload_columns(vcs))?;
    *created = true;
    let nodes = session.add_table_rows_stream(table, node_rows(vcs), None)?;
    let fields = session.add_table_rows_stream(table, field_rows(vcs), None)?;
    session.add_table_rows_stream(table, manifest_rows(vcs)?, None)?;
    debug!(
        "Wrote payload of {}: {} node rows, {} field rows",
        vcs.label(),
        nodes,
        fields
    );
    Ok(())
}

///
/// Persist `vcs`: its catalog object first, then its payload table.
///
/// A support whose VID is already in the catalog is refused with
/// [VcsError::AlreadyExists] before anything is written.
/// The reference genome is registered on the way. If writing the payload
/// fails the object is deleted again and the table dropped, so the catalog
/// either holds the whole support or nothing of it.
///
/// # Returns
/// - the catalog id of the saved object
pub fn save_vcs<C: Connector>(
    session: &mut Session<C>,
    vcs: &VariantCallSupport,
    action: Option<&Vid>,
) -> VcsResult<u64> {
    if session.get_by_vid::<VcsRecord>(vcs.vid())?.is_some() {
        return Err(VcsError::AlreadyExists(format!(
            "{} is already saved as {}",
            vcs.label(),
            vcs.vid()
        )));
    }
    register_reference_genome(session, vcs.reference_genome())?;
    let vcs_record = VcsRecord {
        header: Header::new(vcs.vid().clone(), vcs.label()).with_action(action),
        reference_genome: vcs.reference_genome().vid.clone(),
        n_nodes: vcs.len() as u64,
    };
    let id = session.save(&vcs_record)?;

    let table = payload_table(vcs.vid());
    let mut created = false;
    if let Err(e) = write_payload(session, &table, vcs, &mut created) {
        warn!("Saving {} failed, rolling back: {}", vcs.label(), e);
        session.delete(&vcs_record)?;
        if created && session.delete_table(&table).is_err() {
            warn!("Could not drop payload table {}", table);
        }
        return Err(e);
    }
    info!(
        "Saved {} ({} nodes, {} fields) as {}",
        vcs.label(),
        vcs.len(),
        vcs.get_fields().len(),
        vcs.vid()
    );
    Ok(id)
}

fn load_vcs<C: Connector>(session: &mut Session<C>, vcs_record: &VcsRecord) -> VcsResult<VariantCallSupport> {
    let vid = &vcs_record.header.vid;
    let genome = get_reference_genome(session, &vcs_record.reference_genome)?.ok_or_else(|| {
        VcsError::Corrupt(format!(
            "{} refers to unknown reference genome {}",
            vid, vcs_record.reference_genome
        ))
    })?;

    let mut decoder = PayloadDecoder::new(vid);
    for row in session.get_table_rows(&payload_table(vid), &Selector::all(), &[], None) {
        let row = row.map_err(|e| match e {
            VcsError::NotFound(msg) => VcsError::Corrupt(format!("Payload of {} missing: {}", vid, msg)),
            other => other,
        })?;
        decoder.push(row)?;
    }
    let vcs = decoder.finish(&vcs_record.header.label, &genome)?;
    if vcs.len() as u64 != vcs_record.n_nodes {
        return Err(VcsError::Corrupt(format!(
            "{} declares {} nodes, payload holds {}",
            vid,
            vcs_record.n_nodes,
            vcs.len()
        )));
    }
    Ok(vcs)
}

pub fn get_vcs_by_vid<C: Connector>(
    session: &mut Session<C>,
    vid: &Vid,
) -> VcsResult<Option<VariantCallSupport>> {
    match session.get_by_vid::<VcsRecord>(vid)? {
        Some(vcs_record) => load_vcs(session, &vcs_record).map(Some),
        None => Ok(None),
    }
}

///
/// Load the support called `label`, `None` when there is none.
///
/// Labels are unique per reference genome; without `genome` a label used on
/// several genomes is [VcsError::Ambiguous].
///
pub fn get_vcs_by_label<C: Connector>(
    session: &mut Session<C>,
    label: &str,
    genome: Option<&ReferenceGenome>,
) -> VcsResult<Option<VariantCallSupport>> {
    let mut found = match genome {
        Some(genome) => session.find_by_query::<VcsRecord>(
            "(label == :label) & (reference_genome == :reference_genome)",
            &record([
                ("label", Value::from(label)),
                ("reference_genome", Value::from(genome.vid.as_str())),
            ]),
        )?,
        None => session
            .find_by_query::<VcsRecord>("label == :label", &record([("label", label)]))?,
    };
    match found.len() {
        0 => Ok(None),
        1 => {
            let vcs_record = found.remove(0);
            load_vcs(session, &vcs_record).map(Some)
        }
        n => Err(VcsError::Ambiguous(format!(
            "{} variant call supports are labelled {}",
            n, label
        ))),
    }
}

///
/// Drop the payload table of `vcs` and delete its catalog object.
///
pub fn delete_vcs<C: Connector>(session: &mut Session<C>, vcs: &VariantCallSupport) -> VcsResult<()> {
    let table = payload_table(vcs.vid());
    if session.has_table(&table)? {
        session.delete_table(&table)?;
    }
    session.delete_by_vid(vcs.vid())?;
    info!("Deleted {} ({})", vcs.label(), vcs.vid());
    Ok(())
}
