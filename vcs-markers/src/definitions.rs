use log::{debug, info};
use std::collections::HashMap;

use vcs_catalog::{
    Connector, Record, RecordExt, Selector, Session, Table, chunked_disjunction, record,
};
use vcs_core::{Value, VcsError, VcsResult, Vid};

use crate::consts::{SNP_DEFINITIONS_TABLE, definition_columns};
use crate::mask::{convert_to_top, split_mask};

///
/// A marker definition as supplied to an import.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnpMarkerDefinition {
    pub source: String,
    pub context: String,
    pub release: String,
    pub label: String,
    pub rs_label: String,
    pub mask: String,
}

///
/// A stored marker.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub vid: Vid,
    pub source: String,
    pub context: String,
    pub release: String,
    pub label: String,
    pub rs_label: String,
    pub mask: String,
    pub op_vid: Vid,
}

impl Marker {
    fn from_record(record: &Record) -> VcsResult<Self> {
        Ok(Marker {
            vid: record.get_vid("vid")?,
            source: record.get_str("source")?.to_string(),
            context: record.get_str("context")?.to_string(),
            release: record.get_str("release")?.to_string(),
            label: record.get_str("label")?.to_string(),
            rs_label: record.get_str("rs_label")?.to_string(),
            mask: record.get_str("mask")?.to_string(),
            op_vid: record.get_vid("op_vid")?,
        })
    }
}

pub(crate) fn ensure_table<C: Connector>(
    session: &mut Session<C>,
    name: &str,
    columns: Vec<vcs_core::Column>,
) -> VcsResult<()> {
    if !session.has_table(name)? {
        session.create_table(name, &columns)?;
    }
    Ok(())
}

///
/// Import marker definitions, minting one VID per marker.
///
/// Every definition is checked before anything is written: a malformed
/// mask or a value that does not fit its column refuses the whole import
/// with an error naming the offending marker. With `to_top` set each mask
/// is stored in TOP orientation.
///
/// # Returns
/// - `(label, vid)` for every imported marker, in input order
pub fn add_snp_marker_definitions<C, I>(
    session: &mut Session<C>,
    definitions: I,
    op_vid: &Vid,
    to_top: bool,
) -> VcsResult<Vec<(String, Vid)>>
where
    C: Connector,
    I: IntoIterator<Item = SnpMarkerDefinition>,
{
    let schema = Table::new(SNP_DEFINITIONS_TABLE, definition_columns())?;
    let mut records = Vec::new();
    let mut minted = Vec::new();
    for (i, definition) in definitions.into_iter().enumerate() {
        let refuse = |e: VcsError| {
            VcsError::Usage(format!(
                "Marker {:?} (record {}) refused: {}",
                definition.label, i, e
            ))
        };
        let mask = if to_top {
            convert_to_top(&definition.mask).map_err(|e| refuse(e.into()))?.0
        } else {
            split_mask(&definition.mask).map_err(|e| refuse(e.into()))?;
            definition.mask.clone()
        };
        let vid = session.mint_vid();
        let row = record([
            ("vid", Value::from(vid.as_str())),
            ("source", Value::from(definition.source.as_str())),
            ("context", Value::from(definition.context.as_str())),
            ("release", Value::from(definition.release.as_str())),
            ("label", Value::from(definition.label.as_str())),
            ("rs_label", Value::from(definition.rs_label.as_str())),
            ("mask", Value::from(mask)),
            ("op_vid", Value::from(op_vid.as_str())),
        ]);
        schema.coerce(&row).map_err(refuse)?;
        records.push(row);
        minted.push((definition.label, vid));
    }

    ensure_table(session, SNP_DEFINITIONS_TABLE, definition_columns())?;
    let written = session.add_table_rows_stream(SNP_DEFINITIONS_TABLE, records, None)?;
    info!("Imported {} marker definitions", written);
    Ok(minted)
}

///
/// Look markers up by label or by VID; exactly one of the two must be given.
///
/// Markers come back in request order. An identifier without a match is a
/// [VcsError::NotFound].
///
pub fn get_snp_markers<C: Connector>(
    session: &mut Session<C>,
    labels: Option<&[&str]>,
    vids: Option<&[Vid]>,
) -> VcsResult<Vec<Marker>> {
    let (column, keys): (&str, Vec<String>) = match (labels, vids) {
        (Some(labels), None) => ("label", labels.iter().map(|l| l.to_string()).collect()),
        (None, Some(vids)) => ("vid", vids.iter().map(|v| v.as_str().to_string()).collect()),
        _ => {
            return Err(VcsError::Usage(
                "Exactly one of labels and vids must be given".to_string(),
            ));
        }
    };
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let mut wanted: Vec<&String> = keys.iter().collect();
    wanted.sort();
    wanted.dedup();
    let values: Vec<Value> = wanted.iter().map(|k| Value::from(k.as_str())).collect();
    let chunks = chunked_disjunction(column, &values, session.config().max_selector_terms);
    debug!(
        "Resolving {} markers by {} in {} chunks",
        values.len(),
        column,
        chunks.len()
    );

    let mut found: HashMap<String, Marker> = HashMap::new();
    for chunk in chunks {
        let selector = Selector::parse(&chunk)?;
        for row in session.get_table_rows(SNP_DEFINITIONS_TABLE, &selector, &[], None) {
            let marker = Marker::from_record(&row?)?;
            let key = match column {
                "label" => marker.label.clone(),
                _ => marker.vid.as_str().to_string(),
            };
            found.entry(key).or_insert(marker);
        }
    }

    keys.iter()
        .map(|k| {
            found
                .get(k)
                .cloned()
                .ok_or_else(|| VcsError::NotFound(format!("No marker with {} {}", column, k)))
        })
        .collect()
}
