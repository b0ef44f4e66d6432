//! Genotype data objects (GDOs): one probability array per sample and
//! marker set, stored in a per-set table.

use log::{debug, warn};

use vcs_catalog::{
    Connector, DataSampleRecord, Header, Record, RecordExt, Selector, Session, record,
    selector::literal,
};
use vcs_core::calls::{apply_flip, project_calls};
use vcs_core::{Call, Value, VcsError, VcsResult, Vid};

use crate::consts::gdo_columns;
use crate::definitions::ensure_table;
use crate::marker_set::{MarkerSet, gdo_table};

#[derive(Clone, Debug, PartialEq)]
pub struct Gdo {
    pub vid: Vid,
    pub op_vid: String,
    /// `2 x N` row-major: `p_AA` for every marker, then `p_BB`.
    pub probs: Vec<f32>,
    pub confidence: Vec<f32>,
}

impl Gdo {
    fn from_record(row: &Record) -> VcsResult<Self> {
        Ok(Gdo {
            vid: row.get_vid("vid")?,
            op_vid: row.get_str("op_vid")?.to_string(),
            probs: row.get_float_array("probs")?.to_vec(),
            confidence: row.get_float_array("confidence")?.to_vec(),
        })
    }

    /// Discrete calls, one per marker, called at `threshold` (default 1.0).
    pub fn calls(&self, threshold: Option<f32>) -> VcsResult<Vec<Call>> {
        project_calls(&self.probs, threshold)
    }

    ///
    /// Probabilities with A and B swapped wherever `flips` is set, for
    /// comparing data across sets using opposite allele conventions.
    ///
    pub fn flipped_probs(&self, flips: &[bool]) -> VcsResult<Vec<f32>> {
        let mut probs = self.probs.clone();
        apply_flip(&mut probs, flips)?;
        Ok(probs)
    }
}

///
/// Store a genotype data object for `mset` and register it as a data sample.
///
/// `probs` holds `2 x N` values and `confidence` `N` values, `N` being the
/// size of the set.
///
pub fn add_gdo<C: Connector>(
    session: &mut Session<C>,
    mset: &MarkerSet,
    probs: Vec<f32>,
    confidence: Vec<f32>,
    action: Option<&Vid>,
) -> VcsResult<Vid> {
    let n = mset.len();
    if probs.len() != 2 * n || confidence.len() != n {
        return Err(VcsError::Usage(format!(
            "Genotype arrays of lengths {} and {} do not fit marker set {} of {} markers",
            probs.len(),
            confidence.len(),
            mset.label(),
            n
        )));
    }
    let table = gdo_table(mset.vid());
    ensure_table(session, &table, gdo_columns(n))?;

    let vid = session.mint_vid();
    let sample = DataSampleRecord {
        header: Header::new(vid.clone(), vid.as_str()).with_action(action),
        marker_set: mset.vid().clone(),
        data_table: table.clone(),
    };
    session.save(&sample)?;

    let row = record([
        ("vid", Value::from(vid.as_str())),
        ("op_vid", Value::from(action.map(|a| a.as_str()).unwrap_or_default())),
        ("probs", Value::FloatArray(probs)),
        ("confidence", Value::FloatArray(confidence)),
    ]);
    if let Err(e) = session.add_table_row(&table, row) {
        warn!("Storing genotypes {} failed, rolling back: {}", vid, e);
        session.delete(&sample)?;
        return Err(e);
    }
    debug!("Stored genotypes {} for marker set {}", vid, mset.label());
    Ok(vid)
}

pub fn get_gdo<C: Connector>(session: &mut Session<C>, mset: &MarkerSet, vid: &Vid) -> VcsResult<Gdo> {
    let selector = Selector::parse(&format!("vid == {}", literal(&Value::from(vid.as_str()))))?;
    let row = session
        .get_table_rows(&gdo_table(mset.vid()), &selector, &[], Some(1))
        .next()
        .transpose()?
        .ok_or_else(|| {
            VcsError::NotFound(format!(
                "No genotypes {} for marker set {}",
                vid,
                mset.label()
            ))
        })?;
    Gdo::from_record(&row)
}

///
/// Every genotype data object of `mset`, streamed.
///
pub fn get_gdo_stream<'s, C: Connector>(
    session: &'s mut Session<C>,
    mset: &MarkerSet,
) -> impl Iterator<Item = VcsResult<Gdo>> + use<'s, C> {
    session
        .get_table_rows(&gdo_table(mset.vid()), &Selector::all(), &[], None)
        .map(|row| row.and_then(|r| Gdo::from_record(&r)))
}
