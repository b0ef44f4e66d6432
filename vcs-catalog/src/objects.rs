use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use vcs_core::{ReferenceGenome, Value, Vid};

use crate::record::Record;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    ReferenceGenome,
    MarkerSet,
    VariantCallSupport,
    DataSample,
    Action,
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::ReferenceGenome => "ReferenceGenome",
            ObjectKind::MarkerSet => "SNPMarkersSet",
            ObjectKind::VariantCallSupport => "VariantCallSupport",
            ObjectKind::DataSample => "DataSample",
            ObjectKind::Action => "Action",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Unknown,
    Usable,
    Unusable,
    Destroyed,
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Unknown => "UNKNOWN",
            Status::Usable => "USABLE",
            Status::Unusable => "UNUSABLE",
            Status::Destroyed => "DESTROYED",
        };
        write!(f, "{}", name)
    }
}

///
/// Attributes every catalog object carries.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub vid: Vid,
    pub label: String,
    pub action: Option<Vid>,
    pub status: Status,
}

impl Header {
    pub fn new(vid: Vid, label: &str) -> Self {
        Header {
            vid,
            label: label.to_string(),
            action: None,
            status: Status::Usable,
        }
    }

    pub fn with_action(mut self, action: Option<&Vid>) -> Self {
        self.action = action.cloned();
        self
    }

    fn attributes(&self) -> Record {
        let mut record = Record::new();
        record.insert("vid".into(), Value::from(self.vid.as_str()));
        record.insert("label".into(), Value::from(self.label.as_str()));
        record.insert(
            "action".into(),
            Value::from(self.action.as_ref().map(|a| a.as_str()).unwrap_or_default()),
        );
        record.insert("status".into(), Value::from(self.status.to_string()));
        record
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceGenomeRecord {
    pub header: Header,
    pub n_chroms: u8,
    pub maker: String,
    pub model: String,
    pub release: String,
}

impl ReferenceGenomeRecord {
    pub fn genome(&self) -> ReferenceGenome {
        ReferenceGenome {
            vid: self.header.vid.clone(),
            label: self.header.label.clone(),
            n_chroms: self.n_chroms,
            maker: self.maker.clone(),
            model: self.model.clone(),
            release: self.release.clone(),
        }
    }
}

impl From<&ReferenceGenome> for ReferenceGenomeRecord {
    fn from(genome: &ReferenceGenome) -> Self {
        ReferenceGenomeRecord {
            header: Header::new(genome.vid.clone(), &genome.label),
            n_chroms: genome.n_chroms,
            maker: genome.maker.clone(),
            model: genome.model.clone(),
            release: genome.release.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerSetRecord {
    pub header: Header,
    pub maker: String,
    pub model: String,
    pub release: String,
    pub size: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VcsRecord {
    pub header: Header,
    pub reference_genome: Vid,
    pub n_nodes: u64,
}

/// A data object tied to a marker set, such as a genotype data object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataSampleRecord {
    pub header: Header,
    pub marker_set: Vid,
    pub data_table: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub header: Header,
    pub description: String,
    pub target: Option<Vid>,
}

///
/// Every object the catalog stores.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Object {
    ReferenceGenome(ReferenceGenomeRecord),
    MarkerSet(MarkerSetRecord),
    VariantCallSupport(VcsRecord),
    DataSample(DataSampleRecord),
    Action(ActionRecord),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::ReferenceGenome(_) => ObjectKind::ReferenceGenome,
            Object::MarkerSet(_) => ObjectKind::MarkerSet,
            Object::VariantCallSupport(_) => ObjectKind::VariantCallSupport,
            Object::DataSample(_) => ObjectKind::DataSample,
            Object::Action(_) => ObjectKind::Action,
        }
    }

    pub fn header(&self) -> &Header {
        match self {
            Object::ReferenceGenome(o) => &o.header,
            Object::MarkerSet(o) => &o.header,
            Object::VariantCallSupport(o) => &o.header,
            Object::DataSample(o) => &o.header,
            Object::Action(o) => &o.header,
        }
    }

    pub fn vid(&self) -> &Vid {
        &self.header().vid
    }

    ///
    /// Values that must be unique among the objects of one kind.
    ///
    pub fn unique_key(&self) -> Vec<String> {
        match self {
            Object::ReferenceGenome(o) => {
                vec![o.maker.clone(), o.model.clone(), o.release.clone()]
            }
            Object::MarkerSet(o) => vec![o.maker.clone(), o.model.clone(), o.release.clone()],
            Object::VariantCallSupport(o) => vec![
                o.reference_genome.as_str().to_string(),
                o.header.label.clone(),
            ],
            Object::DataSample(o) => vec![o.header.vid.as_str().to_string()],
            Object::Action(o) => vec![o.header.vid.as_str().to_string()],
        }
    }

    ///
    /// Flat view of the object used to evaluate query selectors.
    ///
    pub fn attributes(&self) -> Record {
        let mut record = self.header().attributes();
        let mut put = |k: &str, v: Value| {
            record.insert(k.to_string(), v);
        };
        match self {
            Object::ReferenceGenome(o) => {
                put("n_chroms", Value::Long(o.n_chroms as i64));
                put("maker", Value::from(o.maker.as_str()));
                put("model", Value::from(o.model.as_str()));
                put("release", Value::from(o.release.as_str()));
            }
            Object::MarkerSet(o) => {
                put("maker", Value::from(o.maker.as_str()));
                put("model", Value::from(o.model.as_str()));
                put("release", Value::from(o.release.as_str()));
                put("size", Value::Long(o.size as i64));
            }
            Object::VariantCallSupport(o) => {
                put("reference_genome", Value::from(o.reference_genome.as_str()));
                put("n_nodes", Value::Long(o.n_nodes as i64));
            }
            Object::DataSample(o) => {
                put("marker_set", Value::from(o.marker_set.as_str()));
                put("data_table", Value::from(o.data_table.as_str()));
            }
            Object::Action(o) => {
                put("description", Value::from(o.description.as_str()));
                put(
                    "target",
                    Value::from(o.target.as_ref().map(|t| t.as_str()).unwrap_or_default()),
                );
            }
        }
        record
    }
}

///
/// A concrete object type that can be saved in and fetched from a catalog.
///
pub trait CatalogObject: Sized {
    const KIND: ObjectKind;

    fn into_object(self) -> Object;

    fn from_object(object: Object) -> Option<Self>;

    fn header(&self) -> &Header;
}

macro_rules! catalog_object {
    ($record:ty, $variant:ident) => {
        impl CatalogObject for $record {
            const KIND: ObjectKind = ObjectKind::$variant;

            fn into_object(self) -> Object {
                Object::$variant(self)
            }

            fn from_object(object: Object) -> Option<Self> {
                match object {
                    Object::$variant(o) => Some(o),
                    _ => None,
                }
            }

            fn header(&self) -> &Header {
                &self.header
            }
        }
    };
}

catalog_object!(ReferenceGenomeRecord, ReferenceGenome);
catalog_object!(MarkerSetRecord, MarkerSet);
catalog_object!(VcsRecord, VariantCallSupport);
catalog_object!(DataSampleRecord, DataSample);
catalog_object!(ActionRecord, Action);

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn genome() -> ReferenceGenome {
        ReferenceGenome::new("hg19", 26, "GRC", "h", "19").unwrap()
    }

    #[rstest]
    fn test_genome_round_trip(genome: ReferenceGenome) {
        let record = ReferenceGenomeRecord::from(&genome);
        assert_eq!(record.genome(), genome);
        let object = record.clone().into_object();
        assert_eq!(object.kind(), ObjectKind::ReferenceGenome);
        assert_eq!(ReferenceGenomeRecord::from_object(object), Some(record));
    }

    #[rstest]
    fn test_wrong_kind_is_none(genome: ReferenceGenome) {
        let object = ReferenceGenomeRecord::from(&genome).into_object();
        assert_eq!(MarkerSetRecord::from_object(object), None);
    }

    #[rstest]
    fn test_attributes_and_keys(genome: ReferenceGenome) {
        let object = Object::VariantCallSupport(VcsRecord {
            header: Header::new(Vid::mint('V'), "calls"),
            reference_genome: genome.vid.clone(),
            n_nodes: 3,
        });
        assert_eq!(
            object.unique_key(),
            vec![genome.vid.as_str().to_string(), "calls".to_string()]
        );
        let attributes = object.attributes();
        assert_eq!(attributes["label"], Value::from("calls"));
        assert_eq!(attributes["status"], Value::from("USABLE"));
        assert_eq!(attributes["action"], Value::from(""));
        assert_eq!(attributes["n_nodes"], Value::Long(3));
    }
}
