use std::collections::HashMap;

use crate::domain::error::TrainError;

/// The negative class; excluded from micro precision/recall.
pub const NO_RELATION: &str = "no_relation";

/// TACRED relation inventory in label-id order.
const TACRED_LABELS: [&str; 42] = [
    NO_RELATION,
    "per:title",
    "org:top_members/employees",
    "per:employee_of",
    "org:alternate_names",
    "org:country_of_headquarters",
    "per:countries_of_residence",
    "org:city_of_headquarters",
    "per:cities_of_residence",
    "per:age",
    "per:stateorprovinces_of_residence",
    "per:origin",
    "org:subsidiaries",
    "org:parents",
    "per:spouse",
    "org:stateorprovince_of_headquarters",
    "per:children",
    "per:other_family",
    "per:alternate_names",
    "org:members",
    "per:siblings",
    "per:schools_attended",
    "per:parents",
    "per:date_of_death",
    "org:member_of",
    "org:founded_by",
    "org:website",
    "per:cause_of_death",
    "org:political/religious_affiliation",
    "org:founded",
    "per:city_of_death",
    "org:shareholders",
    "org:number_of_employees/members",
    "per:date_of_birth",
    "per:city_of_birth",
    "per:charges",
    "per:stateorprovince_of_death",
    "per:religion",
    "per:stateorprovince_of_birth",
    "per:country_of_birth",
    "org:dissolved",
    "per:country_of_death",
];

/// Bidirectional label ↔ id lookup.
#[derive(Debug, Clone)]
pub struct LabelMap {
    labels: Vec<String>,
    ids: HashMap<String, usize>,
}

impl LabelMap {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let ids = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        Self { labels, ids }
    }

    pub fn tacred() -> Self {
        Self::new(TACRED_LABELS)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn id(&self, label: &str) -> Result<usize, TrainError> {
        self.ids
            .get(label)
            .copied()
            .ok_or_else(|| TrainError::data("label map", format!("unknown relation '{label}'")))
    }

    pub fn label(&self, id: usize) -> Result<&str, TrainError> {
        self.labels
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| {
                TrainError::data(
                    "label map",
                    format!("label id {id} outside 0..{}", self.labels.len()),
                )
            })
    }
}
