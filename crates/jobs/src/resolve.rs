//! Dependency resolution: turning `requires()` into this job's inputs.
//!
//! The requirement graph is a data-lineage graph. Resolving it configures the
//! upstream jobs so their `output()` can be read; it never runs them. Ordering of
//! `run()` calls across jobs belongs to the external orchestrator.

use std::collections::{BTreeMap, BTreeSet};

use nagini_core::{JobError, JobResult, Outputs, PropertyContext};

use crate::handle::JobRef;

/// Jobs required by another job, in one of three shapes.
#[derive(Debug, Clone, Default)]
pub enum Requirement {
    #[default]
    None,
    Single(JobRef),
    /// Resolved in declaration order.
    Ordered(Vec<JobRef>),
    /// Name-keyed; keys must be unique and non-empty.
    Keyed(Vec<(String, JobRef)>),
}

impl Requirement {
    pub fn single(job: JobRef) -> Self {
        Self::Single(job)
    }

    pub fn ordered(jobs: impl IntoIterator<Item = JobRef>) -> Self {
        Self::Ordered(jobs.into_iter().collect())
    }

    pub fn keyed<K: Into<String>>(jobs: impl IntoIterator<Item = (K, JobRef)>) -> Self {
        Self::Keyed(jobs.into_iter().map(|(k, j)| (k.into(), j)).collect())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Requirement::None)
    }

    /// Every referenced job, in resolution order (duplicates included).
    pub fn jobs(&self) -> Vec<&JobRef> {
        match self {
            Requirement::None => Vec::new(),
            Requirement::Single(job) => vec![job],
            Requirement::Ordered(jobs) => jobs.iter().collect(),
            Requirement::Keyed(jobs) => jobs.iter().map(|(_, j)| j).collect(),
        }
    }

    /// Reject shapes that cannot become inputs.
    pub fn validate(&self) -> JobResult<()> {
        if let Requirement::Keyed(jobs) = self {
            let mut seen = BTreeSet::new();
            for (key, _) in jobs {
                if key.is_empty() {
                    return Err(JobError::invalid_requirement(
                        "requires() returned a mapping with an empty key",
                    ));
                }
                if !seen.insert(key.as_str()) {
                    return Err(JobError::invalid_requirement(format!(
                        "requires() returned a mapping with duplicate key \"{key}\""
                    )));
                }
            }
        }
        Ok(())
    }

    /// Configure every required job once, then collect their outputs.
    pub fn resolve(&self, props: &mut PropertyContext) -> JobResult<Inputs> {
        self.validate()?;
        for job in self.jobs() {
            job.configure(props)?;
        }

        Ok(match self {
            Requirement::None => Inputs::None,
            Requirement::Single(job) => Inputs::Single(job.output()),
            Requirement::Ordered(jobs) => Inputs::Ordered(jobs.iter().map(JobRef::output).collect()),
            Requirement::Keyed(jobs) => Inputs::Keyed(
                jobs.iter()
                    .map(|(key, job)| (key.clone(), job.output()))
                    .collect(),
            ),
        })
    }
}

impl From<JobRef> for Requirement {
    fn from(job: JobRef) -> Self {
        Requirement::Single(job)
    }
}

impl From<Vec<JobRef>> for Requirement {
    fn from(jobs: Vec<JobRef>) -> Self {
        Requirement::Ordered(jobs)
    }
}

/// Outputs of the required jobs, shaped like the [`Requirement`] they came from.
#[derive(Debug, Clone, Default)]
pub enum Inputs {
    #[default]
    None,
    Single(Outputs),
    Ordered(Vec<Outputs>),
    Keyed(BTreeMap<String, Outputs>),
}

impl Inputs {
    pub fn as_single(&self) -> Option<&Outputs> {
        match self {
            Inputs::Single(outputs) => Some(outputs),
            _ => None,
        }
    }

    pub fn as_ordered(&self) -> Option<&[Outputs]> {
        match self {
            Inputs::Ordered(outputs) => Some(outputs),
            _ => None,
        }
    }

    pub fn as_keyed(&self) -> Option<&BTreeMap<String, Outputs>> {
        match self {
            Inputs::Keyed(outputs) => Some(outputs),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Outputs> {
        self.as_keyed().and_then(|outputs| outputs.get(key))
    }

    pub fn len(&self) -> usize {
        match self {
            Inputs::None => 0,
            Inputs::Single(_) => 1,
            Inputs::Ordered(outputs) => outputs.len(),
            Inputs::Keyed(outputs) => outputs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
