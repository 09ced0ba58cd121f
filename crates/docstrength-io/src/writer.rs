//! JSON result writer for document importance runs.

use std::fs;
use std::path::{Path, PathBuf};

use docstrength_core::{
    DocumentImportances, DocumentStrength, DocumentStrengthType, ImportanceValuesSign,
    UpdateMethod,
};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{DocId, ExperimentName};

/// Options an importance run was evaluated and ranked with, recorded in the artifact.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    /// Leaf update policy used by the evaluator.
    pub update_method: UpdateMethod,
    /// Grouping of the ranked strengths.
    pub strength_type: DocumentStrengthType,
    /// Sign filter of the ranked strengths.
    pub values_sign: ImportanceValuesSign,
    /// Truncation of every ranked list.
    pub top_size: Option<usize>,
}

/// Writes importance results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_importances.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Return the path of the importance artifact.
    #[must_use]
    pub fn importances_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_importances.json", self.experiment.as_str()))
    }

    /// Write the importance matrix and its ranked strengths to
    /// `{experiment}_importances.json`.
    ///
    /// Training documents are referred to by index; scored documents by
    /// their IDs. Non-finite importances are written as `null`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeJson`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | file write failed |
    #[instrument(skip_all, fields(n_scored = scored_doc_ids.len()))]
    pub fn write_importances(
        &self,
        scored_doc_ids: &[DocId],
        importances: &DocumentImportances,
        strength: &DocumentStrength,
        settings: &RunSettings,
    ) -> Result<PathBuf, IoError> {
        let path = self.importances_path();

        let groups: Vec<StrengthGroup> = strength
            .indices
            .iter()
            .zip(&strength.scores)
            .enumerate()
            .map(|(g, (train_docs, scores))| StrengthGroup {
                scored_doc: match settings.strength_type {
                    DocumentStrengthType::PerPool => None,
                    DocumentStrengthType::PerObject | DocumentStrengthType::Raw => {
                        scored_doc_ids.get(g).map(DocId::as_str)
                    }
                },
                train_docs,
                scores,
            })
            .collect();

        let artifact = ImportanceArtifact {
            experiment: self.experiment.as_str(),
            update_method: settings.update_method.to_string(),
            strength_type: settings.strength_type.to_string(),
            values_sign: settings.values_sign.to_string(),
            top_size: settings.top_size,
            n_train_docs: importances.n_train_docs(),
            n_scored_docs: importances.n_scored_docs(),
            scored_doc_ids: scored_doc_ids.iter().map(DocId::as_str).collect(),
            importances: importances.to_rows(),
            strength: groups,
        };

        let json = serde_json::to_string_pretty(&artifact).map_err(|e| IoError::SerializeJson {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), size_bytes = json.len(), "importances written");
        Ok(path)
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct ImportanceArtifact<'a> {
    experiment: &'a str,
    update_method: String,
    strength_type: String,
    values_sign: String,
    top_size: Option<usize>,
    n_train_docs: usize,
    n_scored_docs: usize,
    scored_doc_ids: Vec<&'a str>,
    /// `[train_doc][scored_doc]`
    importances: Vec<Vec<f64>>,
    strength: Vec<StrengthGroup<'a>>,
}

#[derive(Serialize)]
struct StrengthGroup<'a> {
    /// `None` for the pool-wide group.
    scored_doc: Option<&'a str>,
    train_docs: &'a [usize],
    scores: &'a [f64],
}
