//! Ranked views of the importance matrix.

use std::fmt;
use std::str::FromStr;

use crate::error::ImportanceError;
use crate::result::DocumentImportances;

/// How training-document importances are grouped before ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DocumentStrengthType {
    /// One ranked list per scored document.
    PerObject,
    /// One ranked list of importances summed over all scored documents.
    PerPool,
    /// One unranked list per scored document, in training document order.
    Raw,
}

impl fmt::Display for DocumentStrengthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerObject => f.write_str("PerObject"),
            Self::PerPool => f.write_str("PerPool"),
            Self::Raw => f.write_str("Raw"),
        }
    }
}

impl FromStr for DocumentStrengthType {
    type Err = ImportanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PerObject" => Ok(Self::PerObject),
            "PerPool" => Ok(Self::PerPool),
            "Raw" => Ok(Self::Raw),
            _ => Err(ImportanceError::InvalidOption {
                option: "document strength type",
                value: s.to_string(),
                expected: "PerObject, PerPool, Raw",
            }),
        }
    }
}

/// Which importances are kept, and how they are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ImportanceValuesSign {
    /// Strictly positive values, largest first.
    Positive,
    /// Strictly negative values, most negative first.
    Negative,
    /// Every value, largest magnitude first.
    All,
}

impl ImportanceValuesSign {
    fn keeps(self, value: f64) -> bool {
        match self {
            Self::Positive => value > 0.0,
            Self::Negative => value < 0.0,
            Self::All => true,
        }
    }

    /// Sort key; higher ranks first.
    fn key(self, value: f64) -> f64 {
        match self {
            Self::Positive => value,
            Self::Negative => -value,
            Self::All => value.abs(),
        }
    }
}

impl fmt::Display for ImportanceValuesSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => f.write_str("Positive"),
            Self::Negative => f.write_str("Negative"),
            Self::All => f.write_str("All"),
        }
    }
}

impl FromStr for ImportanceValuesSign {
    type Err = ImportanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Positive" => Ok(Self::Positive),
            "Negative" => Ok(Self::Negative),
            "All" => Ok(Self::All),
            _ => Err(ImportanceError::InvalidOption {
                option: "importance values sign",
                value: s.to_string(),
                expected: "Positive, Negative, All",
            }),
        }
    }
}

/// Training document indices and their scores, one list per group.
///
/// `indices[g][k]` is a training document and `scores[g][k]` its importance
/// in group `g` (a scored document, or the whole pool for `PerPool`).
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct DocumentStrength {
    /// Training document indices per group.
    pub indices: Vec<Vec<usize>>,
    /// Importances matching `indices`.
    pub scores: Vec<Vec<f64>>,
}

pub(crate) fn document_strength(
    importances: &DocumentImportances,
    strength_type: DocumentStrengthType,
    sign: ImportanceValuesSign,
    top_size: Option<usize>,
) -> DocumentStrength {
    let (n_train, n_scored) = importances.shape();

    let groups: Vec<Vec<f64>> = match strength_type {
        DocumentStrengthType::PerPool => {
            vec![importances.rows().map(|row| row.iter().sum()).collect()]
        }
        DocumentStrengthType::PerObject | DocumentStrengthType::Raw => (0..n_scored)
            .map(|j| (0..n_train).map(|i| importances.get(i, j)).collect())
            .collect(),
    };

    let mut strength = DocumentStrength::default();
    for group in groups {
        let mut ranked: Vec<(usize, f64)> = group
            .into_iter()
            .enumerate()
            .filter(|&(_, v)| sign.keeps(v))
            .collect();
        if strength_type != DocumentStrengthType::Raw {
            ranked.sort_by(|a, b| sign.key(b.1).total_cmp(&sign.key(a.1)));
            if let Some(top) = top_size {
                ranked.truncate(top);
            }
        }
        let (indices, scores) = ranked.into_iter().unzip();
        strength.indices.push(indices);
        strength.scores.push(scores);
    }
    strength
}
