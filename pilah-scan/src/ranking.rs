//! Waste categories, prediction sets, and ranking
//!
//! The model emits one score per [`Category`] in the fixed order of
//! [`Category::ALL`]. That order is a contract with the model artifact; the
//! only runtime check available is the output length, which
//! [`PredictionSet::from_scores`] enforces.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::error::{Result, ScanError};

/// Waste category, in model output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Battery,
    Biological,
    Cardboard,
    Clothes,
    Glass,
    Medical,
    Metal,
    Paper,
    Plastic,
    Shoes,
}

impl Category {
    /// All categories in model output index order
    pub const ALL: [Category; 10] = [
        Category::Battery,
        Category::Biological,
        Category::Cardboard,
        Category::Clothes,
        Category::Glass,
        Category::Medical,
        Category::Metal,
        Category::Paper,
        Category::Plastic,
        Category::Shoes,
    ];

    /// Number of scores a model must produce
    pub const COUNT: usize = Self::ALL.len();

    /// Internal category code
    pub fn code(self) -> &'static str {
        match self {
            Category::Battery => "battery",
            Category::Biological => "biological",
            Category::Cardboard => "cardboard",
            Category::Clothes => "clothes",
            Category::Glass => "glass",
            Category::Medical => "medical",
            Category::Metal => "metal",
            Category::Paper => "paper",
            Category::Plastic => "plastic",
            Category::Shoes => "shoes",
        }
    }

    /// Label shown to users and stored by the scoring backend
    pub fn display_label(self) -> &'static str {
        match self {
            Category::Battery => "Baterai",
            Category::Biological => "Sampah Organik",
            Category::Cardboard => "Kardus",
            Category::Clothes => "Pakaian",
            Category::Glass => "Kaca",
            Category::Medical => "Sampah Medis",
            Category::Metal => "Logam",
            Category::Paper => "Kertas",
            Category::Plastic => "Plastik",
            Category::Shoes => "Sepatu",
        }
    }

    /// Position in the model output vector
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_code(code: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub fn from_display_label(label: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.display_label() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One (category, probability) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub category: Category,
    pub probability: f32,
}

impl Prediction {
    pub fn label(&self) -> &'static str {
        self.category.display_label()
    }
}

impl Serialize for Prediction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Prediction", 3)?;
        state.serialize_field("category", &self.category)?;
        state.serialize_field("label", self.label())?;
        state.serialize_field("probability", &self.probability)?;
        state.end()
    }
}

/// Full set of scores from one inference call
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSet {
    scores: [f32; Category::COUNT],
}

impl PredictionSet {
    /// Pair raw model output with categories
    ///
    /// # Errors
    /// - [`ScanError::OutputShape`] if `scores` does not hold exactly one
    ///   value per category
    /// - [`ScanError::InferenceFailure`] if any score is NaN, infinite, or
    ///   outside [0, 1]
    ///
    /// # Examples
    ///
    /// ```
    /// use pilah_scan::ranking::{Category, PredictionSet};
    ///
    /// let mut scores = vec![0.05; 10];
    /// scores[Category::Plastic.index()] = 0.55;
    /// let set = PredictionSet::from_scores(scores).unwrap();
    /// assert_eq!(set.get(Category::Plastic), 0.55);
    /// ```
    pub fn from_scores(scores: Vec<f32>) -> Result<Self> {
        let actual = scores.len();
        let scores: [f32; Category::COUNT] =
            scores.try_into().map_err(|_| ScanError::OutputShape {
                expected: Category::COUNT,
                actual,
            })?;

        for (category, score) in Category::ALL.iter().zip(scores.iter()) {
            if !score.is_finite() {
                return Err(ScanError::InferenceFailure(format!(
                    "non-finite score for {category}: {score}"
                )));
            }
            if !(0.0..=1.0).contains(score) {
                return Err(ScanError::InferenceFailure(format!(
                    "score for {category} outside [0, 1]: {score}"
                )));
            }
        }

        Ok(Self { scores })
    }

    pub fn get(&self, category: Category) -> f32 {
        self.scores[category.index()]
    }

    /// Predictions in category order
    pub fn iter(&self) -> impl Iterator<Item = Prediction> + '_ {
        Category::ALL
            .iter()
            .zip(self.scores.iter())
            .map(|(&category, &probability)| Prediction {
                category,
                probability,
            })
    }

    /// Sum of all scores (~1.0 for a softmax output)
    pub fn total(&self) -> f32 {
        self.scores.iter().sum()
    }
}

/// Sort predictions by probability, highest first
///
/// Equal probabilities keep category order.
pub fn rank(set: &PredictionSet) -> Vec<Prediction> {
    let mut ranked: Vec<Prediction> = set.iter().collect();
    // sort_by is stable
    ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    ranked
}
