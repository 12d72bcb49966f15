//! Per-category track quotas for a mix.
//!
//! Base recipes are written for a 35-track mix and scaled to the requested
//! length. Each category is rounded on its own, so the quotas can sum to a
//! track or two more or less than asked for; the selector's stop condition
//! absorbs that.

use crate::models::RuleSettings;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CANONICAL_LENGTH: usize = 35;

/// Below this `calm_hype` the calm category gains weight.
pub const CALM_THRESHOLD: f64 = 0.33;
/// Above this `calm_hype` the hype categories gain weight.
pub const HYPE_THRESHOLD: f64 = 0.67;
/// Tracks moved by the energy slider at canonical length.
pub const BASE_SHIFT: usize = 4;

pub const DEFAULT_RECIPE_ID: &str = "daily";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    Acoustic,
    ArtistPrimary,
    SecondarySignal,
    Liked,
    CuratedGenre,
}

impl SourceCategory {
    /// Fixed interleave order.
    pub const ALL: [SourceCategory; 5] = [
        SourceCategory::Acoustic,
        SourceCategory::ArtistPrimary,
        SourceCategory::SecondarySignal,
        SourceCategory::Liked,
        SourceCategory::CuratedGenre,
    ];

    pub const HYPE: [SourceCategory; 2] =
        [SourceCategory::ArtistPrimary, SourceCategory::CuratedGenre];

    pub fn label(&self) -> &'static str {
        match self {
            SourceCategory::Acoustic => "Acoustic",
            SourceCategory::ArtistPrimary => "Artist",
            SourceCategory::SecondarySignal => "Signal",
            SourceCategory::Liked => "Liked",
            SourceCategory::CuratedGenre => "Genre",
        }
    }

    fn index(&self) -> usize {
        match self {
            SourceCategory::Acoustic => 0,
            SourceCategory::ArtistPrimary => 1,
            SourceCategory::SecondarySignal => 2,
            SourceCategory::Liked => 3,
            SourceCategory::CuratedGenre => 4,
        }
    }
}

impl fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BaseRecipe {
    pub id: &'static str,
    /// Quotas at [`CANONICAL_LENGTH`], in [`SourceCategory::ALL`] order
    pub quotas: [usize; 5],
    /// Hype category that receives the shift when the slider is high
    pub hype_target: SourceCategory,
}

const BASE_RECIPES: &[BaseRecipe] = &[
    BaseRecipe {
        id: "daily",
        quotas: [7, 7, 7, 7, 7],
        hype_target: SourceCategory::ArtistPrimary,
    },
    BaseRecipe {
        id: "morning",
        quotas: [12, 6, 5, 8, 4],
        hype_target: SourceCategory::ArtistPrimary,
    },
    BaseRecipe {
        id: "workout",
        quotas: [3, 8, 6, 8, 10],
        hype_target: SourceCategory::CuratedGenre,
    },
    BaseRecipe {
        id: "throwback",
        quotas: [5, 5, 5, 15, 5],
        hype_target: SourceCategory::CuratedGenre,
    },
];

pub fn base_recipe(mix_id: &str) -> &'static BaseRecipe {
    BASE_RECIPES
        .iter()
        .find(|r| r.id == mix_id)
        .unwrap_or_else(|| {
            log::debug!(
                "No recipe for mix '{}', using '{}'",
                mix_id,
                DEFAULT_RECIPE_ID
            );
            &BASE_RECIPES[0]
        })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Recipe {
    quotas: [usize; 5],
    /// Tracks filled from recommendations, outside the five categories
    pub novel: usize,
}

impl Recipe {
    pub fn quota(&self, category: SourceCategory) -> usize {
        self.quotas[category.index()]
    }

    fn quota_mut(&mut self, category: SourceCategory) -> &mut usize {
        &mut self.quotas[category.index()]
    }

    pub fn weighted_total(&self) -> usize {
        self.quotas.iter().sum()
    }

    pub fn total(&self) -> usize {
        self.weighted_total() + self.novel
    }
}

fn scale(value: usize, length: usize) -> usize {
    (value as f64 * length as f64 / CANONICAL_LENGTH as f64).round() as usize
}

/// Turn a mix id and the user's rules into quotas.
pub fn compute_recipe(mix_id: &str, rules: &RuleSettings) -> Recipe {
    let base = base_recipe(mix_id);
    let total = rules.total_length;

    let novel = ((total as f64 * rules.discover_level).round() as usize).min(total);
    let weighted_length = total - novel;

    let mut recipe = Recipe {
        quotas: base.quotas.map(|q| scale(q, weighted_length)),
        novel,
    };

    let shift = scale(BASE_SHIFT, weighted_length);
    if rules.calm_hype < CALM_THRESHOLD {
        shift_toward_calm(&mut recipe, shift);
    } else if rules.calm_hype > HYPE_THRESHOLD {
        shift_toward_hype(&mut recipe, shift, base.hype_target);
    }

    log::debug!(
        "Recipe for '{}' at {} tracks: {:?} + {} novel",
        mix_id,
        total,
        recipe.quotas,
        recipe.novel
    );
    recipe
}

/// Move up to `shift` tracks into the calm category, drawing from the
/// hype category with more budget first.
fn shift_toward_calm(recipe: &mut Recipe, shift: usize) {
    let mut donors = SourceCategory::HYPE;
    donors.sort_by_key(|c| std::cmp::Reverse(recipe.quota(*c)));

    let mut remaining = shift;
    for donor in donors {
        let quota = recipe.quota_mut(donor);
        let taken = remaining.min(*quota);
        *quota -= taken;
        remaining -= taken;
    }
    *recipe.quota_mut(SourceCategory::Acoustic) += shift - remaining;
}

fn shift_toward_hype(recipe: &mut Recipe, shift: usize, target: SourceCategory) {
    let calm = recipe.quota_mut(SourceCategory::Acoustic);
    *calm = calm.saturating_sub(shift);
    *recipe.quota_mut(target) += shift;
}
